//! In-memory collaborators for orchestrator and scheduler tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use common::{instrument_symbol, Candle, CandleProvider, Error, Notifier, Result, SymbolSource};

pub struct FixedSymbols(pub Vec<String>);

impl FixedSymbols {
    pub fn new(symbols: &[&str]) -> Self {
        Self(symbols.iter().map(|s| s.to_string()).collect())
    }
}

#[async_trait]
impl SymbolSource for FixedSymbols {
    async fn list_symbols(&self) -> Vec<String> {
        self.0.clone()
    }
}

/// Serves closes keyed by instrument name, newest last, in reverse order
/// to exercise normalization.
pub struct FixedCandles(HashMap<String, Vec<f64>>);

impl FixedCandles {
    pub fn new(closes: &[(&str, &[f64])]) -> Self {
        Self(
            closes
                .iter()
                .map(|(s, c)| (instrument_symbol(s), c.to_vec()))
                .collect(),
        )
    }
}

#[async_trait]
impl CandleProvider for FixedCandles {
    async fn fetch_candles(&self, symbol: &str, _days: usize) -> Vec<Candle> {
        let closes = self
            .0
            .get(&instrument_symbol(symbol))
            .cloned()
            .unwrap_or_default();
        closes
            .iter()
            .enumerate()
            .rev()
            .map(|(i, &p)| Candle::close_at(i as i64 * 86_400_000, p))
            .collect()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(i64, String)>>,
    pub failing_target: Option<i64>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, target: i64, text: &str) -> Result<()> {
        if self.failing_target == Some(target) {
            return Err(Error::Delivery {
                target,
                reason: "chat not found".into(),
            });
        }
        self.sent.lock().await.push((target, text.to_string()));
        Ok(())
    }
}
