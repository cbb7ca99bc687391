use async_trait::async_trait;

use crate::{Candle, Result};

/// Supplies the ordered list of base tickers to watch.
///
/// `SheetSymbolSource` implements this over a published spreadsheet export.
/// Implementations return an empty list on failure; the orchestrator treats
/// that as "nothing to process this cycle".
#[async_trait]
pub trait SymbolSource: Send + Sync {
    async fn list_symbols(&self) -> Vec<String>;
}

/// Supplies daily candles for a symbol.
///
/// `KucoinClient` implements this for the futures kline endpoint. The raw
/// ordering of the returned candles is untrusted and may contain duplicates;
/// callers normalize before analysis. Failures surface as an empty vector.
#[async_trait]
pub trait CandleProvider: Send + Sync {
    async fn fetch_candles(&self, symbol: &str, days: usize) -> Vec<Candle>;
}

/// Delivers alert text to a single chat target.
///
/// One long-lived instance is shared by every cycle.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, target: i64, text: &str) -> Result<()>;
}
