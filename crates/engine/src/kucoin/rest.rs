use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use common::{instrument_symbol, Candle, CandleProvider, Error, Result};

const BASE_URL: &str = "https://api-futures.kucoin.com";
/// Success code carried in the KuCoin response envelope.
const OK_CODE: &str = "200000";
/// Daily candles, in minutes.
const GRANULARITY_DAY: u32 = 1440;
const DAY_MS: i64 = 86_400_000;

/// REST client for KuCoin Futures public market data.
///
/// Holds one long-lived HTTP client; every request is bounded by the
/// configured timeout and is never retried.
pub struct KucoinClient {
    base_url: String,
    http: Client,
}

impl KucoinClient {
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url(BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::builder()
                .use_rustls_tls()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    async fn klines(&self, instrument: &str, days: usize) -> Result<Vec<Candle>> {
        // One spare day so a still-open candle does not shrink the window.
        let from = Utc::now().timestamp_millis() - (days as i64 + 1) * DAY_MS;
        let url = format!("{}/api/v1/kline/query", self.base_url);

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("symbol", instrument.to_string()),
                ("granularity", GRANULARITY_DAY.to_string()),
                ("from", from.to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::SourceUnavailable(format!("HTTP {status}: {body}")));
        }
        parse_klines(&body)
    }
}

#[async_trait]
impl CandleProvider for KucoinClient {
    async fn fetch_candles(&self, symbol: &str, days: usize) -> Vec<Candle> {
        let instrument = instrument_symbol(symbol);
        match self.klines(&instrument, days).await {
            Ok(candles) => {
                debug!(symbol = %instrument, count = candles.len(), "Fetched candles");
                candles
            }
            Err(e) => {
                warn!(symbol = %instrument, error = %e, "Candle fetch failed, treating as no data");
                Vec::new()
            }
        }
    }
}

/// Parse a kline response body into candles, in provider order.
///
/// Rows are `[time, open, high, low, close, volume, ...]`; values may be
/// JSON numbers or numeric strings. A non-success code or empty data is an
/// error, as is any row that cannot be read.
pub fn parse_klines(body: &str) -> Result<Vec<Candle>> {
    let resp: KlineResponse =
        serde_json::from_str(body).map_err(|e| Error::MalformedData(e.to_string()))?;

    if resp.code != OK_CODE {
        return Err(Error::SourceUnavailable(format!(
            "KuCoin returned code {}: {}",
            resp.code,
            resp.msg.unwrap_or_default()
        )));
    }

    let rows = resp.data.unwrap_or_default();
    if rows.is_empty() {
        return Err(Error::MalformedData("empty kline data".to_string()));
    }

    rows.iter().map(|row| parse_row(row)).collect()
}

fn parse_row(row: &[Value]) -> Result<Candle> {
    if row.len() < 5 {
        return Err(Error::MalformedData(format!(
            "kline row has {} fields, expected at least 5",
            row.len()
        )));
    }
    let timestamp = number(&row[0])? as i64;
    Ok(Candle {
        timestamp,
        open: number(&row[1])?,
        high: number(&row[2])?,
        low: number(&row[3])?,
        close: number(&row[4])?,
        volume: row.get(5).map(number).transpose()?.unwrap_or(0.0),
    })
}

fn number(value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::MalformedData(format!("expected number, got {value}")))
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct KlineResponse {
    code: String,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<Vec<Vec<Value>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_host_is_http_error() {
        let client = KucoinClient::with_base_url("http://127.0.0.1:1", Duration::from_secs(2));
        let err = client.klines("BTCUSDTM", 10).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)), "{err:?}");
        assert!(client.fetch_candles("BTC", 10).await.is_empty());
    }

    #[test]
    fn parses_numeric_rows() {
        let body = r#"{"code":"200000","data":[
            [1700092800000, 36500.5, 37000.0, 36000.0, 36800.25, 1200],
            [1700006400000, 36000, 36600, 35900, 36500.5, 900]
        ]}"#;
        let candles = parse_klines(body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, 1_700_092_800_000);
        assert_eq!(candles[0].close, 36800.25);
        assert_eq!(candles[1].close, 36500.5);
        assert_eq!(candles[1].volume, 900.0);
    }

    #[test]
    fn parses_string_encoded_rows() {
        let body = r#"{"code":"200000","data":[["1700006400000","1.5","1.7","1.4","1.65"]]}"#;
        let candles = parse_klines(body).unwrap();
        assert_eq!(candles[0].close, 1.65);
        assert_eq!(candles[0].volume, 0.0);
    }

    #[test]
    fn error_code_is_source_unavailable() {
        let body = r#"{"code":"400100","msg":"symbol not exists"}"#;
        assert!(matches!(parse_klines(body), Err(Error::SourceUnavailable(_))));
    }

    #[test]
    fn empty_data_is_malformed() {
        assert!(matches!(
            parse_klines(r#"{"code":"200000","data":[]}"#),
            Err(Error::MalformedData(_))
        ));
        assert!(matches!(
            parse_klines(r#"{"code":"200000"}"#),
            Err(Error::MalformedData(_))
        ));
    }

    #[test]
    fn short_or_garbage_rows_are_malformed() {
        assert!(parse_klines(r#"{"code":"200000","data":[[1,2,3]]}"#).is_err());
        assert!(parse_klines(r#"{"code":"200000","data":[[1,2,3,4,"x"]]}"#).is_err());
        assert!(parse_klines("<html>").is_err());
    }

    #[tokio::test]
    async fn unreachable_host_yields_no_candles() {
        let client = KucoinClient::with_base_url("http://127.0.0.1:9", Duration::from_millis(500));
        assert!(client.fetch_candles("BTC", 10).await.is_empty());
    }
}
