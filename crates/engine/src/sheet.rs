use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};
use url::Url;

use common::{Error, Result, SymbolSource};

/// Reads the watch list from a published spreadsheet CSV export.
///
/// The first column of every row is a ticker; blank cells and header rows
/// starting with "symbol" are skipped.
pub struct SheetSymbolSource {
    url: Url,
    http: Client,
}

impl SheetSymbolSource {
    pub fn new(url: Url, timeout: Duration) -> Self {
        Self {
            url,
            http: Client::builder()
                .use_rustls_tls()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    async fn download(&self) -> Result<String> {
        let resp = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::SourceUnavailable(format!("sheet export returned HTTP {status}")));
        }
        resp.text().await.map_err(|e| Error::Http(e.to_string()))
    }
}

#[async_trait]
impl SymbolSource for SheetSymbolSource {
    async fn list_symbols(&self) -> Vec<String> {
        let parsed = match self.download().await {
            Ok(text) => parse_symbols(&text),
            Err(e) => Err(e),
        };
        match parsed {
            Ok(symbols) => {
                info!(count = symbols.len(), "Loaded symbol list");
                symbols
            }
            Err(e) => {
                warn!(error = %e, "Symbol list unavailable");
                Vec::new()
            }
        }
    }
}

/// Extract tickers from CSV text, preserving row order.
pub fn parse_symbols(text: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut symbols = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::MalformedData(e.to_string()))?;
        let Some(cell) = record.get(0) else { continue };
        let symbol = cell.trim().to_uppercase();
        if symbol.is_empty() || symbol.to_lowercase().starts_with("symbol") {
            continue;
        }
        symbols.push(symbol);
    }
    Ok(symbols)
}
