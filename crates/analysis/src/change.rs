use common::{base_symbol, Candle};

use crate::normalize::closes;

/// Lookback used when the user gives no day count.
pub const DEFAULT_DAYS: usize = 5;
/// Largest lookback a query may ask for.
pub const MAX_DAYS: usize = 30;

/// A parsed `<SYMBOL> [<days>]` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub symbol: String,
    pub days: usize,
}

/// Parse free text into a query. Returns `None` for blank input.
///
/// A second token that is not all digits falls back to the default window.
pub fn parse_query(text: &str) -> Option<Query> {
    let upper = text.trim().to_uppercase();
    let mut parts = upper.split_whitespace();
    let symbol = parts.next()?.to_string();
    let days = parts
        .next()
        .filter(|p| p.chars().all(|ch| ch.is_ascii_digit()))
        .and_then(|p| p.parse::<usize>().ok())
        .unwrap_or(DEFAULT_DAYS)
        .min(MAX_DAYS);
    Some(Query { symbol, days })
}

/// Realized price change of a symbol over a lookback window.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeReport {
    pub symbol: String,
    pub days: usize,
    pub price: f64,
    pub change_pct: f64,
}

impl ChangeReport {
    /// Build a report from normalized candles (oldest first).
    /// Returns `None` when there is nothing to compare against.
    pub fn from_candles(query: &Query, candles: &[Candle]) -> Option<Self> {
        let closes = closes(candles);
        let start = *closes.first()?;
        let current = *closes.last()?;
        if start <= 0.0 {
            return None;
        }
        Some(Self {
            symbol: base_symbol(&query.symbol),
            days: query.days,
            price: current,
            change_pct: (current - start) / start * 100.0,
        })
    }

    /// Telegram HTML rendering.
    pub fn to_html(&self) -> String {
        let marker = if self.change_pct > 0.0 {
            "🟢"
        } else if self.change_pct < 0.0 {
            "🔴"
        } else {
            "⚪"
        };
        let day_word = if self.days == 1 { "day" } else { "days" };
        format!(
            "<b>{}/USDT</b>\nPrice: <code>{}</code>\n{marker} Change over {} {day_word}: <b>{:+.2}%</b>",
            self.symbol,
            format_price(self.price),
            self.days,
            self.change_pct,
        )
    }
}

/// Two decimals for prices of 10 and above, six below.
pub fn format_price(price: f64) -> String {
    if price >= 10.0 {
        format!("${price:.2}")
    } else {
        format!("${price:.6}")
    }
}

pub fn no_data_message(symbol: &str) -> String {
    format!("No data: {symbol}")
}
