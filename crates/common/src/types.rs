use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One day of market data. Only `timestamp` and `close` drive the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Exchange epoch in milliseconds.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Candle carrying only the fields the streak analysis needs.
    pub fn close_at(timestamp: i64, close: f64) -> Self {
        Self {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }
}

/// Outcome of a backward scan over a symbol's closing prices.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StreakResult {
    pub growth_days: u32,
    pub current: Option<f64>,
    pub previous: Option<f64>,
    pub is_break: bool,
}

impl StreakResult {
    /// Result used when fewer than two candles are available.
    pub fn no_signal() -> Self {
        Self::default()
    }
}

/// Alert bucket for a streak result. Variants are listed in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCategory {
    Break,
    StrongGrowth,
    Growth,
    None,
}

impl AlertCategory {
    /// Event written to the log for this category, if any.
    pub fn event(self) -> Option<LogEvent> {
        match self {
            AlertCategory::Break => Some(LogEvent::Break),
            AlertCategory::StrongGrowth | AlertCategory::Growth => Some(LogEvent::Growth),
            AlertCategory::None => None,
        }
    }
}

impl std::fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertCategory::Break => write!(f, "break"),
            AlertCategory::StrongGrowth => write!(f, "strong_growth"),
            AlertCategory::Growth => write!(f, "growth"),
            AlertCategory::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogEvent {
    Growth,
    Break,
}

impl std::fmt::Display for LogEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogEvent::Growth => write!(f, "growth"),
            LogEvent::Break => write!(f, "break"),
        }
    }
}

/// One persisted line of the event log.
///
/// Field names and the `time` format are the on-disk layout and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(with = "log_time")]
    pub time: NaiveDateTime,
    pub symbol: String,
    pub growth_days: u32,
    pub current_price: Option<f64>,
    pub event: LogEvent,
}

impl LogEntry {
    /// Minimum growth run that qualifies a `growth` entry for persistence.
    pub const MIN_GROWTH_DAYS: u32 = 5;

    pub fn new(
        time: NaiveDateTime,
        symbol: impl Into<String>,
        growth_days: u32,
        current_price: Option<f64>,
        event: LogEvent,
    ) -> Self {
        Self {
            time,
            symbol: symbol.into(),
            growth_days,
            current_price,
            event,
        }
    }

    /// Whether this entry passes the persistence filter.
    pub fn is_loggable(&self) -> bool {
        self.event == LogEvent::Break || self.growth_days >= Self::MIN_GROWTH_DAYS
    }
}

/// Wall-clock format used by the `time` field.
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

mod log_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::LOG_TIME_FORMAT;

    pub fn serialize<S: Serializer>(time: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format(LOG_TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, LOG_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// The two scheduled traversals of the symbol list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleKind {
    /// Morning: log qualifying growth, never notify.
    Passive,
    /// Evening: full alert classification with notifications.
    Active,
}

impl std::fmt::Display for CycleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleKind::Passive => write!(f, "passive"),
            CycleKind::Active => write!(f, "active"),
        }
    }
}

/// Counters collected over one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub symbols: usize,
    pub no_signal: usize,
    pub logged: usize,
    pub alerts: usize,
    pub delivery_failures: usize,
    pub persistence_faults: usize,
    pub pruned: usize,
}

/// Most recent completed cycle, shared with the liveness endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CycleStatus {
    pub kind: CycleKind,
    pub finished_at: NaiveDateTime,
    pub report: CycleReport,
}

/// Commands accepted by the scheduler task.
#[derive(Debug, Clone)]
pub enum SchedulerCommand {
    RunNow(CycleKind),
    Shutdown,
}
