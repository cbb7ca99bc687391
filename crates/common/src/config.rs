use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::{Error, LogEntry, Result};

const DEFAULT_SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/1M3nf9qp9uDCIkIOR_Qp1-gU5qemZd7NYX3vorhOZcKc/export?format=csv";

/// All configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub telegram_token: String,
    pub telegram_chat_ids: Vec<i64>,

    // Symbol list
    pub symbols_sheet_url: Url,

    // Event log
    pub log_file: String,

    // Liveness endpoint
    pub health_port: u16,

    pub watch: WatchConfig,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let telegram_chat_ids = parse_chat_ids(&required_env("TELEGRAM_CHAT_IDS"))
            .unwrap_or_else(|e| panic!("{e}"));

        let sheet_url = optional_env("SYMBOLS_SHEET_URL")
            .unwrap_or_else(|| DEFAULT_SHEET_URL.to_string());
        let symbols_sheet_url = Url::parse(&sheet_url)
            .unwrap_or_else(|e| panic!("SYMBOLS_SHEET_URL is not a valid URL ('{sheet_url}'): {e}"));

        let watch = match optional_env("WATCH_CONFIG_PATH") {
            Some(path) => WatchConfig::load(&path),
            None => WatchConfig::default(),
        };

        Config {
            telegram_token: required_env("TELEGRAM_TOKEN"),
            telegram_chat_ids,
            symbols_sheet_url,
            log_file: optional_env("LOG_FILE").unwrap_or_else(|| "prices.log".to_string()),
            health_port: optional_env("HEALTH_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            watch,
        }
    }
}

/// Tunables for the streak watcher, optionally read from a TOML file.
///
/// Example `config/watch.toml`:
/// ```toml
/// morning = "09:00"
/// evening = "21:00"
/// window_days = 10
/// retention_days = 30
///
/// [thresholds]
/// growth = 5
/// strong_growth = 8
/// break_after = 6
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Local time of the passive (log-only) cycle, `HH:MM`.
    pub morning: String,
    /// Local time of the active (alerting) cycle, `HH:MM`.
    pub evening: String,
    /// Number of daily candles fed to the streak analyzer.
    pub window_days: usize,
    pub retention_days: i64,
    pub http_timeout_secs: u64,
    pub thresholds: Thresholds,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            morning: "09:00".to_string(),
            evening: "21:00".to_string(),
            window_days: 10,
            retention_days: 30,
            http_timeout_secs: 10,
            thresholds: Thresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Thresholds {
    pub growth: u32,
    pub strong_growth: u32,
    /// Minimum run that must precede a down day for it to count as a break.
    pub break_after: u32,
}

impl Thresholds {
    /// Alert thresholds may not undercut the event log's growth filter.
    pub fn validate(&self) -> Result<()> {
        if self.growth < LogEntry::MIN_GROWTH_DAYS {
            return Err(Error::Config(format!(
                "thresholds.growth must be at least {}, got {}",
                LogEntry::MIN_GROWTH_DAYS,
                self.growth
            )));
        }
        if self.strong_growth < self.growth {
            return Err(Error::Config(format!(
                "thresholds.strong_growth ({}) must not be below thresholds.growth ({})",
                self.strong_growth, self.growth
            )));
        }
        if self.break_after == 0 {
            return Err(Error::Config("thresholds.break_after must be positive".into()));
        }
        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            growth: 5,
            strong_growth: 8,
            break_after: 6,
        }
    }
}

impl WatchConfig {
    /// Load from a TOML file. Exits process on error.
    pub fn load(path: &str) -> Self {
        let content = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read watch config at '{path}': {e}"));
        let cfg = Self::from_toml(&content)
            .unwrap_or_else(|e| panic!("Failed to parse watch config at '{path}': {e}"));
        info!(path, morning = %cfg.morning, evening = %cfg.evening, "Loaded watch config");
        cfg
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let cfg: WatchConfig = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        cfg.morning_time()?;
        cfg.evening_time()?;
        if cfg.window_days < 2 {
            return Err(Error::Config(format!(
                "window_days must be at least 2, got {}",
                cfg.window_days
            )));
        }
        cfg.thresholds.validate()?;
        Ok(cfg)
    }

    pub fn morning_time(&self) -> Result<NaiveTime> {
        parse_hhmm(&self.morning)
    }

    pub fn evening_time(&self) -> Result<NaiveTime> {
        parse_hhmm(&self.evening)
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn parse_hhmm(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|e| Error::Config(format!("expected HH:MM time, got '{raw}': {e}")))
}

/// Parse a comma-separated list of Telegram chat ids.
pub fn parse_chat_ids(raw: &str) -> Result<Vec<i64>> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| {
                Error::Config(format!("TELEGRAM_CHAT_IDS contains non-numeric ID: '{s}'"))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    if ids.is_empty() {
        return Err(Error::Config("TELEGRAM_CHAT_IDS is empty".to_string()));
    }
    Ok(ids)
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
