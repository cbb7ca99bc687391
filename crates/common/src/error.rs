use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Symbol list or candle fetch failed. Degrades to "no signal".
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Provider payload did not have the expected shape.
    #[error("Malformed data: {0}")]
    MalformedData(String),

    #[error("Delivery to {target} failed: {reason}")]
    Delivery { target: i64, reason: String },

    #[error("Event log fault: {0}")]
    Persistence(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
