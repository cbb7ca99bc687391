pub mod collaborators;
pub mod config;
pub mod error;
pub mod symbol;
pub mod types;

pub use collaborators::{CandleProvider, Notifier, SymbolSource};
pub use config::{Config, Thresholds, WatchConfig};
pub use error::{Error, Result};
pub use symbol::{base_symbol, instrument_symbol};
pub use types::*;
