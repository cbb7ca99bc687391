pub mod cycle;
pub mod kucoin;
pub mod scheduler;
pub mod sheet;

#[cfg(test)]
mod testing;

pub use cycle::Orchestrator;
pub use kucoin::KucoinClient;
pub use scheduler::{Scheduler, SchedulerHandle};
pub use sheet::SheetSymbolSource;
