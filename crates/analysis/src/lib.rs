pub mod change;
pub mod classifier;
pub mod normalize;
pub mod streak;

pub use change::{parse_query, ChangeReport, Query};
pub use classifier::AlertClassifier;
pub use normalize::{closes, normalize};
pub use streak::StreakAnalyzer;
