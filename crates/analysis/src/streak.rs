use common::{Candle, StreakResult};

use crate::normalize::closes;

/// Consecutive up-day detector.
///
/// Counts the run of strictly rising daily closes ending at the newest
/// candle. When the newest day is itself a drop, the same backward scan
/// measures the run that just ended, counting the drop day as its last
/// day. A run of at least `break_after` days makes the drop a break and is
/// reported as `growth_days`; a shorter one reports zero.
#[derive(Debug, Clone)]
pub struct StreakAnalyzer {
    pub break_after: u32,
}

impl Default for StreakAnalyzer {
    fn default() -> Self {
        Self::new(6)
    }
}

impl StreakAnalyzer {
    pub fn new(break_after: u32) -> Self {
        Self { break_after }
    }

    /// Analyze closing prices (oldest first).
    /// Fewer than two values yields the no-signal result.
    pub fn analyze(&self, closes: &[f64]) -> StreakResult {
        let n = closes.len();
        if n < 2 {
            return StreakResult::no_signal();
        }

        let current = closes[n - 1];
        let previous = closes[n - 2];

        if current < previous {
            let ended_run = rising_run(&closes[..n - 1]) + 1;
            let is_break = ended_run >= self.break_after;
            return StreakResult {
                growth_days: if is_break { ended_run } else { 0 },
                current: Some(current),
                previous: Some(previous),
                is_break,
            };
        }

        StreakResult {
            growth_days: rising_run(closes),
            current: Some(current),
            previous: Some(previous),
            is_break: false,
        }
    }

    pub fn analyze_candles(&self, candles: &[Candle]) -> StreakResult {
        self.analyze(&closes(candles))
    }
}

/// Number of strictly increasing adjacent pairs at the end of `closes`.
fn rising_run(closes: &[f64]) -> u32 {
    closes
        .windows(2)
        .rev()
        .take_while(|w| w[1] > w[0])
        .count() as u32
}
