use common::{AlertCategory, StreakResult, Thresholds};

/// Maps a streak result to a single alert category.
///
/// Categories overlap numerically, so they are tested in a fixed order and
/// the first match wins: break, strong growth, growth.
#[derive(Debug, Clone, Default)]
pub struct AlertClassifier {
    pub thresholds: Thresholds,
}

impl AlertClassifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn classify(&self, result: &StreakResult) -> AlertCategory {
        if result.is_break {
            AlertCategory::Break
        } else if result.growth_days >= self.thresholds.strong_growth {
            AlertCategory::StrongGrowth
        } else if result.growth_days >= self.thresholds.growth {
            AlertCategory::Growth
        } else {
            AlertCategory::None
        }
    }

    /// Alert text for a category, or `None` when nothing should be sent.
    pub fn render(category: AlertCategory, base: &str, result: &StreakResult) -> Option<String> {
        let days = result.growth_days;
        let price = result.current.unwrap_or(0.0);
        let text = match category {
            AlertCategory::Break => {
                format!("🔴 DROP {base}: after {days} days of growth! Price: ${price:.2}")
            }
            AlertCategory::StrongGrowth => {
                format!("🚀 STRONG GROWTH {base}: {days} days in a row! Price: ${price:.2}")
            }
            AlertCategory::Growth => {
                format!("🟢 GROWTH {base}: {days} days in a row! Price: ${price:.2}")
            }
            AlertCategory::None => return None,
        };
        Some(text)
    }
}
