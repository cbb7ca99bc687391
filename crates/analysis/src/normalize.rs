use tracing::debug;

use common::Candle;

/// Turn a raw provider batch into the last `days` candles, oldest first.
///
/// Sorts by timestamp, collapses duplicate timestamps (the row seen last
/// wins) and drops rows whose close is not a positive finite number.
pub fn normalize(mut raw: Vec<Candle>, days: usize) -> Vec<Candle> {
    let before = raw.len();
    raw.retain(|c| c.close.is_finite() && c.close > 0.0);
    if raw.len() != before {
        debug!(dropped = before - raw.len(), "Dropped candles with invalid close");
    }

    // Stable sort keeps provider order among equal timestamps.
    raw.sort_by_key(|c| c.timestamp);

    let mut ordered: Vec<Candle> = Vec::with_capacity(raw.len());
    for candle in raw {
        match ordered.last_mut() {
            Some(last) if last.timestamp == candle.timestamp => *last = candle,
            _ => ordered.push(candle),
        }
    }

    let skip = ordered.len().saturating_sub(days);
    ordered.split_off(skip)
}

/// Closing prices of an already normalized batch.
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(ts: i64, close: f64) -> Candle {
        Candle::close_at(ts, close)
    }

    #[test]
    fn sorts_unordered_batch() {
        let out = normalize(vec![c(3, 30.0), c(1, 10.0), c(2, 20.0)], 10);
        assert_eq!(closes(&out), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn keeps_only_last_days() {
        let raw = (0..15).map(|i| c(i, 100.0 + i as f64)).collect();
        let out = normalize(raw, 10);
        assert_eq!(out.len(), 10);
        assert_eq!(out.first().unwrap().timestamp, 5);
        assert_eq!(out.last().unwrap().timestamp, 14);
    }

    #[test]
    fn duplicate_timestamps_collapse_to_last_seen() {
        let out = normalize(vec![c(1, 10.0), c(2, 20.0), c(2, 21.0), c(3, 30.0)], 10);
        assert_eq!(closes(&out), vec![10.0, 21.0, 30.0]);
    }

    #[test]
    fn invalid_closes_are_dropped() {
        let out = normalize(vec![c(1, 10.0), c(2, f64::NAN), c(3, 0.0), c(4, 12.0)], 10);
        assert_eq!(closes(&out), vec![10.0, 12.0]);
    }

    #[test]
    fn empty_and_zero_window() {
        assert!(normalize(Vec::new(), 10).is_empty());
        assert!(normalize(vec![c(1, 1.0)], 0).is_empty());
    }
}
