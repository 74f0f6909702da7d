// Per-counter baselines for turning cumulative totals into per-second rates

use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Baseline {
    value: u64,
    at: Instant,
}

/// Keeps the previous cumulative value of every rate counter, keyed by handle id.
#[derive(Debug, Default)]
pub struct RateTracker {
    baselines: HashMap<u64, Baseline>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` for counter `id` and return the per-second rate since the previous
    /// observation. The first observation has no baseline and returns `None`. A total that
    /// went backwards (wrap or reset) rates as 0 and becomes the new baseline.
    pub fn observe(&mut self, id: u64, value: u64, now: Instant) -> Option<f64> {
        let prev = self.baselines.insert(id, Baseline { value, at: now })?;
        let secs = now.saturating_duration_since(prev.at).as_secs_f64();
        if secs <= 0.0 || value < prev.value {
            return Some(0.0);
        }
        Some((value - prev.value) as f64 / secs)
    }
}
