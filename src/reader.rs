// Sample reader: warm-up, safe reads and percentage clamping over a CounterSource

use tracing::debug;

use crate::models::CounterHandle;
use crate::sources::CounterSource;

/// Clamp a percentage-like value into `[0, 100]`. NaN and negative zero become 0.
pub fn clamp_percent(p: f64) -> f64 {
    if p.is_nan() || p <= 0.0 { 0.0 } else { p.min(100.0) }
}

/// Disk active time derived from idle time: `100 - idle`, both sides clamped.
pub fn active_from_idle(idle_percent: f64) -> f64 {
    clamp_percent(100.0 - clamp_percent(idle_percent))
}

/// Outcome of one counter read. Call sites decide how `Failed` renders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Ok(f64),
    Failed,
}

impl Sample {
    pub fn value(self) -> Option<f64> {
        match self {
            Sample::Ok(v) => Some(v),
            Sample::Failed => None,
        }
    }

    /// Zero-substitution policy: a failed read counts as 0.
    pub fn or_zero(self) -> f64 {
        self.value().unwrap_or(0.0)
    }

    pub fn is_failed(self) -> bool {
        matches!(self, Sample::Failed)
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Sample {
        match self {
            Sample::Ok(v) => Sample::Ok(f(v)),
            Sample::Failed => Sample::Failed,
        }
    }
}

/// Reads counters through a [`CounterSource`] without ever failing the caller.
pub struct SampleReader<'a> {
    source: &'a dyn CounterSource,
}

impl<'a> SampleReader<'a> {
    pub fn new(source: &'a dyn CounterSource) -> Self {
        Self { source }
    }

    /// Discard the first value of a freshly created counter; rate counters have no
    /// baseline on that read.
    pub fn warm_up(&self, handle: &CounterHandle) {
        if let Err(e) = self.source.read_value(handle) {
            debug!(counter = %handle, error = %e, "warm-up read failed");
        }
    }

    pub fn read(&self, handle: &CounterHandle) -> Sample {
        match self.source.read_value(handle) {
            Ok(v) if v.is_finite() => Sample::Ok(v),
            Ok(v) => {
                debug!(counter = %handle, value = v, "non-finite counter value");
                Sample::Failed
            }
            Err(e) => {
                debug!(counter = %handle, error = %e, "counter read failed");
                Sample::Failed
            }
        }
    }

    pub fn read_or_zero(&self, handle: &CounterHandle) -> f64 {
        self.read(handle).or_zero()
    }

    /// Read a percentage counter, clamped to `[0, 100]`.
    pub fn read_percent(&self, handle: &CounterHandle) -> Sample {
        self.read(handle).map(clamp_percent)
    }

    /// Read a bytes/sec counter; negative values (counter wrap or reset) become 0.
    pub fn read_rate(&self, handle: &CounterHandle) -> Sample {
        self.read(handle).map(|v| if v > 0.0 { v } else { 0.0 })
    }
}
