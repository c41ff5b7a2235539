//! Delay between connection attempts.
//!
//! Grows geometrically from `first` by `factor` per consecutive failed
//! attempt and is clamped to `max`. With the default factor of `1.0`
//! every attempt waits exactly `first`. Nothing here ever returns less
//! than `first`.

use std::time::Duration;
use tether_core::SessionConfig;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReconnectBackoff {
    /// Delay before the first retry.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0`).
    pub factor: f64,
}

impl Default for ReconnectBackoff {
    /// `first = 5s`, `max = 5s`, `factor = 1.0`.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(5),
            max: Duration::from_secs(5),
            factor: 1.0,
        }
    }
}

impl ReconnectBackoff {
    pub fn from_config(config: &SessionConfig) -> Self {
        let first = config.reconnect_delay;
        Self {
            first,
            max: config.max_reconnect_delay.unwrap_or(first).max(first),
            factor: config.backoff_factor.max(1.0),
        }
    }

    /// Delay to wait after `attempt` consecutive failures (zero-based).
    ///
    /// `attempt == 0` is the wait after the first failure, so it is `first`.
    /// Callers reset their counter once a session has reached `Ready`.
    pub fn next(&self, attempt: u32) -> Duration {
        let first = self.first.as_secs_f64();
        let max = self.max.as_secs_f64().max(first);
        let exp = self.factor.powi(attempt.min(i32::MAX as u32) as i32);

        let secs = first * exp;
        if !secs.is_finite() || secs >= max {
            return self.max.max(self.first);
        }
        Duration::from_secs_f64(secs).max(self.first)
    }
}
