//! Exponential-backoff policy for automatic reconnection.
//!
//! The numeric constants are configuration, not contract: defaults are
//! a 1-second base delay doubling per attempt, clamped at 30 seconds,
//! with a 5-attempt ceiling.

use std::time::Duration;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnection attempt.
    pub base_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Attempts before reconnection is abandoned.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the given 1-based attempt, or `None` once the
    /// attempt ceiling is exceeded.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let factor = self.multiplier.powi(attempt as i32 - 1);
        let delay_ms = (self.base_delay.as_millis() as f64 * factor) as u64;
        Some(Duration::from_millis(delay_ms).min(self.max_delay))
    }
}
