//! Retry policy for the `retry` error strategy

use std::time::Duration;

/// Exponential backoff settings
///
/// After the initial failure the stage is re-run up to `max_attempts` times.
/// Before retry `i` (0-based) the engine waits
/// `base_delay * backoff_factor^i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub backoff_factor: f64,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            backoff_factor,
            ..Self::default()
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Policy that retries without sleeping
    pub fn immediate(max_attempts: usize) -> Self {
        Self::new(max_attempts, 2.0).with_base_delay(Duration::ZERO)
    }

    /// Wait before retry number `attempt` (0-based)
    ///
    /// Negative or NaN results yield no wait; overflow saturates to `Duration::MAX`.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor: 2.0,
            base_delay: Duration::from_secs(1),
        }
    }
}
