//! RetryPolicy — spec §4.A.

use std::time::Duration;

/// Exponential back-off with a ceiling.
///
/// `delay(attempt) = min(base_delay * multiplier^(attempt-1), max_delay)`.
/// The delay is applied *after* a failed attempt and *before* the next
/// one; there is no delay after the final attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_seconds: f64,
    pub multiplier: f64,
    pub max_delay_seconds: f64,
}

impl Default for RetryPolicy {
    /// No retry: a single attempt, no back-off.
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay_seconds: 0.0,
            multiplier: 1.0,
            max_delay_seconds: 60.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_seconds: f64, multiplier: f64, max_delay_seconds: f64) -> Self {
        assert!(max_attempts >= 1, "max_attempts must be >= 1");
        assert!(base_delay_seconds >= 0.0, "base_delay_seconds must be >= 0");
        assert!(multiplier >= 1.0, "multiplier must be >= 1");
        assert!(max_delay_seconds >= 0.0, "max_delay_seconds must be >= 0");
        Self {
            max_attempts,
            base_delay_seconds,
            multiplier,
            max_delay_seconds,
        }
    }

    /// Delay to sleep after the given (1-indexed) attempt fails.
    pub fn delay(&self, attempt: u32) -> Duration {
        debug_assert!(attempt >= 1 && attempt <= self.max_attempts);
        let raw = self.base_delay_seconds * self.multiplier.powi((attempt - 1) as i32);
        Duration::from_secs_f64(raw.min(self.max_delay_seconds).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_delay_equals_base() {
        let p = RetryPolicy::new(3, 0.01, 2.0, 60.0);
        assert_eq!(p.delay(1), Duration::from_secs_f64(0.01));
    }

    #[test]
    fn delay_grows_exponentially_and_is_capped() {
        let p = RetryPolicy::new(5, 1.0, 2.0, 3.0);
        assert_eq!(p.delay(1), Duration::from_secs_f64(1.0));
        assert_eq!(p.delay(2), Duration::from_secs_f64(2.0));
        // 1 * 2^2 = 4, capped to max_delay_seconds = 3.0
        assert_eq!(p.delay(3), Duration::from_secs_f64(3.0));
        assert_eq!(p.delay(4), Duration::from_secs_f64(3.0));
    }

    #[test]
    fn default_has_no_retry_and_no_delay() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 1);
        assert_eq!(p.delay(1), Duration::from_secs_f64(0.0));
    }
}
