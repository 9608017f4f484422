//! Retry backoff schedule.

use std::time::Duration;

/// Linear backoff: the wait after failed attempt `n` (0-based) is `base × (n + 2)`.
///
/// There is no bound unless `max_delay` is set; the retry count is what
/// normally limits total waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max_delay: Option<Duration>,
}

impl BackoffPolicy {
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            max_delay: None,
        }
    }

    pub fn with_cap(mut self, cap: Option<Duration>) -> Self {
        self.max_delay = cap;
        self
    }

    /// Delay to wait before the retry that follows failed attempt `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let delay = self.base.saturating_mul(attempt.saturating_add(2));
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_with_attempt_number() {
        let policy = BackoffPolicy::new(Duration::from_secs(1));
        assert_eq!(policy.delay(0), Duration::from_secs(2));
        assert_eq!(policy.delay(1), Duration::from_secs(3));
        assert_eq!(policy.delay(4), Duration::from_secs(6));
    }

    #[test]
    fn fractional_base() {
        let policy = BackoffPolicy::new(Duration::from_millis(500));
        assert_eq!(policy.delay(0), Duration::from_millis(1000));
        assert_eq!(policy.delay(1), Duration::from_millis(1500));
    }

    #[test]
    fn cap_bounds_delay() {
        let policy =
            BackoffPolicy::new(Duration::from_secs(10)).with_cap(Some(Duration::from_secs(25)));
        assert_eq!(policy.delay(0), Duration::from_secs(20));
        assert_eq!(policy.delay(1), Duration::from_secs(25));
        assert_eq!(policy.delay(50), Duration::from_secs(25));
    }

    #[test]
    fn zero_base_never_waits() {
        let policy = BackoffPolicy::new(Duration::ZERO);
        assert_eq!(policy.delay(3), Duration::ZERO);
    }
}
