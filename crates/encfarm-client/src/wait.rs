//! Delay policies between poll ticks.

use std::fmt;
use std::time::Duration;

/// Default delay between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Decides how long the poller sleeps before the next fetch.
///
/// `attempt` counts completed non-terminal ticks, starting at 0.
pub trait WaitPolicy: Send + Sync + fmt::Debug {
    /// Delay before the next tick.
    fn next_delay(&self, attempt: u32) -> Duration;
}

/// Same delay every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedInterval {
    interval: Duration,
}

impl FixedInterval {
    /// Create a fixed-interval policy.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for FixedInterval {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl WaitPolicy for FixedInterval {
    fn next_delay(&self, _attempt: u32) -> Duration {
        self.interval
    }
}

/// Geometric backoff, capped at `max`.
///
/// Useful for encodes that take hours: early ticks stay responsive, later
/// ones stop hammering the API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    initial: Duration,
    multiplier: f64,
    max: Duration,
}

impl ExponentialBackoff {
    /// Create a backoff policy. A multiplier below 1.0 is treated as 1.0.
    pub fn new(initial: Duration, multiplier: f64, max: Duration) -> Self {
        let multiplier = if multiplier.is_finite() && multiplier >= 1.0 {
            multiplier
        } else {
            1.0
        };
        Self {
            initial,
            multiplier,
            max: max.max(initial),
        }
    }
}

impl WaitPolicy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).map_or(self.max, |d| d.min(self.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_interval() {
        let policy = FixedInterval::default();
        assert_eq!(policy.next_delay(0), Duration::from_secs(1));
        assert_eq!(policy.next_delay(1000), Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy =
            ExponentialBackoff::new(Duration::from_secs(1), 2.0, Duration::from_secs(10));
        assert_eq!(policy.next_delay(0), Duration::from_secs(1));
        assert_eq!(policy.next_delay(1), Duration::from_secs(2));
        assert_eq!(policy.next_delay(3), Duration::from_secs(8));
        assert_eq!(policy.next_delay(4), Duration::from_secs(10));
        assert_eq!(policy.next_delay(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_backoff_rejects_shrinking_multiplier() {
        let policy =
            ExponentialBackoff::new(Duration::from_secs(2), 0.5, Duration::from_secs(1));
        // max is raised to initial, multiplier clamped to 1.0
        assert_eq!(policy.next_delay(5), Duration::from_secs(2));
    }
}
