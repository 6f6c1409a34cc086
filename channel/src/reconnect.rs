//! Reconnect backoff policy.
//!
//! Connection loss is retried with capped exponential backoff and jitter, up
//! to a bounded attempt count. Exhausting the budget is terminal for the
//! supervisor: the channel reports `Lost` and waits for an explicit
//! reconnect instead of hammering a dead endpoint forever.

use std::time::Duration;

/// Backoff configuration for the reconnect supervisor.
///
/// Defaults: 8 attempts, 500ms initial delay, 30s cap, doubling each
/// attempt, jittered to 50–100% of the computed delay.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Maximum reconnect attempts before giving up
    pub max_attempts: u32,
    /// Delay before the first reconnect attempt
    pub initial_delay: Duration,
    /// Cap for the exponential backoff
    pub max_delay: Duration,
    /// Multiplier applied per attempt
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl ReconnectPolicy {
    /// Whether another attempt is within budget (`attempt` is 0-indexed).
    #[must_use]
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay before `attempt` (0-indexed), with jitter.
    ///
    /// `delay = min(initial * multiplier^attempt, max) * random(0.5..=1.0)`.
    /// Jitter spreads simultaneous reconnects from many clients after a
    /// server restart.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        use rand::Rng;

        #[allow(clippy::cast_possible_wrap)] // attempt counts stay tiny
        let base_secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped_secs = base_secs.min(self.max_delay.as_secs_f64());
        let jitter = rand::thread_rng().gen_range(0.5..=1.0);

        Duration::from_secs_f64(capped_secs * jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_and_caps() {
        let policy = ReconnectPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(4),
            multiplier: 2.0,
        };

        // Jitter keeps each delay within [0.5, 1.0] × the computed value
        let first = policy.delay_for_attempt(0);
        assert!(first >= Duration::from_millis(250));
        assert!(first <= Duration::from_millis(500));

        // 0.5s * 2^6 = 32s, capped at 4s before jitter
        let late = policy.delay_for_attempt(6);
        assert!(late >= Duration::from_secs(2));
        assert!(late <= Duration::from_secs(4));
    }

    #[test]
    fn attempt_budget_is_bounded() {
        let policy = ReconnectPolicy::default();
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(policy.max_attempts - 1));
        assert!(!policy.should_retry(policy.max_attempts));
    }
}
