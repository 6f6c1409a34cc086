//! # Tableflow Testing
//!
//! Testing utilities for the tableflow surfaces:
//!
//! - deterministic clocks ([`FixedClock`], [`SteppingClock`])
//! - the [`ReducerTest`] given/when/then harness
//! - a [`fakes::FakeChannel`] that injects push events by hand
//! - a [`fakes::ScriptedOrderApi`] with programmable backend responses
//!
//! ## Example
//!
//! ```ignore
//! use tableflow_testing::{test_clock, ReducerTest};
//!
//! ReducerTest::new(KitchenReducer)
//!     .with_env(test_environment())
//!     .given_state(KitchenState::default())
//!     .when_action(KitchenAction::Refresh)
//!     .then_state(|state| assert!(state.loading))
//!     .run();
//! ```

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};
use tableflow_core::environment::Clock;


/// Fake channel and scripted backend
pub mod fakes;

pub use reducer_test::{ReducerTest, assertions};

/// Fixed clock for deterministic tests
///
/// Always returns the same time, making tests reproducible.
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Clock a test advances by hand.
///
/// Staleness sweeps, cooldowns and newness thresholds are all tested by
/// stepping this clock over their boundaries.
pub struct SteppingClock {
    now: Mutex<DateTime<Utc>>,
}

impl SteppingClock {
    /// Creates a clock starting at `now`
    #[must_use]
    pub fn starting_at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    /// Moves the clock forward
    pub fn advance(&self, by: Duration) {
        let mut now = self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Create a default fixed clock for tests (2026-01-01 00:00:00 UTC)
///
/// # Panics
///
/// Panics if the hardcoded timestamp fails to parse, which should never
/// happen in practice.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_never_moves() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn stepping_clock_advances() {
        let clock = SteppingClock::starting_at(test_clock().now());
        let before = clock.now();
        clock.advance(Duration::minutes(90));
        assert_eq!(clock.now() - before, Duration::minutes(90));
    }
}
