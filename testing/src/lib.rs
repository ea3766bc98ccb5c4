//! # Optimist Testing
//!
//! Testing utilities and helpers for optimistic reducer stores.
//!
//! This crate provides:
//! - Deterministic implementations of Environment traits
//! - A Given-When-Then harness for reducers ([`ReducerTest`])
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use optimist_testing::{test_clock, ReducerTest, assertions};
//!
//! ReducerTest::new(TodoReducer::new())
//!     .with_env(test_environment())
//!     .given_state(TodoState::new())
//!     .when_action(TodoAction::submit("Buy milk"))
//!     .then_state(|state| assert_eq!(state.in_flight.len(), 1))
//!     .then_effects(|effects| assertions::assert_effects_count(effects, 1))
//!     .run();
//! ```

use chrono::{DateTime, TimeZone, Utc};
use optimist_core::environment::Clock;


pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, TimeZone, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use optimist_testing::mocks::FixedClock;
    /// use optimist_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
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

        /// Create a fixed clock at `millis` milliseconds after the Unix epoch
        ///
        /// Out-of-range values fall back to the epoch.
        #[must_use]
        pub fn at_millis(millis: i64) -> Self {
            let time = Utc
                .timestamp_millis_opt(millis)
                .single()
                .unwrap_or(DateTime::UNIX_EPOCH);
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::at_millis(1_735_689_600_000)
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().timestamp_millis(), 1_735_689_600_000);
    }

    #[test]
    fn test_at_millis() {
        let clock = FixedClock::at_millis(42);
        assert_eq!(clock.now().timestamp_millis(), 42);
    }
}
