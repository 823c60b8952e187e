//! # Raffle Testing
//!
//! Deterministic clocks and a reducer harness for the raffle engine's tests.
//!
//! ## Example
//!
//! ```ignore
//! use raffle_testing::{test_clock, ReducerTest};
//!
//! ReducerTest::new(TicketReducer::new())
//!     .with_env(TicketEnvironment::new(Arc::new(test_clock())))
//!     .given_state(TicketInventory::new())
//!     .when_action(TicketAction::Release { number: TicketNumber::new(7)? })
//!     .then_effects(assertions::assert_no_effects)
//!     .run();
//! ```

use chrono::{DateTime, Duration, Utc};
use raffle_core::environment::Clock;
use std::sync::Mutex;


pub use reducer_test::{assertions, ReducerTest};

/// Clocks for the reducer environment
pub mod mocks {
    use super::{Clock, DateTime, Duration, Mutex, Utc};

    /// Clock frozen at one instant
    ///
    /// Every reservation and sale made under it carries the same timestamp.
    ///
    /// # Example
    ///
    /// ```
    /// use raffle_testing::mocks::FixedClock;
    /// use raffle_core::environment::Clock;
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
        /// Freezes the clock at `time`
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

    /// Clock that only moves when a test tells it to
    ///
    /// Lets a test observe distinct reservation and sale timestamps.
    #[derive(Debug)]
    pub struct ManualClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Starts the clock at `time`
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: Duration) {
            let mut time = self
                .time
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self
                .time
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    /// The instant every test clock starts from (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_089)
    }

    /// [`FixedClock`] frozen at [`epoch`]
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(epoch())
    }
}

pub use mocks::{epoch, test_clock, FixedClock, ManualClock};
