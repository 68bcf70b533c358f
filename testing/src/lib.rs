//! # Hotel Testing
//!
//! Testing utilities and helpers for the hotel reservation workspace.
//!
//! This crate provides:
//! - Deterministic clocks (`FixedClock`, `ManualClock`)
//! - Recording and failing event publishers
//! - proptest strategies for dates, stays and room counts
//! - A tracing initialiser for tests
//!
//! ## Example
//!
//! ```
//! use hotel_testing::{ManualClock, test_clock};
//! use hotel_core::environment::Clock;
//! use chrono::Duration;
//!
//! let clock = ManualClock::new(test_clock().now());
//! let before = clock.today();
//! clock.advance(Duration::days(3));
//! assert_eq!(clock.today(), before + Duration::days(3));
//! ```

use chrono::{DateTime, Utc};
use hotel_core::environment::Clock;

/// Recording and failing event publishers
pub mod event_bus;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::{Duration, NaiveDate};
    use std::sync::{Arc, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use hotel_testing::mocks::FixedClock;
    /// use hotel_core::environment::Clock;
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

        /// Fixed clock at midnight UTC of `date`
        #[must_use]
        pub fn at_date(date: NaiveDate) -> Self {
            Self::new(date.and_time(chrono::NaiveTime::MIN).and_utc())
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when a test moves it.
    ///
    /// Clones share the same time, so a test can keep a handle while the
    /// services under test hold another.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a manual clock starting at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Jump to `time`
        pub fn set(&self, time: DateTime<Utc>) {
            *self
                .time
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner) = time;
        }

        /// Move forward by `by`
        pub fn advance(&self, by: Duration) {
            let mut time = self
                .time
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self
                .time
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::at_date(crate::properties::base_date())
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    /// Base date the generated dates are offset from (2025-01-01).
    #[must_use]
    pub fn base_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN)
    }

    /// A date within `days` days after [`base_date`].
    pub fn date_within(days: i64) -> impl Strategy<Value = NaiveDate> {
        (0..days).prop_map(|offset| base_date() + Duration::days(offset))
    }

    /// A `(check_in, check_out)` pair with a stay between 1 and `max_nights` nights.
    pub fn stay(max_nights: i64) -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
        (date_within(60), 1..=max_nights)
            .prop_map(|(check_in, nights)| (check_in, check_in + Duration::days(nights)))
    }

    /// A room count between 1 and `max`.
    pub fn room_count(max: u32) -> impl Strategy<Value = u32> {
        1..=max
    }
}

/// Install a tracing subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs the subscriber.
/// The filter honours `RUST_LOG` and defaults to `debug`.
pub fn init_test_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use event_bus::{FailingEventBus, InMemoryEventBus};
pub use mocks::{FixedClock, ManualClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration};
    use proptest::prelude::*;

    #[test]
    fn test_clock_is_new_year_2025() {
        let clock = test_clock();
        let today = clock.today();
        assert_eq!((today.year(), today.month(), today.day()), (2025, 1, 1));
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(test_clock().now());
        let handle = clock.clone();
        handle.advance(Duration::hours(49));
        assert_eq!(clock.now(), test_clock().now() + Duration::hours(49));

        clock.set(test_clock().now());
        assert_eq!(handle.now(), test_clock().now());
    }

    proptest! {
        #[test]
        fn generated_stays_are_non_empty((check_in, check_out) in properties::stay(30)) {
            prop_assert!(check_out > check_in);
            prop_assert!((check_out - check_in).num_days() <= 30);
        }
    }
}
