//! # Startlist Testing
//!
//! Testing utilities and helpers for the startlist core.
//!
//! This crate provides:
//! - Mock implementations of Environment traits ([`mocks`])
//! - In-memory repositories, transaction manager and publisher with failure
//!   injection ([`in_memory`])
//! - Fixture builders for value objects and prepared startlists ([`fixtures`])
//! - A Given-When-Then harness for aggregate operations ([`scenario`])
//! - Property-based testing strategies ([`properties`])
//!
//! ## Example
//!
//! ```
//! use startlist_testing::{fixtures, StartlistTest};
//! use startlist_core::startlist::StartlistStatus;
//!
//! StartlistTest::given(fixtures::ready_to_finalize("sl-1"))
//!     .when(|startlist| startlist.finalize_startlist())
//!     .then_status(StartlistStatus::Finalized)
//!     .then_event_types(&["StartlistFinalized.v1"])
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use startlist_core::environment::Clock;

/// Fixture builders
pub mod fixtures;

/// In-memory ports
pub mod in_memory;

/// Property-based testing utilities using proptest
pub mod properties;

/// Given-When-Then harness for the aggregate
pub mod scenario;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use startlist_testing::mocks::FixedClock;
    /// use startlist_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
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
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Install a `tracing` subscriber for tests.
///
/// Honors `RUST_LOG` and defaults to `warn`. Output goes through the test
/// writer so it is captured per test. Safe to call from every test.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // Already installed by an earlier test.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use in_memory::{
    InMemoryStartlistRepository, InMemoryTransactionManager, InMemoryVersionRepository,
    RecordingEventPublisher,
};
pub use mocks::{FixedClock, test_clock};
pub use scenario::StartlistTest;
