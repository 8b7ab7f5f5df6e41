//! # Startlist Core
//!
//! Domain model for the startlist lifecycle of a timed sporting event.
//!
//! A startlist turns an event's timing settings into a finalized start order:
//! classes are placed in lanes, players are ordered within classes, concrete
//! start times are assigned, and the result is confirmed. Changing an upstream
//! stage after the fact invalidates the start times that depended on it.
//!
//! ## Core Concepts
//!
//! - **Value objects**: validated at construction, immutable afterwards
//!   ([`value_objects`])
//! - **Aggregate**: [`startlist::Startlist`] enforces lifecycle rules and
//!   records [`event::StartlistEvent`]s in emission order
//! - **Ports**: async traits for persistence and delivery
//!   ([`repository`], [`version_store`], [`event_bus`])
//! - **Environment**: injected dependencies such as the [`environment::Clock`]
//!
//! ## Example
//!
//! ```
//! use startlist_core::id::StartlistId;
//! use startlist_core::startlist::{Startlist, StartlistStatus};
//! use startlist_core::value_objects::{
//!     Duration, StartlistSettings, StartlistSettingsParams, parse_instant,
//! };
//!
//! # fn main() -> Result<(), startlist_core::error::DomainError> {
//! let mut startlist = Startlist::create_new(StartlistId::parse("spring-cup")?);
//! startlist.enter_settings(StartlistSettings::create(StartlistSettingsParams {
//!     event_id: "spring-cup-2025".to_string(),
//!     start_time: parse_instant("2025-04-01T09:00:00Z")?,
//!     lane_class_interval: Duration::create(60_000)?,
//!     class_player_interval: Duration::create(30_000)?,
//!     lane_count: 2,
//! })?)?;
//!
//! assert_eq!(startlist.status(), StartlistStatus::SettingsEntered);
//! assert_eq!(startlist.pull_domain_events().len(), 1);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

pub mod error;
pub mod event;
pub mod event_bus;
pub mod id;
pub mod repository;
pub mod startlist;
pub mod value_objects;
pub mod version_store;

pub use error::{DomainError, DomainResult};
pub use event::{Event, StartlistEvent};
pub use id::{StartlistId, Version};
pub use startlist::{Startlist, StartlistSnapshot, StartlistStatus};

/// Environment module - Dependency injection traits
///
/// External dependencies of the domain are abstracted behind traits and
/// injected into the aggregate and the command runtime.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{DateTime, Utc};
    /// use startlist_core::environment::Clock;
    ///
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::environment::{Clock, SystemClock};
    use chrono::Utc;

    #[test]
    fn system_clock_tracks_wall_time() {
        let before = Utc::now();
        let now = SystemClock.now();
        assert!(now >= before);
        assert!(now <= Utc::now());
    }
}
