//! Domain events emitted by the startlist aggregate.
//!
//! Events are immutable facts about transitions that already happened. Each
//! event owns its payload: it is built from clones taken at the moment of the
//! transition, so later changes to the aggregate never reach an event that was
//! already recorded.
//!
//! # Wire format
//!
//! Events serialize with `bincode` through the [`Event`] trait. The
//! [`SerializedEvent`] envelope adds a stable, versioned type name and JSON
//! metadata (`startlistId`, `occurredAt`) so that consumers can route and
//! order events without decoding the payload.
//!
//! # Example
//!
//! ```
//! use startlist_core::event::{Event, StartlistEvent};
//! use startlist_core::id::StartlistId;
//! use chrono::Utc;
//!
//! let event = StartlistEvent::StartTimesInvalidated {
//!     startlist_id: StartlistId::new("sl-1"),
//!     reason: "Lane order assigned - start times invalidated".to_string(),
//!     occurred_at: Utc::now(),
//! };
//!
//! assert_eq!(event.event_type(), "StartlistStartTimesInvalidated.v1");
//! let serialized = event.to_serialized().unwrap();
//! assert_eq!(serialized.event_type, "StartlistStartTimesInvalidated.v1");
//! ```

use crate::id::StartlistId;
use crate::startlist::StartlistSnapshot;
use crate::value_objects::{ClassAssignment, LaneAssignment, StartTime, StartlistSettings};
use crate::version_store::NewVersionRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event operations.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// An event that can be stored or published as bytes.
///
/// `event_type()` returns a stable identifier with a version suffix
/// (`"StartlistFinalized.v1"`), so payload schemas can evolve.
pub trait Event: Send + Sync + 'static {
    /// Returns the event type identifier for this event.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the bytes are corrupted or
    /// were produced by an incompatible schema.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// A serialized event ready for a bus or an audit store.
#[derive(Clone, Debug)]
pub struct SerializedEvent {
    /// The event type identifier (e.g., `"StartlistFinalized.v1"`).
    pub event_type: String,

    /// The bincode-serialized event data.
    pub data: Vec<u8>,

    /// Optional metadata in JSON format.
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    #[must_use]
    pub const fn new(
        event_type: String,
        data: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            data,
            metadata,
        }
    }

    /// Create a serialized event from an `Event` value.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    pub fn from_event<E: Event + Serialize>(
        event: &E,
        metadata: Option<serde_json::Value>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
            metadata,
        })
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}

/// Every transition the startlist lifecycle can record.
///
/// All variants carry the `startlist_id` they belong to and the `occurred_at`
/// instant of the transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartlistEvent {
    /// Timing settings were entered on a draft startlist.
    SettingsEntered {
        /// Startlist the event belongs to.
        startlist_id: StartlistId,
        /// Settings as entered.
        settings: StartlistSettings,
        /// When the transition happened.
        occurred_at: DateTime<Utc>,
    },

    /// Classes were assigned to lanes.
    LaneOrderAssigned {
        /// Startlist the event belongs to.
        startlist_id: StartlistId,
        /// The full new lane assignment set.
        lane_assignments: Vec<LaneAssignment>,
        /// When the transition happened.
        occurred_at: DateTime<Utc>,
    },

    /// An organizer manually reassigned the lane order.
    LaneOrderManuallyReassigned {
        /// Startlist the event belongs to.
        startlist_id: StartlistId,
        /// The full new lane assignment set.
        lane_assignments: Vec<LaneAssignment>,
        /// When the transition happened.
        occurred_at: DateTime<Utc>,
    },

    /// Players were ordered within their classes.
    PlayerOrderAssigned {
        /// Startlist the event belongs to.
        startlist_id: StartlistId,
        /// The full new class assignment set.
        class_assignments: Vec<ClassAssignment>,
        /// When the transition happened.
        occurred_at: DateTime<Utc>,
    },

    /// An organizer manually finalized the class start order.
    ClassStartOrderManuallyFinalized {
        /// Startlist the event belongs to.
        startlist_id: StartlistId,
        /// The full new class assignment set.
        class_assignments: Vec<ClassAssignment>,
        /// When the transition happened.
        occurred_at: DateTime<Utc>,
    },

    /// Concrete start times were assigned.
    StartTimesAssigned {
        /// Startlist the event belongs to.
        startlist_id: StartlistId,
        /// The full new start time set.
        start_times: Vec<StartTime>,
        /// When the transition happened.
        occurred_at: DateTime<Utc>,
    },

    /// Previously assigned start times were cleared.
    StartTimesInvalidated {
        /// Startlist the event belongs to.
        startlist_id: StartlistId,
        /// Why the start times were cleared.
        reason: String,
        /// When the transition happened.
        occurred_at: DateTime<Utc>,
    },

    /// The startlist was finalized.
    Finalized {
        /// Startlist the event belongs to.
        startlist_id: StartlistId,
        /// Full state at the moment of finalization.
        snapshot: StartlistSnapshot,
        /// When the transition happened.
        occurred_at: DateTime<Utc>,
    },

    /// A snapshot was confirmed as an auditable version.
    ///
    /// Never emitted by the aggregate; produced by the confirmation policy of
    /// the command layer.
    VersionConfirmed {
        /// Startlist the event belongs to.
        startlist_id: StartlistId,
        /// Confirmed state.
        snapshot: StartlistSnapshot,
        /// When the version was confirmed.
        confirmed_at: DateTime<Utc>,
        /// When the event was recorded.
        occurred_at: DateTime<Utc>,
    },
}

impl StartlistEvent {
    /// Startlist this event belongs to.
    #[must_use]
    pub const fn startlist_id(&self) -> &StartlistId {
        match self {
            Self::SettingsEntered { startlist_id, .. }
            | Self::LaneOrderAssigned { startlist_id, .. }
            | Self::LaneOrderManuallyReassigned { startlist_id, .. }
            | Self::PlayerOrderAssigned { startlist_id, .. }
            | Self::ClassStartOrderManuallyFinalized { startlist_id, .. }
            | Self::StartTimesAssigned { startlist_id, .. }
            | Self::StartTimesInvalidated { startlist_id, .. }
            | Self::Finalized { startlist_id, .. }
            | Self::VersionConfirmed { startlist_id, .. } => startlist_id,
        }
    }

    /// When the transition happened.
    #[must_use]
    pub const fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::SettingsEntered { occurred_at, .. }
            | Self::LaneOrderAssigned { occurred_at, .. }
            | Self::LaneOrderManuallyReassigned { occurred_at, .. }
            | Self::PlayerOrderAssigned { occurred_at, .. }
            | Self::ClassStartOrderManuallyFinalized { occurred_at, .. }
            | Self::StartTimesAssigned { occurred_at, .. }
            | Self::StartTimesInvalidated { occurred_at, .. }
            | Self::Finalized { occurred_at, .. }
            | Self::VersionConfirmed { occurred_at, .. } => *occurred_at,
        }
    }

    /// Whether this event marks a confirmed version.
    #[must_use]
    pub const fn is_version_confirmation(&self) -> bool {
        matches!(self, Self::VersionConfirmed { .. })
    }

    /// The record to persist in a version store, for version confirmations.
    #[must_use]
    pub fn version_record(&self) -> Option<NewVersionRecord> {
        match self {
            Self::VersionConfirmed {
                startlist_id,
                snapshot,
                confirmed_at,
                ..
            } => Some(NewVersionRecord {
                startlist_id: startlist_id.clone(),
                snapshot: snapshot.clone(),
                confirmed_at: *confirmed_at,
            }),
            _ => None,
        }
    }

    /// Wrap this event in a [`SerializedEvent`] with routing metadata.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the payload cannot be encoded.
    pub fn to_serialized(&self) -> Result<SerializedEvent, EventError> {
        let metadata = serde_json::json!({
            "startlistId": self.startlist_id().as_str(),
            "occurredAt": self.occurred_at().to_rfc3339(),
        });
        SerializedEvent::from_event(self, Some(metadata))
    }
}

impl Event for StartlistEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::SettingsEntered { .. } => "StartlistSettingsEntered.v1",
            Self::LaneOrderAssigned { .. } => "StartlistLaneOrderAssigned.v1",
            Self::LaneOrderManuallyReassigned { .. } => "StartlistLaneOrderManuallyReassigned.v1",
            Self::PlayerOrderAssigned { .. } => "StartlistPlayerOrderAssigned.v1",
            Self::ClassStartOrderManuallyFinalized { .. } => {
                "StartlistClassStartOrderManuallyFinalized.v1"
            }
            Self::StartTimesAssigned { .. } => "StartlistStartTimesAssigned.v1",
            Self::StartTimesInvalidated { .. } => "StartlistStartTimesInvalidated.v1",
            Self::Finalized { .. } => "StartlistFinalized.v1",
            Self::VersionConfirmed { .. } => "StartlistVersionConfirmed.v1",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::startlist::StartlistStatus;
    use crate::value_objects::{Duration, LaneAssignmentParams};

    fn at(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn lane() -> LaneAssignment {
        LaneAssignment::create(LaneAssignmentParams {
            lane_number: 1,
            class_order: vec!["M21".to_string()],
            interval: Duration::create(60_000).unwrap(),
            lane_count: 1,
        })
        .unwrap()
    }

    fn snapshot() -> StartlistSnapshot {
        StartlistSnapshot {
            id: StartlistId::new("sl-1"),
            settings: None,
            lane_assignments: vec![lane()],
            class_assignments: Vec::new(),
            start_times: Vec::new(),
            status: StartlistStatus::LaneOrderAssigned,
        }
    }

    #[test]
    fn accessors_cover_every_variant() {
        let event = StartlistEvent::LaneOrderAssigned {
            startlist_id: StartlistId::new("sl-1"),
            lane_assignments: vec![lane()],
            occurred_at: at("2025-04-01T08:00:00Z"),
        };
        assert_eq!(event.startlist_id().as_str(), "sl-1");
        assert_eq!(event.occurred_at(), at("2025-04-01T08:00:00Z"));
        assert!(!event.is_version_confirmation());
        assert!(event.version_record().is_none());
    }

    #[test]
    fn version_confirmation_yields_a_record() {
        let event = StartlistEvent::VersionConfirmed {
            startlist_id: StartlistId::new("sl-1"),
            snapshot: snapshot(),
            confirmed_at: at("2025-04-01T08:30:00Z"),
            occurred_at: at("2025-04-01T08:30:00Z"),
        };
        assert!(event.is_version_confirmation());
        let record = event.version_record().expect("confirmation has a record");
        assert_eq!(record.startlist_id, StartlistId::new("sl-1"));
        assert_eq!(record.confirmed_at, at("2025-04-01T08:30:00Z"));
        assert_eq!(record.snapshot, snapshot());
    }

    #[test]
    fn bincode_roundtrip_preserves_payload() {
        let event = StartlistEvent::Finalized {
            startlist_id: StartlistId::new("sl-1"),
            snapshot: snapshot(),
            occurred_at: at("2025-04-01T08:00:00Z"),
        };
        let bytes = event.to_bytes().expect("serialization should succeed");
        let decoded = StartlistEvent::from_bytes(&bytes).expect("deserialization should succeed");
        assert_eq!(decoded, event);
    }

    #[test]
    fn serialized_event_carries_metadata() {
        let event = StartlistEvent::StartTimesInvalidated {
            startlist_id: StartlistId::new("sl-9"),
            reason: "manual".to_string(),
            occurred_at: at("2025-04-01T08:00:00Z"),
        };
        let serialized = event.to_serialized().unwrap();
        assert_eq!(serialized.event_type, "StartlistStartTimesInvalidated.v1");
        let metadata = serialized.metadata.expect("metadata present");
        assert_eq!(metadata["startlistId"], "sl-9");
        assert_eq!(metadata["occurredAt"], "2025-04-01T08:00:00+00:00");
        assert!(format!("{}", SerializedEvent::new("X.v1".to_string(), vec![1, 2], None))
            .contains("2 bytes"));
    }
}
