//! Self-validating value objects used by the startlist aggregate.
//!
//! Every type here is built through a `create(params)` factory, so a live
//! instance is always valid. Deserialization runs through the same validation.
//! Fields are private; accessors hand out borrows or `Copy` values, so nothing
//! outside the value object can change it after construction.

use crate::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Parse an RFC 3339 timestamp into an instant.
///
/// # Errors
///
/// Returns a [`DomainError`] if `value` is not a valid RFC 3339 date-time.
///
/// # Examples
///
/// ```
/// use startlist_core::value_objects::parse_instant;
///
/// assert!(parse_instant("2025-04-01T09:00:00Z").is_ok());
/// assert!(parse_instant("not a date").is_err());
/// ```
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(value)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|_| DomainError::new(format!("'{value}' is not a valid date-time.")))
}

fn ensure_unique<'a>(
    ids: impl IntoIterator<Item = &'a String>,
    on_duplicate: impl Fn(&str) -> String,
) -> Result<(), DomainError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(DomainError::new(on_duplicate(id)));
        }
    }
    Ok(())
}

// ============================================================================
// Duration
// ============================================================================

/// A strictly positive span of time, in whole milliseconds.
///
/// The integer representation is always finite; `create` enforces `> 0`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Duration {
    milliseconds: i64,
}

impl Duration {
    /// Create a duration from a millisecond count.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] if `milliseconds` is zero or negative.
    pub fn create(milliseconds: i64) -> Result<Self, DomainError> {
        if milliseconds <= 0 {
            return Err(DomainError::new(
                "Duration must be a positive number of milliseconds.",
            ));
        }
        Ok(Self { milliseconds })
    }

    /// The duration in milliseconds.
    #[must_use]
    pub const fn milliseconds(self) -> i64 {
        self.milliseconds
    }
}

impl TryFrom<i64> for Duration {
    type Error = DomainError;

    fn try_from(milliseconds: i64) -> Result<Self, Self::Error> {
        Self::create(milliseconds)
    }
}

impl From<Duration> for i64 {
    fn from(duration: Duration) -> Self {
        duration.milliseconds
    }
}

// ============================================================================
// StartlistSettings
// ============================================================================

/// Input for [`StartlistSettings::create`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartlistSettingsParams {
    /// Event this startlist belongs to.
    pub event_id: String,
    /// First start of the race.
    pub start_time: DateTime<Utc>,
    /// Gap between consecutive classes in a lane.
    pub lane_class_interval: Duration,
    /// Gap between consecutive players in a class.
    pub class_player_interval: Duration,
    /// Number of parallel start lanes.
    pub lane_count: u32,
}

/// Timing settings for a startlist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StartlistSettingsParams")]
pub struct StartlistSettings {
    event_id: String,
    start_time: DateTime<Utc>,
    lane_class_interval: Duration,
    class_player_interval: Duration,
    lane_count: u32,
}

impl StartlistSettings {
    /// Validate and build settings.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] if the event id is empty or the lane count is 0.
    pub fn create(params: StartlistSettingsParams) -> Result<Self, DomainError> {
        if params.event_id.trim().is_empty() {
            return Err(DomainError::new("Event id must not be empty."));
        }
        if params.lane_count < 1 {
            return Err(DomainError::new("Lane count must be at least 1."));
        }
        Ok(Self {
            event_id: params.event_id,
            start_time: params.start_time,
            lane_class_interval: params.lane_class_interval,
            class_player_interval: params.class_player_interval,
            lane_count: params.lane_count,
        })
    }

    /// Event this startlist belongs to.
    #[must_use]
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// First start of the race.
    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Gap between consecutive classes in a lane.
    #[must_use]
    pub const fn lane_class_interval(&self) -> Duration {
        self.lane_class_interval
    }

    /// Gap between consecutive players in a class.
    #[must_use]
    pub const fn class_player_interval(&self) -> Duration {
        self.class_player_interval
    }

    /// Number of parallel start lanes.
    #[must_use]
    pub const fn lane_count(&self) -> u32 {
        self.lane_count
    }
}

impl TryFrom<StartlistSettingsParams> for StartlistSettings {
    type Error = DomainError;

    fn try_from(params: StartlistSettingsParams) -> Result<Self, Self::Error> {
        Self::create(params)
    }
}

// ============================================================================
// LaneAssignment
// ============================================================================

/// Input for [`LaneAssignment::create`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneAssignmentParams {
    /// Lane being assigned, 1-based.
    pub lane_number: u32,
    /// Classes starting in this lane, in start order.
    pub class_order: Vec<String>,
    /// Gap between consecutive classes in this lane.
    pub interval: Duration,
    /// Configured lane count the lane number is checked against.
    pub lane_count: u32,
}

/// Stored shape of a lane assignment; the lane count is not persisted with it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneAssignmentRecord {
    /// Lane number, 1-based.
    pub lane_number: u32,
    /// Classes in start order.
    pub class_order: Vec<String>,
    /// Gap between consecutive classes.
    pub interval: Duration,
}

/// Classes placed in one start lane, in start order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "LaneAssignmentRecord")]
pub struct LaneAssignment {
    lane_number: u32,
    class_order: Vec<String>,
    interval: Duration,
}

impl LaneAssignment {
    /// Validate and build a lane assignment.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] if the lane number is outside `1..=lane_count`,
    /// the class order is empty, or a class appears twice in the lane.
    pub fn create(params: LaneAssignmentParams) -> Result<Self, DomainError> {
        if params.lane_number > params.lane_count {
            return Err(DomainError::new(
                "Lane assignment exceeds configured lane count.",
            ));
        }
        Self::build(params.lane_number, params.class_order, params.interval)
    }

    fn build(
        lane_number: u32,
        class_order: Vec<String>,
        interval: Duration,
    ) -> Result<Self, DomainError> {
        if lane_number < 1 {
            return Err(DomainError::new("Lane number must be a positive integer."));
        }
        if class_order.is_empty() {
            return Err(DomainError::new(
                "Lane class order must contain at least one class.",
            ));
        }
        if class_order.iter().any(|class_id| class_id.trim().is_empty()) {
            return Err(DomainError::new("Class identifiers must not be empty."));
        }
        ensure_unique(&class_order, |class_id| {
            format!("Class {class_id} appears more than once in lane {lane_number}.")
        })?;
        Ok(Self {
            lane_number,
            class_order,
            interval,
        })
    }

    /// Lane number, 1-based.
    #[must_use]
    pub const fn lane_number(&self) -> u32 {
        self.lane_number
    }

    /// Classes in start order.
    #[must_use]
    pub fn class_order(&self) -> &[String] {
        &self.class_order
    }

    /// Gap between consecutive classes.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether `class_id` starts in this lane.
    #[must_use]
    pub fn contains_class(&self, class_id: &str) -> bool {
        self.class_order.iter().any(|id| id == class_id)
    }
}

impl TryFrom<LaneAssignmentRecord> for LaneAssignment {
    type Error = DomainError;

    fn try_from(record: LaneAssignmentRecord) -> Result<Self, Self::Error> {
        Self::build(record.lane_number, record.class_order, record.interval)
    }
}

// ============================================================================
// ClassAssignment
// ============================================================================

/// Input for [`ClassAssignment::create`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAssignmentParams {
    /// Class being ordered.
    pub class_id: String,
    /// Players of the class, in start order.
    pub player_order: Vec<String>,
    /// Gap between consecutive players.
    pub interval: Duration,
}

/// Players of one class, in start order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ClassAssignmentParams")]
pub struct ClassAssignment {
    class_id: String,
    player_order: Vec<String>,
    interval: Duration,
}

impl ClassAssignment {
    /// Validate and build a class assignment.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] if the class id is empty, the player order is
    /// empty, or a player appears twice in the class.
    pub fn create(params: ClassAssignmentParams) -> Result<Self, DomainError> {
        let ClassAssignmentParams {
            class_id,
            player_order,
            interval,
        } = params;

        if class_id.trim().is_empty() {
            return Err(DomainError::new("Class id must not be empty."));
        }
        if player_order.is_empty() {
            return Err(DomainError::new(
                "Class player order must contain at least one player.",
            ));
        }
        if player_order.iter().any(|player_id| player_id.trim().is_empty()) {
            return Err(DomainError::new("Player identifiers must not be empty."));
        }
        ensure_unique(&player_order, |player_id| {
            format!("Player {player_id} appears more than once in class {class_id}.")
        })?;
        Ok(Self {
            class_id,
            player_order,
            interval,
        })
    }

    /// Class identifier.
    #[must_use]
    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    /// Players in start order.
    #[must_use]
    pub fn player_order(&self) -> &[String] {
        &self.player_order
    }

    /// Gap between consecutive players.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether `player_id` is part of this class.
    #[must_use]
    pub fn contains_player(&self, player_id: &str) -> bool {
        self.player_order.iter().any(|id| id == player_id)
    }
}

impl TryFrom<ClassAssignmentParams> for ClassAssignment {
    type Error = DomainError;

    fn try_from(params: ClassAssignmentParams) -> Result<Self, Self::Error> {
        Self::create(params)
    }
}

// ============================================================================
// StartTime
// ============================================================================

/// Input for [`StartTime::create`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTimeParams {
    /// Player receiving the start time.
    pub player_id: String,
    /// Instant the player starts.
    pub start_time: DateTime<Utc>,
    /// Lane the player starts in, 1-based.
    pub lane_number: u32,
}

/// A single player's start time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StartTimeParams")]
pub struct StartTime {
    player_id: String,
    start_time: DateTime<Utc>,
    lane_number: u32,
}

impl StartTime {
    /// Validate and build a start time.
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] if the player id is empty or the lane number is 0.
    pub fn create(params: StartTimeParams) -> Result<Self, DomainError> {
        if params.player_id.trim().is_empty() {
            return Err(DomainError::new("Player id must not be empty."));
        }
        if params.lane_number < 1 {
            return Err(DomainError::new(
                "Start time lane number must be a positive integer.",
            ));
        }
        Ok(Self {
            player_id: params.player_id,
            start_time: params.start_time,
            lane_number: params.lane_number,
        })
    }

    /// Player identifier.
    #[must_use]
    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Instant the player starts.
    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Lane the player starts in.
    #[must_use]
    pub const fn lane_number(&self) -> u32 {
        self.lane_number
    }
}

impl TryFrom<StartTimeParams> for StartTime {
    type Error = DomainError;

    fn try_from(params: StartTimeParams) -> Result<Self, Self::Error> {
        Self::create(params)
    }
}
