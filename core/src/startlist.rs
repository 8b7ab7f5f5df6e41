//! The startlist lifecycle aggregate.
//!
//! A startlist moves through
//! `Draft → SettingsEntered → LaneOrderAssigned → PlayerOrderAssigned →
//! StartTimesAssigned → Finalized`, but the pipeline is not one-way: lane and
//! class ordering may be re-run from any later status, including `Finalized`.
//! Re-running an upstream stage clears the start times that depended on it and
//! moves the status back to that stage ("reopening").
//!
//! Every public operation validates completely before touching any field, so a
//! failed call leaves the aggregate and its pending events exactly as they were.
//!
//! ```text
//!  settings ──► lanes ──► classes ──► start times ──► finalized
//!                 │          │              ▲
//!                 └──────────┴── clears ────┘
//! ```

use crate::environment::{Clock, SystemClock};
use crate::error::{DomainError, DomainResult};
use crate::event::StartlistEvent;
use crate::id::StartlistId;
use crate::value_objects::{ClassAssignment, LaneAssignment, StartTime, StartlistSettings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Invalidation reason recorded when lane order is assigned over existing start times.
pub const LANE_ORDER_INVALIDATION_REASON: &str = "Lane order assigned - start times invalidated";

/// Invalidation reason recorded when player order is assigned over existing start times.
pub const PLAYER_ORDER_INVALIDATION_REASON: &str =
    "Player order assigned - start times invalidated";

/// Default reason for a manual lane reassignment.
pub const MANUAL_LANE_ORDER_REASON: &str = "Lane order manually reassigned";

/// Default reason for a manual class start order.
pub const MANUAL_CLASS_ORDER_REASON: &str = "Class start order manually finalized";

/// How far the startlist pipeline has progressed.
///
/// Not monotonic: upstream changes move it backwards.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StartlistStatus {
    /// Nothing entered yet.
    Draft,
    /// Timing settings are present.
    SettingsEntered,
    /// Classes are placed in lanes.
    LaneOrderAssigned,
    /// Players are ordered within classes.
    PlayerOrderAssigned,
    /// Concrete start times are assigned.
    StartTimesAssigned,
    /// The start order is confirmed.
    Finalized,
}

impl StartlistStatus {
    /// Position of the status in the pipeline, `Draft` = 0.
    #[must_use]
    pub const fn stage(self) -> u8 {
        match self {
            Self::Draft => 0,
            Self::SettingsEntered => 1,
            Self::LaneOrderAssigned => 2,
            Self::PlayerOrderAssigned => 3,
            Self::StartTimesAssigned => 4,
            Self::Finalized => 5,
        }
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::SettingsEntered => "SETTINGS_ENTERED",
            Self::LaneOrderAssigned => "LANE_ORDER_ASSIGNED",
            Self::PlayerOrderAssigned => "PLAYER_ORDER_ASSIGNED",
            Self::StartTimesAssigned => "START_TIMES_ASSIGNED",
            Self::Finalized => "FINALIZED",
        }
    }

    /// Whether the startlist is finalized.
    #[must_use]
    pub const fn is_finalized(self) -> bool {
        matches!(self, Self::Finalized)
    }
}

impl fmt::Display for StartlistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat, serializable view of a startlist.
///
/// Read by transport and projection layers, stored by repositories, embedded
/// in `Finalized` and `VersionConfirmed` events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartlistSnapshot {
    /// Startlist identifier.
    pub id: StartlistId,
    /// Timing settings, once entered.
    pub settings: Option<StartlistSettings>,
    /// Lane assignments.
    pub lane_assignments: Vec<LaneAssignment>,
    /// Class assignments.
    pub class_assignments: Vec<ClassAssignment>,
    /// Start times.
    pub start_times: Vec<StartTime>,
    /// Pipeline status.
    pub status: StartlistStatus,
}

/// Which flavour of upstream change is being applied.
#[derive(Clone, Copy)]
enum Revision<'a> {
    Assigned,
    Manual(&'a str),
}

/// The startlist aggregate root.
///
/// Owns its collections outright: getters hand out shared borrows, snapshots and
/// events receive clones, and [`Startlist::reconstitute`] takes its input by
/// value. No caller can hold a mutable alias to the aggregate's internals.
#[derive(Clone)]
pub struct Startlist {
    id: StartlistId,
    settings: Option<StartlistSettings>,
    lane_assignments: Vec<LaneAssignment>,
    class_assignments: Vec<ClassAssignment>,
    start_times: Vec<StartTime>,
    status: StartlistStatus,
    pending_events: Vec<StartlistEvent>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Startlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Startlist")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("settings", &self.settings)
            .field("lane_assignments", &self.lane_assignments)
            .field("class_assignments", &self.class_assignments)
            .field("start_times", &self.start_times)
            .field("pending_events", &self.pending_events.len())
            .finish_non_exhaustive()
    }
}

impl Startlist {
    /// Create an empty draft startlist.
    #[must_use]
    pub fn create_new(id: StartlistId) -> Self {
        Self {
            id,
            settings: None,
            lane_assignments: Vec::new(),
            class_assignments: Vec::new(),
            start_times: Vec::new(),
            status: StartlistStatus::Draft,
            pending_events: Vec::new(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Rebuild a startlist from persisted state.
    ///
    /// The snapshot is taken by value; the aggregate shares nothing with the
    /// caller afterwards. No events are recorded.
    #[must_use]
    pub fn reconstitute(snapshot: StartlistSnapshot) -> Self {
        let StartlistSnapshot {
            id,
            settings,
            lane_assignments,
            class_assignments,
            start_times,
            status,
        } = snapshot;
        Self {
            id,
            settings,
            lane_assignments,
            class_assignments,
            start_times,
            status,
            pending_events: Vec::new(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used to timestamp events.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // ========== Accessors ==========

    /// Startlist identifier.
    #[must_use]
    pub const fn id(&self) -> &StartlistId {
        &self.id
    }

    /// Timing settings, once entered.
    #[must_use]
    pub const fn settings(&self) -> Option<&StartlistSettings> {
        self.settings.as_ref()
    }

    /// Current lane assignments.
    #[must_use]
    pub fn lane_assignments(&self) -> &[LaneAssignment] {
        &self.lane_assignments
    }

    /// Current class assignments.
    #[must_use]
    pub fn class_assignments(&self) -> &[ClassAssignment] {
        &self.class_assignments
    }

    /// Current start times.
    #[must_use]
    pub fn start_times(&self) -> &[StartTime] {
        &self.start_times
    }

    /// Pipeline status.
    #[must_use]
    pub const fn status(&self) -> StartlistStatus {
        self.status
    }

    /// Owned copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> StartlistSnapshot {
        StartlistSnapshot {
            id: self.id.clone(),
            settings: self.settings.clone(),
            lane_assignments: self.lane_assignments.clone(),
            class_assignments: self.class_assignments.clone(),
            start_times: self.start_times.clone(),
            status: self.status,
        }
    }

    /// Take every event recorded since the last pull, in emission order.
    pub fn pull_domain_events(&mut self) -> Vec<StartlistEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Whether events are waiting to be pulled.
    #[must_use]
    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    // ========== Operations ==========

    /// Enter timing settings on a draft startlist.
    ///
    /// # Errors
    ///
    /// Fails if the startlist is not in draft or settings were already entered.
    pub fn enter_settings(&mut self, settings: StartlistSettings) -> DomainResult<()> {
        if self.status != StartlistStatus::Draft || self.settings.is_some() {
            return Err(DomainError::new(
                "Startlist settings can only be entered once while in draft.",
            ));
        }

        let occurred_at = self.clock.now();
        self.settings = Some(settings.clone());
        self.status = StartlistStatus::SettingsEntered;
        tracing::debug!(startlist_id = %self.id, "Startlist settings entered");
        self.record(StartlistEvent::SettingsEntered {
            startlist_id: self.id.clone(),
            settings,
            occurred_at,
        });
        Ok(())
    }

    /// Assign classes to lanes, replacing any previous lane order.
    ///
    /// Existing start times are cleared first (recording
    /// [`LANE_ORDER_INVALIDATION_REASON`]). Class assignments for classes no
    /// longer placed in any lane are dropped.
    ///
    /// # Errors
    ///
    /// Fails if settings are missing, the list is empty, a lane exceeds the
    /// configured lane count, or a lane number repeats.
    pub fn assign_lane_order_and_intervals(
        &mut self,
        assignments: Vec<LaneAssignment>,
    ) -> DomainResult<()> {
        self.replace_lane_order(assignments, Revision::Assigned)
    }

    /// Manually reassign the lane order, reopening a finalized startlist if needed.
    ///
    /// Behaves like [`Self::assign_lane_order_and_intervals`] but records the
    /// caller's invalidation reason and a `LaneOrderManuallyReassigned` event.
    ///
    /// # Errors
    ///
    /// Same failures as [`Self::assign_lane_order_and_intervals`].
    pub fn manually_reassign_lane_order(
        &mut self,
        assignments: Vec<LaneAssignment>,
        reason: Option<&str>,
    ) -> DomainResult<()> {
        self.replace_lane_order(
            assignments,
            Revision::Manual(reason.unwrap_or(MANUAL_LANE_ORDER_REASON)),
        )
    }

    /// Order players within classes, replacing any previous class order.
    ///
    /// Existing start times are cleared first (recording
    /// [`PLAYER_ORDER_INVALIDATION_REASON`]).
    ///
    /// # Errors
    ///
    /// Fails if settings or lane order are missing, the list is empty, a class
    /// repeats, or a class is not placed in any lane.
    pub fn assign_player_order_and_intervals(
        &mut self,
        assignments: Vec<ClassAssignment>,
    ) -> DomainResult<()> {
        self.replace_class_order(assignments, Revision::Assigned)
    }

    /// Manually finalize the class start order, reopening a finalized startlist if needed.
    ///
    /// Behaves like [`Self::assign_player_order_and_intervals`] but records the
    /// caller's invalidation reason and a `ClassStartOrderManuallyFinalized` event.
    ///
    /// # Errors
    ///
    /// Same failures as [`Self::assign_player_order_and_intervals`].
    pub fn manually_finalize_class_start_order(
        &mut self,
        assignments: Vec<ClassAssignment>,
        reason: Option<&str>,
    ) -> DomainResult<()> {
        self.replace_class_order(
            assignments,
            Revision::Manual(reason.unwrap_or(MANUAL_CLASS_ORDER_REASON)),
        )
    }

    /// Assign concrete start times, replacing any previous ones.
    ///
    /// # Errors
    ///
    /// Fails if settings or class assignments are missing, the list is empty, a
    /// player appears twice, a player has no class assignment, or a lane
    /// exceeds the configured lane count.
    pub fn assign_start_times(&mut self, start_times: Vec<StartTime>) -> DomainResult<()> {
        let settings = self.settings.as_ref().ok_or_else(|| {
            DomainError::new("Startlist settings must be entered before assigning start times.")
        })?;
        if self.class_assignments.is_empty() {
            return Err(DomainError::new(
                "Player order must be assigned before assigning start times.",
            ));
        }
        if start_times.is_empty() {
            return Err(DomainError::new("At least one start time is required."));
        }

        let mut seen = HashSet::new();
        for start_time in &start_times {
            let player_id = start_time.player_id();
            if !seen.insert(player_id) {
                return Err(DomainError::new(format!(
                    "Player {player_id} is assigned more than one start time."
                )));
            }
            if !self
                .class_assignments
                .iter()
                .any(|class| class.contains_player(player_id))
            {
                return Err(DomainError::new(format!(
                    "Player {player_id} does not have a class assignment and cannot receive a start time."
                )));
            }
            if start_time.lane_number() > settings.lane_count() {
                return Err(DomainError::new(
                    "Start time lane exceeds configured lane count.",
                ));
            }
        }

        let occurred_at = self.clock.now();
        self.start_times = start_times;
        self.status = StartlistStatus::StartTimesAssigned;
        tracing::debug!(
            startlist_id = %self.id,
            count = self.start_times.len(),
            "Start times assigned"
        );
        self.record(StartlistEvent::StartTimesAssigned {
            startlist_id: self.id.clone(),
            start_times: self.start_times.clone(),
            occurred_at,
        });
        Ok(())
    }

    /// Confirm the start order.
    ///
    /// # Errors
    ///
    /// Fails unless the status is exactly `StartTimesAssigned`.
    pub fn finalize_startlist(&mut self) -> DomainResult<()> {
        match self.status {
            StartlistStatus::StartTimesAssigned => {}
            StartlistStatus::Finalized => {
                return Err(DomainError::new("Startlist is already finalized."));
            }
            _ => {
                return Err(DomainError::new(
                    "Start times must be assigned before finalizing the startlist.",
                ));
            }
        }

        let occurred_at = self.clock.now();
        self.status = StartlistStatus::Finalized;
        tracing::debug!(startlist_id = %self.id, "Startlist finalized");
        self.record(StartlistEvent::Finalized {
            startlist_id: self.id.clone(),
            snapshot: self.snapshot(),
            occurred_at,
        });
        Ok(())
    }

    /// Clear all start times, reopening a finalized startlist if needed.
    ///
    /// # Errors
    ///
    /// Fails if no start times are assigned.
    pub fn invalidate_start_times(&mut self, reason: impl Into<String>) -> DomainResult<()> {
        if self.start_times.is_empty() {
            return Err(DomainError::new("No start times are assigned to invalidate."));
        }

        let occurred_at = self.clock.now();
        self.clear_start_times(reason.into(), occurred_at);
        self.status = StartlistStatus::PlayerOrderAssigned;
        Ok(())
    }

    // ========== Internals ==========

    fn replace_lane_order(
        &mut self,
        assignments: Vec<LaneAssignment>,
        revision: Revision<'_>,
    ) -> DomainResult<()> {
        let settings = self.settings.as_ref().ok_or_else(|| {
            DomainError::new("Startlist settings must be entered before assigning lane order.")
        })?;
        Self::validate_lane_assignments(&assignments, settings.lane_count())?;

        let occurred_at = self.clock.now();
        let reason = match revision {
            Revision::Assigned => LANE_ORDER_INVALIDATION_REASON,
            Revision::Manual(reason) => reason,
        };
        if !self.start_times.is_empty() {
            self.clear_start_times(reason.to_string(), occurred_at);
        }
        self.lane_assignments = assignments;
        self.drop_unplaced_class_assignments();
        self.status = StartlistStatus::LaneOrderAssigned;
        tracing::debug!(
            startlist_id = %self.id,
            lanes = self.lane_assignments.len(),
            manual = matches!(revision, Revision::Manual(_)),
            "Lane order assigned"
        );

        let startlist_id = self.id.clone();
        let lane_assignments = self.lane_assignments.clone();
        self.record(match revision {
            Revision::Assigned => StartlistEvent::LaneOrderAssigned {
                startlist_id,
                lane_assignments,
                occurred_at,
            },
            Revision::Manual(_) => StartlistEvent::LaneOrderManuallyReassigned {
                startlist_id,
                lane_assignments,
                occurred_at,
            },
        });
        Ok(())
    }

    fn replace_class_order(
        &mut self,
        assignments: Vec<ClassAssignment>,
        revision: Revision<'_>,
    ) -> DomainResult<()> {
        if self.settings.is_none() {
            return Err(DomainError::new(
                "Startlist settings must be entered before assigning player order.",
            ));
        }
        if self.lane_assignments.is_empty() {
            return Err(DomainError::new(
                "Lane order must be assigned before assigning player order.",
            ));
        }
        self.validate_class_assignments(&assignments)?;

        let occurred_at = self.clock.now();
        let reason = match revision {
            Revision::Assigned => PLAYER_ORDER_INVALIDATION_REASON,
            Revision::Manual(reason) => reason,
        };
        if !self.start_times.is_empty() {
            self.clear_start_times(reason.to_string(), occurred_at);
        }
        self.class_assignments = assignments;
        self.status = StartlistStatus::PlayerOrderAssigned;
        tracing::debug!(
            startlist_id = %self.id,
            classes = self.class_assignments.len(),
            manual = matches!(revision, Revision::Manual(_)),
            "Player order assigned"
        );

        let startlist_id = self.id.clone();
        let class_assignments = self.class_assignments.clone();
        self.record(match revision {
            Revision::Assigned => StartlistEvent::PlayerOrderAssigned {
                startlist_id,
                class_assignments,
                occurred_at,
            },
            Revision::Manual(_) => StartlistEvent::ClassStartOrderManuallyFinalized {
                startlist_id,
                class_assignments,
                occurred_at,
            },
        });
        Ok(())
    }

    fn validate_lane_assignments(
        assignments: &[LaneAssignment],
        lane_count: u32,
    ) -> DomainResult<()> {
        if assignments.is_empty() {
            return Err(DomainError::new("At least one lane assignment is required."));
        }
        let mut seen = HashSet::new();
        for lane in assignments {
            if lane.lane_number() > lane_count {
                return Err(DomainError::new(
                    "Lane assignment exceeds configured lane count.",
                ));
            }
            if !seen.insert(lane.lane_number()) {
                return Err(DomainError::new(format!(
                    "Lane {} is assigned more than once.",
                    lane.lane_number()
                )));
            }
        }
        Ok(())
    }

    fn validate_class_assignments(&self, assignments: &[ClassAssignment]) -> DomainResult<()> {
        if assignments.is_empty() {
            return Err(DomainError::new("At least one class assignment is required."));
        }
        let mut seen = HashSet::new();
        for class in assignments {
            let class_id = class.class_id();
            if !seen.insert(class_id) {
                return Err(DomainError::new(format!(
                    "Class {class_id} is assigned more than once."
                )));
            }
            if !self.is_class_placed(class_id) {
                return Err(DomainError::new(format!(
                    "Class {class_id} is not assigned to any lane."
                )));
            }
        }
        Ok(())
    }

    fn is_class_placed(&self, class_id: &str) -> bool {
        self.lane_assignments
            .iter()
            .any(|lane| lane.contains_class(class_id))
    }

    fn drop_unplaced_class_assignments(&mut self) {
        let before = self.class_assignments.len();
        let lanes = &self.lane_assignments;
        self.class_assignments.retain(|class| {
            lanes
                .iter()
                .any(|lane| lane.contains_class(class.class_id()))
        });
        let dropped = before - self.class_assignments.len();
        if dropped > 0 {
            tracing::debug!(
                startlist_id = %self.id,
                dropped,
                "Dropped class assignments no longer placed in any lane"
            );
        }
    }

    fn clear_start_times(&mut self, reason: String, occurred_at: DateTime<Utc>) {
        let cleared = self.start_times.len();
        let reopened = self.status.is_finalized();
        self.start_times.clear();
        tracing::info!(
            startlist_id = %self.id,
            cleared,
            reopened,
            reason = %reason,
            "Start times invalidated"
        );
        self.record(StartlistEvent::StartTimesInvalidated {
            startlist_id: self.id.clone(),
            reason,
            occurred_at,
        });
    }

    fn record(&mut self, event: StartlistEvent) {
        self.pending_events.push(event);
    }
}
