//! Property-based testing utilities
//!
//! Strategies generate random [`Operation`] sequences over a small pool of
//! class and player identifiers, so that a useful share of operations pass
//! validation. [`invariant_violations`] checks the structural rules every
//! startlist must satisfy after any successful operation.

use crate::fixtures;
use proptest::prelude::*;
use proptest::sample::{select, subsequence};
use startlist_core::error::DomainResult;
use startlist_core::startlist::{Startlist, StartlistStatus};
use startlist_core::value_objects::{
    ClassAssignment, ClassAssignmentParams, LaneAssignment, LaneAssignmentParams, StartTime,
    StartTimeParams,
};
use std::collections::HashSet;

/// Class identifiers used by the strategies.
pub const CLASS_POOL: [&str; 4] = ["M21", "W21", "M35", "W35"];

/// Player identifiers used by the strategies.
pub const PLAYER_POOL: [&str; 6] = ["p1", "p2", "p3", "p4", "p5", "p6"];

/// Raw lane assignment input.
#[derive(Clone, Debug)]
pub struct LaneSpec {
    /// Lane number, may exceed the configured lane count.
    pub lane_number: u32,
    /// Classes in start order.
    pub classes: Vec<String>,
}

/// Raw class assignment input.
#[derive(Clone, Debug)]
pub struct ClassSpec {
    /// Class identifier.
    pub class_id: String,
    /// Players in start order.
    pub players: Vec<String>,
}

/// Raw start time input.
#[derive(Clone, Debug)]
pub struct StartSpec {
    /// Player identifier.
    pub player_id: String,
    /// Lane number, may exceed the configured lane count.
    pub lane_number: u32,
    /// Seconds after the race start.
    pub offset_seconds: i64,
}

/// One aggregate operation with raw, possibly invalid, input.
#[derive(Clone, Debug)]
pub enum Operation {
    /// `enter_settings`
    EnterSettings {
        /// Configured lane count.
        lane_count: u32,
    },
    /// `assign_lane_order_and_intervals`
    AssignLanes(Vec<LaneSpec>),
    /// `manually_reassign_lane_order`
    ReassignLanes(Vec<LaneSpec>, Option<String>),
    /// `assign_player_order_and_intervals`
    AssignClasses(Vec<ClassSpec>),
    /// `manually_finalize_class_start_order`
    FinalizeClasses(Vec<ClassSpec>, Option<String>),
    /// `assign_start_times`
    AssignStartTimes(Vec<StartSpec>),
    /// `finalize_startlist`
    Finalize,
    /// `invalidate_start_times`
    Invalidate(String),
}

impl Operation {
    /// Apply the operation. Invalid raw input fails like an aggregate rejection.
    ///
    /// # Errors
    ///
    /// Returns the value-object or aggregate [`DomainError`](startlist_core::error::DomainError).
    pub fn apply(&self, startlist: &mut Startlist) -> DomainResult<()> {
        match self {
            Self::EnterSettings { lane_count } => {
                startlist.enter_settings(fixtures::settings(*lane_count))
            }
            Self::AssignLanes(lanes) => {
                startlist.assign_lane_order_and_intervals(build_lanes(lanes)?)
            }
            Self::ReassignLanes(lanes, reason) => {
                startlist.manually_reassign_lane_order(build_lanes(lanes)?, reason.as_deref())
            }
            Self::AssignClasses(classes) => {
                startlist.assign_player_order_and_intervals(build_classes(classes)?)
            }
            Self::FinalizeClasses(classes, reason) => startlist
                .manually_finalize_class_start_order(build_classes(classes)?, reason.as_deref()),
            Self::AssignStartTimes(starts) => startlist.assign_start_times(build_starts(starts)?),
            Self::Finalize => startlist.finalize_startlist(),
            Self::Invalidate(reason) => startlist.invalidate_start_times(reason.clone()),
        }
    }
}

fn build_lanes(lanes: &[LaneSpec]) -> DomainResult<Vec<LaneAssignment>> {
    lanes
        .iter()
        .map(|lane| {
            LaneAssignment::create(LaneAssignmentParams {
                lane_number: lane.lane_number,
                class_order: lane.classes.clone(),
                interval: fixtures::duration(60_000),
                lane_count: lane.lane_number,
            })
        })
        .collect()
}

fn build_classes(classes: &[ClassSpec]) -> DomainResult<Vec<ClassAssignment>> {
    classes
        .iter()
        .map(|class| {
            ClassAssignment::create(ClassAssignmentParams {
                class_id: class.class_id.clone(),
                player_order: class.players.clone(),
                interval: fixtures::duration(30_000),
            })
        })
        .collect()
}

fn build_starts(starts: &[StartSpec]) -> DomainResult<Vec<StartTime>> {
    starts
        .iter()
        .map(|start| {
            StartTime::create(StartTimeParams {
                player_id: start.player_id.clone(),
                start_time: fixtures::instant(fixtures::RACE_START)
                    + chrono::Duration::seconds(start.offset_seconds),
                lane_number: start.lane_number,
            })
        })
        .collect()
}

fn owned(ids: Vec<&str>) -> Vec<String> {
    ids.into_iter().map(ToString::to_string).collect()
}

fn reason() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[A-Za-z ]{1,24}")
}

/// Strategy for a lane assignment input.
pub fn lane_spec() -> impl Strategy<Value = LaneSpec> {
    (1u32..=4, subsequence(CLASS_POOL.to_vec(), 1..=3)).prop_map(|(lane_number, classes)| {
        LaneSpec {
            lane_number,
            classes: owned(classes),
        }
    })
}

/// Strategy for a class assignment input.
pub fn class_spec() -> impl Strategy<Value = ClassSpec> {
    (select(CLASS_POOL.to_vec()), subsequence(PLAYER_POOL.to_vec(), 1..=3)).prop_map(
        |(class_id, players)| ClassSpec {
            class_id: class_id.to_string(),
            players: owned(players),
        },
    )
}

/// Strategy for a start time input.
pub fn start_spec() -> impl Strategy<Value = StartSpec> {
    (select(PLAYER_POOL.to_vec()), 1u32..=4, 0i64..3_600).prop_map(
        |(player_id, lane_number, offset_seconds)| StartSpec {
            player_id: player_id.to_string(),
            lane_number,
            offset_seconds,
        },
    )
}

/// Strategy for a single operation.
pub fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        1 => (1u32..=3).prop_map(|lane_count| Operation::EnterSettings { lane_count }),
        3 => prop::collection::vec(lane_spec(), 0..=3).prop_map(Operation::AssignLanes),
        1 => (prop::collection::vec(lane_spec(), 0..=3), reason())
            .prop_map(|(lanes, reason)| Operation::ReassignLanes(lanes, reason)),
        3 => prop::collection::vec(class_spec(), 0..=3).prop_map(Operation::AssignClasses),
        1 => (prop::collection::vec(class_spec(), 0..=3), reason())
            .prop_map(|(classes, reason)| Operation::FinalizeClasses(classes, reason)),
        3 => prop::collection::vec(start_spec(), 0..=4).prop_map(Operation::AssignStartTimes),
        2 => Just(Operation::Finalize),
        1 => "[A-Za-z ]{1,24}".prop_map(Operation::Invalidate),
    ]
}

/// Strategy for an operation sequence.
pub fn operations(max_len: usize) -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(operation(), 1..=max_len)
}

/// Structural rules broken by `startlist`; empty when consistent.
#[must_use]
pub fn invariant_violations(startlist: &Startlist) -> Vec<String> {
    let mut violations = Vec::new();
    let status = startlist.status();
    let lane_count = startlist.settings().map(|s| s.lane_count());

    let mut lanes = HashSet::new();
    for lane in startlist.lane_assignments() {
        if lane_count.is_none_or(|count| lane.lane_number() > count) {
            violations.push(format!("lane {} exceeds lane count", lane.lane_number()));
        }
        if !lanes.insert(lane.lane_number()) {
            violations.push(format!("lane {} repeats", lane.lane_number()));
        }
    }

    let mut classes = HashSet::new();
    for class in startlist.class_assignments() {
        if !classes.insert(class.class_id()) {
            violations.push(format!("class {} repeats", class.class_id()));
        }
        if !startlist
            .lane_assignments()
            .iter()
            .any(|lane| lane.contains_class(class.class_id()))
        {
            violations.push(format!("class {} is not in any lane", class.class_id()));
        }
    }

    let mut players = HashSet::new();
    for start in startlist.start_times() {
        if !players.insert(start.player_id()) {
            violations.push(format!("player {} starts twice", start.player_id()));
        }
        if !startlist
            .class_assignments()
            .iter()
            .any(|class| class.contains_player(start.player_id()))
        {
            violations.push(format!("player {} has no class", start.player_id()));
        }
        if lane_count.is_none_or(|count| start.lane_number() > count) {
            violations.push(format!("player {} lane exceeds lane count", start.player_id()));
        }
    }

    let stage = status.stage();
    if (stage >= StartlistStatus::SettingsEntered.stage()) != startlist.settings().is_some() {
        violations.push(format!("status {status} disagrees with settings"));
    }
    if stage >= StartlistStatus::LaneOrderAssigned.stage()
        && startlist.lane_assignments().is_empty()
    {
        violations.push(format!("status {status} without lane assignments"));
    }
    if stage >= StartlistStatus::PlayerOrderAssigned.stage()
        && startlist.class_assignments().is_empty()
    {
        violations.push(format!("status {status} without class assignments"));
    }
    let timed = matches!(
        status,
        StartlistStatus::StartTimesAssigned | StartlistStatus::Finalized
    );
    if timed == startlist.start_times().is_empty() {
        violations.push(format!("status {status} disagrees with start times"));
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_satisfy_invariants() {
        assert!(invariant_violations(&fixtures::draft("a")).is_empty());
        assert!(invariant_violations(&fixtures::ordered("a")).is_empty());
        assert!(invariant_violations(&fixtures::finalized("a")).is_empty());
    }

    proptest! {
        #[test]
        fn generated_lane_specs_are_well_formed(lane in lane_spec()) {
            prop_assert!(lane.lane_number >= 1);
            prop_assert!(!lane.classes.is_empty());
        }
    }
}
