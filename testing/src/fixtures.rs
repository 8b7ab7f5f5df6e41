//! Fixture builders for value objects and prepared startlists
//!
//! Builders panic on invalid input: fixtures are expected to be valid, and a
//! panic points at the fixture instead of the code under test.

#![allow(clippy::expect_used)] // Fixture inputs are fixed and known-valid
#![allow(clippy::missing_panics_doc)]

use crate::mocks::test_clock;
use chrono::{DateTime, Utc};
use startlist_core::id::StartlistId;
use startlist_core::startlist::Startlist;
use startlist_core::value_objects::{
    ClassAssignment, ClassAssignmentParams, Duration, LaneAssignment, LaneAssignmentParams,
    StartTime, StartTimeParams, StartlistSettings, StartlistSettingsParams, parse_instant,
};
use startlist_runtime::orchestrator::CreationContext;
use std::sync::Arc;

/// Event id used by every fixture.
pub const EVENT_ID: &str = "spring-cup-2025";

/// First start of the fixture race.
pub const RACE_START: &str = "2025-04-01T09:00:00Z";

/// Parse an RFC 3339 instant.
#[must_use]
pub fn instant(text: &str) -> DateTime<Utc> {
    parse_instant(text).expect("fixture instant should parse")
}

/// A positive duration in milliseconds.
#[must_use]
pub fn duration(milliseconds: i64) -> Duration {
    Duration::create(milliseconds).expect("fixture duration should be positive")
}

/// Settings for [`EVENT_ID`] with `lane_count` lanes.
#[must_use]
pub fn settings(lane_count: u32) -> StartlistSettings {
    StartlistSettings::create(StartlistSettingsParams {
        event_id: EVENT_ID.to_string(),
        start_time: instant(RACE_START),
        lane_class_interval: duration(60_000),
        class_player_interval: duration(30_000),
        lane_count,
    })
    .expect("fixture settings should be valid")
}

/// Lane `lane_number` holding `classes` in order.
#[must_use]
pub fn lane(lane_number: u32, classes: &[&str]) -> LaneAssignment {
    LaneAssignment::create(LaneAssignmentParams {
        lane_number,
        class_order: classes.iter().map(ToString::to_string).collect(),
        interval: duration(60_000),
        lane_count: lane_number,
    })
    .expect("fixture lane should be valid")
}

/// Class `class_id` with `players` in start order.
#[must_use]
pub fn class(class_id: &str, players: &[&str]) -> ClassAssignment {
    ClassAssignment::create(ClassAssignmentParams {
        class_id: class_id.to_string(),
        player_order: players.iter().map(ToString::to_string).collect(),
        interval: duration(30_000),
    })
    .expect("fixture class should be valid")
}

/// `player_id` starting in `lane_number`, `offset_seconds` after the race start.
#[must_use]
pub fn start_time(player_id: &str, lane_number: u32, offset_seconds: i64) -> StartTime {
    StartTime::create(StartTimeParams {
        player_id: player_id.to_string(),
        start_time: instant(RACE_START) + chrono::Duration::seconds(offset_seconds),
        lane_number,
    })
    .expect("fixture start time should be valid")
}

/// Creation context for [`EVENT_ID`].
#[must_use]
pub fn creation_context() -> CreationContext {
    CreationContext::new(EVENT_ID).requested_by("race-office")
}

/// Empty draft startlist on the fixed test clock.
#[must_use]
pub fn draft(id: &str) -> Startlist {
    Startlist::create_new(StartlistId::new(id)).with_clock(Arc::new(test_clock()))
}

/// Two lanes (`M21` in lane 1, `W21` in lane 2) and classes with players
/// `p1`, `p2` and `p3`, without start times. No pending events.
#[must_use]
pub fn ordered(id: &str) -> Startlist {
    let mut startlist = draft(id);
    startlist
        .enter_settings(settings(2))
        .expect("fixture settings should be accepted");
    startlist
        .assign_lane_order_and_intervals(vec![lane(1, &["M21"]), lane(2, &["W21"])])
        .expect("fixture lanes should be accepted");
    startlist
        .assign_player_order_and_intervals(vec![class("M21", &["p1", "p2"]), class("W21", &["p3"])])
        .expect("fixture classes should be accepted");
    startlist.pull_domain_events();
    startlist
}

/// [`ordered`] plus start times for every player. No pending events.
#[must_use]
pub fn ready_to_finalize(id: &str) -> Startlist {
    let mut startlist = ordered(id);
    startlist
        .assign_start_times(vec![
            start_time("p1", 1, 0),
            start_time("p2", 1, 30),
            start_time("p3", 2, 0),
        ])
        .expect("fixture start times should be accepted");
    startlist.pull_domain_events();
    startlist
}

/// [`ready_to_finalize`], finalized. No pending events.
#[must_use]
pub fn finalized(id: &str) -> Startlist {
    let mut startlist = ready_to_finalize(id);
    startlist
        .finalize_startlist()
        .expect("fixture should finalize");
    startlist.pull_domain_events();
    startlist
}

#[cfg(test)]
mod tests {
    use super::*;
    use startlist_core::startlist::StartlistStatus;

    #[test]
    fn prepared_startlists_have_expected_status() {
        assert_eq!(draft("a").status(), StartlistStatus::Draft);
        assert_eq!(ordered("a").status(), StartlistStatus::PlayerOrderAssigned);
        assert_eq!(
            ready_to_finalize("a").status(),
            StartlistStatus::StartTimesAssigned
        );
        assert_eq!(finalized("a").status(), StartlistStatus::Finalized);
        assert!(!finalized("a").has_pending_events());
    }

    #[test]
    fn start_times_are_offset_from_race_start() {
        let start = start_time("p1", 1, 90);
        assert_eq!(start.start_time(), instant("2025-04-01T09:01:30Z"));
    }
}
