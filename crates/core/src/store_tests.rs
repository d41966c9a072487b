// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::{Clock, FakeClock};

fn agent(id: &str) -> AgentId {
    AgentId::new(id)
}

fn lane(id: &str) -> LaneId {
    LaneId::new(id)
}

fn standard() -> ArbitrationState {
    ArbitrationState::new(LaneTable::standard())
}

#[test]
fn new_state_is_empty() {
    let state = standard();

    assert!(state.resources().all(|r| !r.is_occupied()));
    assert_eq!(state.holders().count(), 0);
    assert_eq!(state.queued_len(), 0);
    assert_eq!(state.queues().len(), 3);
    assert!(state.check_invariants().is_ok());
}

#[test]
fn enqueue_appends_in_arrival_order() {
    let mut state = standard();

    assert_eq!(state.enqueue(&lane("vertical_A"), &agent("robot2")), EnqueueOutcome::Queued);
    assert_eq!(state.enqueue(&lane("vertical_A"), &agent("robot1")), EnqueueOutcome::Queued);

    assert_eq!(state.queue("vertical_A"), &[agent("robot2"), agent("robot1")]);
}

#[test]
fn enqueue_twice_is_noop() {
    let mut state = standard();
    state.enqueue(&lane("horizontal"), &agent("robot3"));

    assert_eq!(
        state.enqueue(&lane("horizontal"), &agent("robot3")),
        EnqueueOutcome::AlreadyQueued
    );
    assert_eq!(state.queue("horizontal").len(), 1);
}

#[test]
fn enqueue_holder_is_noop() {
    let clock = FakeClock::new();
    let mut state = standard();
    state.grant(&lane("vertical_A"), &agent("robot1"), clock.now()).unwrap();

    assert_eq!(
        state.enqueue(&lane("vertical_A"), &agent("robot1")),
        EnqueueOutcome::Holding
    );
    assert_eq!(state.queued_len(), 0);
}

#[test]
fn enqueue_into_other_lane_moves_agent() {
    let mut state = standard();
    state.enqueue(&lane("vertical_A"), &agent("robot1"));

    let outcome = state.enqueue(&lane("horizontal"), &agent("robot1"));

    assert_eq!(outcome, EnqueueOutcome::Moved { from: lane("vertical_A") });
    assert!(state.queue("vertical_A").is_empty());
    assert_eq!(state.queue("horizontal"), &[agent("robot1")]);
}

#[test]
fn enqueue_unknown_lane_is_rejected() {
    let mut state = standard();
    assert_eq!(
        state.enqueue(&lane("diagonal"), &agent("robot1")),
        EnqueueOutcome::UnknownLane
    );
}

#[test]
fn grant_combined_lane_occupies_every_resource() {
    let clock = FakeClock::new();
    let mut state = standard();
    state.enqueue(&lane("horizontal"), &agent("robot3"));

    state.grant(&lane("horizontal"), &agent("robot3"), clock.now()).unwrap();

    assert!(state.is_occupied("I1"));
    assert!(state.is_occupied("I2"));
    assert_eq!(state.queued_len(), 0);
    let record = state.holder(&agent("robot3")).unwrap();
    assert_eq!(record.lane, lane("horizontal"));
    assert_eq!(record.acquired_at, clock.now());
    assert!(state.check_invariants().is_ok());
}

#[test]
fn grant_fails_atomically_when_any_resource_busy() {
    let clock = FakeClock::new();
    let mut state = standard();
    state.grant(&lane("vertical_B"), &agent("robot2"), clock.now()).unwrap();

    let result = state.grant(&lane("horizontal"), &agent("robot3"), clock.now());

    assert_eq!(
        result,
        Err(StoreError::ResourceBusy {
            resource: ResourceId::new("I2"),
            holder: agent("robot2"),
        })
    );
    assert!(!state.is_occupied("I1"), "partial hold must not happen");
    assert!(state.holder(&agent("robot3")).is_none());
}

#[test]
fn grant_to_current_holder_fails() {
    let clock = FakeClock::new();
    let mut state = standard();
    state.grant(&lane("vertical_A"), &agent("robot1"), clock.now()).unwrap();

    assert_eq!(
        state.grant(&lane("vertical_B"), &agent("robot1"), clock.now()),
        Err(StoreError::AlreadyHolding(agent("robot1")))
    );
}

#[test]
fn release_clears_occupancy_and_record() {
    let clock = FakeClock::new();
    let mut state = standard();
    state.grant(&lane("horizontal"), &agent("robot3"), clock.now()).unwrap();

    let record = state.release(&agent("robot3")).unwrap();

    assert_eq!(record.resources.len(), 2);
    assert!(state.resources().all(|r| !r.is_occupied()));
    assert!(state.is_lane_free("horizontal"));
    assert!(state.check_invariants().is_ok());
}

#[test]
fn release_non_holder_is_noop() {
    let mut state = standard();
    assert!(state.release(&agent("ghost")).is_none());
}

#[test]
fn remove_from_queues_purges_agent() {
    let mut state = standard();
    state.enqueue(&lane("vertical_B"), &agent("robot4"));

    assert!(state.remove_from_queues(&agent("robot4")));
    assert!(!state.remove_from_queues(&agent("robot4")));
    assert_eq!(state.queued_len(), 0);
}

#[test]
fn queued_lane_reports_waiting_lane() {
    let mut state = standard();
    state.enqueue(&lane("vertical_B"), &agent("robot4"));

    assert_eq!(state.queued_lane(&agent("robot4")), Some(&lane("vertical_B")));
    assert_eq!(state.queued_lane(&agent("robot1")), None);
}
