//! The combined lane needs both resources and gets no reservation: single
//! lanes keep being granted greedily while it waits.

use crate::prelude::Harness;
use similar_asserts::assert_eq;

#[tokio::test]
async fn combined_lane_waits_while_single_lanes_alternate() {
    let mut h = Harness::start().await;
    h.request("robot2", "vertical_A").await;
    h.request("robot1", "horizontal").await;

    // robot1 outranks robot3 yet vertical_B is still handed out
    h.request("robot3", "vertical_B").await;
    assert_eq!(h.holders(), vec!["robot2@vertical_A", "robot3@vertical_B"]);

    h.report("robot2", "cruce_liberado").await;
    h.request("robot4", "vertical_A").await;
    assert_eq!(h.holders(), vec!["robot3@vertical_B", "robot4@vertical_A"]);
    assert_eq!(
        h.retained("cruce/estado/cola"),
        "vertical_A|;vertical_B|;horizontal|robot1"
    );

    h.report("robot3", "cruce_liberado").await;
    h.report("robot4", "cruce_liberado").await;
    assert_eq!(h.holders(), vec!["robot1@horizontal"]);
}

#[tokio::test]
async fn combined_lane_is_all_or_nothing() {
    let mut h = Harness::start().await;
    h.request("robot3", "vertical_B").await;

    h.request("robot1", "horizontal").await;

    assert_eq!(h.holders(), vec!["robot3@vertical_B"]);
    assert!(h.runtime.controller().state().check_invariants().is_ok());
    assert!(!h.runtime.controller().state().is_occupied("I1"));
}
