//! Holders past the crossing deadline are expelled on the next tick.

use std::time::Duration;

use crate::prelude::{Harness, MAX_CROSSING};
use similar_asserts::assert_eq;

#[tokio::test]
async fn overdue_holder_is_expelled_and_best_waiter_granted() {
    let mut h = Harness::start().await;
    h.request("robot4", "vertical_A").await;
    h.request("robot3", "vertical_A").await;
    h.request("robot1", "vertical_A").await;
    h.published();

    h.clock.advance(MAX_CROSSING);
    h.tick().await;
    assert_eq!(h.published(), Vec::<String>::new());

    h.clock.advance(Duration::from_millis(100));
    h.tick().await;
    assert_eq!(
        h.published(),
        vec![
            "cruce/respuesta robot4:expulsado",
            "cruce/reportes robot4:timeout",
            "cruce/estado/active_robot ",
            "cruce/estado/cola vertical_A|robot3,robot1;vertical_B|;horizontal|",
            "cruce/respuesta robot1:pasar",
            "cruce/estado/active_robot robot1@vertical_A",
            "cruce/estado/cola vertical_A|robot3;vertical_B|;horizontal|",
        ]
    );
}

#[tokio::test]
async fn new_holder_gets_a_full_window() {
    let mut h = Harness::start().await;
    h.request("robot2", "horizontal").await;
    h.clock.advance(MAX_CROSSING / 2);
    h.request("robot1", "vertical_B").await;

    h.clock.advance(MAX_CROSSING / 2 + Duration::from_millis(100));
    h.tick().await;
    assert_eq!(h.holders(), vec!["robot1@vertical_B"]);

    h.clock.advance(MAX_CROSSING - Duration::from_millis(100));
    h.tick().await;
    assert_eq!(h.holders(), vec!["robot1@vertical_B"]);
}

#[tokio::test]
async fn expelled_agent_acknowledgement_is_harmless() {
    let mut h = Harness::start().await;
    h.request("robot4", "horizontal").await;
    h.clock.advance(MAX_CROSSING + Duration::from_secs(1));
    h.tick().await;
    h.published();

    h.report("robot4", "expulsado").await;

    assert_eq!(h.published(), Vec::<String>::new());
    assert_eq!(h.holders(), Vec::<String>::new());
}
