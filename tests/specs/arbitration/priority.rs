//! Priority picks among waiting agents but never preempts a holder.

use crate::prelude::Harness;
use similar_asserts::assert_eq;

#[tokio::test]
async fn lower_ranked_holder_keeps_lane_until_release() {
    let mut h = Harness::start().await;

    h.request("robot2", "vertical_A").await;
    assert_eq!(
        h.published(),
        vec![
            "cruce/respuesta robot2:pasar",
            "cruce/estado/active_robot robot2@vertical_A",
            "cruce/estado/cola vertical_A|;vertical_B|;horizontal|",
        ]
    );

    h.request("robot1", "vertical_A").await;
    assert_eq!(
        h.published(),
        vec![
            "cruce/estado/active_robot robot2@vertical_A",
            "cruce/estado/cola vertical_A|robot1;vertical_B|;horizontal|",
        ]
    );

    h.report("robot2", "cruce_liberado").await;
    assert_eq!(
        h.published(),
        vec![
            "cruce/estado/active_robot ",
            "cruce/estado/cola vertical_A|robot1;vertical_B|;horizontal|",
            "cruce/respuesta robot1:pasar",
            "cruce/estado/active_robot robot1@vertical_A",
            "cruce/estado/cola vertical_A|;vertical_B|;horizontal|",
        ]
    );
}

#[tokio::test]
async fn waiters_are_served_by_rank_then_arrival() {
    // Queues keep arrival order; rank decides who goes next
    let mut h = Harness::start().await;
    h.request("robot4", "horizontal").await;
    h.request("robot9", "vertical_B").await;
    h.request("robot3", "vertical_B").await;
    h.request("robot2", "vertical_B").await;
    h.published();
    assert_eq!(
        h.retained("cruce/estado/cola"),
        "vertical_A|;vertical_B|robot9,robot3,robot2;horizontal|"
    );

    h.report("robot4", "cruce_liberado").await;

    assert_eq!(h.holders(), vec!["robot2@vertical_B"]);
    assert_eq!(
        h.retained("cruce/estado/cola"),
        "vertical_A|;vertical_B|robot9,robot3;horizontal|"
    );
}

#[tokio::test]
async fn repeated_request_is_idempotent() {
    let mut h = Harness::start().await;
    h.request("robot1", "horizontal").await;
    h.request("robot2", "vertical_A").await;
    h.published();

    h.request("robot1", "horizontal").await;
    h.request("robot2", "vertical_A").await;

    assert_eq!(h.published(), Vec::<String>::new());
    assert_eq!(h.holders(), vec!["robot1@horizontal"]);
}

#[tokio::test]
async fn malformed_traffic_is_dropped() {
    let mut h = Harness::start().await;

    h.send("cruce/solicitud", "robot1").await;
    h.send("cruce/solicitud", "robot1:diagonal").await;
    h.send("cruce/reportes", "robot1:bailando").await;

    assert_eq!(h.published(), Vec::<String>::new());
    assert_eq!(h.holders(), Vec::<String>::new());
}
