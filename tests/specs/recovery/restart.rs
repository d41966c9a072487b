//! A restarted controller rebuilds its state from the retained snapshots.

use crate::prelude::Harness;
use similar_asserts::assert_eq;
use xc_adapters::{BusAdapter, ConnectOptions, MemoryBroker, MemoryBus};
use xc_core::AgentId;

#[tokio::test]
async fn restarted_controller_resumes_holders_and_queues() {
    let mut h = Harness::start().await;
    h.request("robot2", "vertical_A").await;
    h.request("robot1", "horizontal").await;

    let broker = h.crash();
    assert_eq!(
        broker.retained("cruce/reportes"),
        Some(b"controlador:offline".to_vec())
    );

    let mut h = Harness::start_on(broker).await;
    assert_eq!(h.holders(), vec!["robot2@vertical_A"]);
    assert_eq!(
        h.runtime.controller().state().queue("horizontal").to_vec(),
        vec![AgentId::new("robot1")]
    );
    assert_eq!(h.retained("cruce/reportes"), "controlador:online");

    h.report("robot2", "cruce_liberado").await;
    assert_eq!(h.holders(), vec!["robot1@horizontal"]);
}

#[tokio::test]
async fn restart_asks_agents_to_reannounce() {
    let broker = MemoryBroker::new();
    let agent = MemoryBus::new(broker.clone());
    let mut inbox = agent.connect(ConnectOptions::new("robot1")).await.unwrap();
    agent.subscribe("robots/solicitar_estado").await.unwrap();

    let _h = Harness::start_on(broker).await;

    let message = inbox.try_recv().unwrap();
    assert_eq!(message.payload_str(), Some("reanunciar"));
}

#[tokio::test]
async fn bare_holder_snapshot_is_stale() {
    let broker = MemoryBroker::new();
    Harness::retain(&broker, "cruce/estado/active_robot", "robot1,robot2").await;
    Harness::retain(&broker, "cruce/estado/cola", "vertical_A|;vertical_B|robot3;horizontal|").await;

    let h = Harness::start_on(broker).await;

    // The stale holders are gone, so the restored waiter is granted at once
    assert_eq!(h.holders(), vec!["robot3@vertical_B"]);
    assert_eq!(h.retained("cruce/estado/active_robot"), "robot3@vertical_B");
    assert_eq!(
        h.retained("cruce/estado/cola"),
        "vertical_A|;vertical_B|;horizontal|"
    );
}

#[tokio::test]
async fn conflicting_snapshot_keeps_mutual_exclusion() {
    let broker = MemoryBroker::new();
    Harness::retain(
        &broker,
        "cruce/estado/active_robot",
        "robot1@horizontal,robot2@vertical_A",
    )
    .await;
    Harness::retain(&broker, "cruce/estado/cola", "vertical_A|;vertical_B|;horizontal|").await;

    let h = Harness::start_on(broker).await;

    assert_eq!(h.holders(), vec!["robot1@horizontal"]);
    assert!(h.runtime.controller().state().check_invariants().is_ok());
}
