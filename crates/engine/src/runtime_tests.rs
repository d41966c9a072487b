// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime tests

use super::*;
use xc_adapters::{BusCall, FakeBus};
use xc_core::{FakeClock, LaneTable, PriorityTable, Rank};

const MAX_HOLD: Duration = Duration::from_secs(10);

fn priorities() -> PriorityTable {
    PriorityTable::new(Rank(99))
        .with_rank("robot1", 1)
        .with_rank("robot2", 2)
        .with_rank("robot3", 3)
}

async fn setup() -> (Runtime<FakeBus, FakeClock>, FakeBus, FakeClock) {
    let clock = FakeClock::new();
    let bus = FakeBus::new();
    bus.connect(ConnectOptions::new("controlador")).await.unwrap();
    bus.clear_calls();

    let controller = Controller::new(LaneTable::standard(), priorities(), MAX_HOLD, clock.clone());
    let runtime = Runtime::new(
        controller,
        bus.clone(),
        RuntimeConfig::from(&ControllerConfig::default()),
    );
    (runtime, bus, clock)
}

fn message(topic: &str, payload: &str) -> BusMessage {
    BusMessage {
        topic: topic.to_string(),
        payload: payload.as_bytes().to_vec(),
        retained: false,
    }
}

#[yare::parameterized(
    request = { "cruce/solicitud", "robot1:vertical_A", Some(Event::Request(RequestMessage::new("robot1", "vertical_A"))) },
    request_trimmed = { "cruce/solicitud", " robot1 : horizontal ", Some(Event::Request(RequestMessage::new("robot1", "horizontal"))) },
    report = { "cruce/reportes", "robot2:cruce_liberado", Some(Event::Report(ReportMessage::new("robot2", ReportEvent::Released))) },
    resync = { "robots/solicitar_estado", "reanunciar", Some(Event::ResyncObserved) },
    no_separator = { "cruce/solicitud", "robot1", None },
    empty_agent = { "cruce/solicitud", ":vertical_A", None },
    unknown_event = { "cruce/reportes", "robot2:bailando", None },
    own_snapshot = { "cruce/estado/cola", "vertical_A|", None },
)]
fn event_for_maps_topics(topic: &str, payload: &str, expected: Option<Event>) {
    let runtime = Runtime::new(
        Controller::new(
            LaneTable::standard(),
            priorities(),
            MAX_HOLD,
            FakeClock::new(),
        ),
        FakeBus::new(),
        RuntimeConfig::from(&ControllerConfig::default()),
    );

    assert_eq!(runtime.event_for(&message(topic, payload)), expected);
}

#[test]
fn non_utf8_payload_is_dropped() {
    let runtime = Runtime::new(
        Controller::new(LaneTable::standard(), priorities(), MAX_HOLD, FakeClock::new()),
        FakeBus::new(),
        RuntimeConfig::from(&ControllerConfig::default()),
    );
    let message = BusMessage {
        topic: "cruce/solicitud".to_string(),
        payload: vec![0xff, b':', b'x'],
        retained: false,
    };

    assert_eq!(runtime.event_for(&message), None);
}

#[test]
fn connect_options_register_retained_offline_will() {
    let runtime = Runtime::new(
        Controller::new(LaneTable::standard(), priorities(), MAX_HOLD, FakeClock::new()),
        FakeBus::new(),
        RuntimeConfig::from(&ControllerConfig::default()),
    );

    let options = runtime.connect_options();
    let will = options.last_will.unwrap();

    assert_eq!(options.client_id, "controlador");
    assert_eq!(will.topic, "cruce/reportes");
    assert_eq!(will.payload, b"controlador:offline");
    assert!(will.retain);
}

#[tokio::test]
async fn request_on_free_lane_is_granted_and_snapshotted() {
    let (mut runtime, bus, _) = setup().await;

    runtime
        .handle_message(&message("cruce/solicitud", "robot1:vertical_A"))
        .await
        .unwrap();

    assert_eq!(bus.published_to("cruce/respuesta"), vec!["robot1:pasar"]);
    assert_eq!(
        bus.published_to("cruce/estado/active_robot"),
        vec!["robot1@vertical_A"]
    );
    assert_eq!(
        bus.published_to("cruce/estado/cola"),
        vec!["vertical_A|;vertical_B|;horizontal|"]
    );
}

#[tokio::test]
async fn queued_request_republishes_queue_snapshot() {
    let (mut runtime, bus, _) = setup().await;
    runtime
        .handle_message(&message("cruce/solicitud", "robot1:horizontal"))
        .await
        .unwrap();
    bus.clear_calls();

    runtime
        .handle_message(&message("cruce/solicitud", "robot2:vertical_A"))
        .await
        .unwrap();

    assert!(bus.published_to("cruce/respuesta").is_empty());
    assert_eq!(
        bus.published_to("cruce/estado/cola"),
        vec!["vertical_A|robot2;vertical_B|;horizontal|"]
    );
}

#[tokio::test]
async fn duplicate_queued_request_publishes_nothing() {
    let (mut runtime, bus, _) = setup().await;
    for payload in ["robot1:horizontal", "robot2:vertical_A"] {
        runtime
            .handle_message(&message("cruce/solicitud", payload))
            .await
            .unwrap();
    }
    bus.clear_calls();

    runtime
        .handle_message(&message("cruce/solicitud", "robot2:vertical_A"))
        .await
        .unwrap();

    assert!(bus.calls().is_empty());
    assert_eq!(runtime.controller().state().queue("vertical_A").len(), 1);
}

#[tokio::test]
async fn release_hands_lane_to_next_in_priority_order() {
    let (mut runtime, bus, _) = setup().await;
    for payload in ["robot3:vertical_A", "robot2:vertical_A", "robot1:vertical_A"] {
        runtime
            .handle_message(&message("cruce/solicitud", payload))
            .await
            .unwrap();
    }
    bus.clear_calls();

    runtime
        .handle_message(&message("cruce/reportes", "robot3:cruce_liberado"))
        .await
        .unwrap();

    assert_eq!(bus.published_to("cruce/respuesta"), vec!["robot1:pasar"]);
    assert_eq!(
        bus.published_to("cruce/estado/active_robot"),
        vec!["", "robot1@vertical_A"]
    );
}

#[tokio::test]
async fn tick_evicts_stalled_holder() {
    let (mut runtime, bus, clock) = setup().await;
    runtime
        .handle_message(&message("cruce/solicitud", "robot2:horizontal"))
        .await
        .unwrap();
    runtime
        .handle_message(&message("cruce/solicitud", "robot1:vertical_B"))
        .await
        .unwrap();
    bus.clear_calls();

    clock.advance(MAX_HOLD + Duration::from_millis(1));
    runtime.tick().await.unwrap();

    assert_eq!(
        bus.published_to("cruce/respuesta"),
        vec!["robot2:expulsado", "robot1:pasar"]
    );
    assert_eq!(bus.published_to("cruce/reportes"), vec!["robot2:timeout"]);
    assert_eq!(
        runtime.controller().state().holder(&"robot1".into()).map(|h| h.lane.as_str()),
        Some("vertical_B")
    );
}

#[tokio::test]
async fn idle_tick_publishes_nothing() {
    let (mut runtime, bus, clock) = setup().await;
    clock.advance(Duration::from_secs(60));

    runtime.tick().await.unwrap();

    assert!(bus.calls().is_empty());
}

#[tokio::test]
async fn publish_failure_surfaces_but_state_advances() {
    let (mut runtime, bus, _) = setup().await;
    bus.fail_publishes(1);

    let result = runtime
        .handle_message(&message("cruce/solicitud", "robot1:vertical_A"))
        .await;

    assert!(matches!(result, Err(RuntimeError::Execute(_))));
    assert!(runtime.controller().state().is_holder(&"robot1".into()));
}

#[tokio::test]
async fn shutdown_publishes_offline_and_disconnects() {
    let (mut runtime, bus, _) = setup().await;

    runtime.shutdown().await.unwrap();

    let calls = bus.calls();
    assert_eq!(
        calls,
        vec![
            BusCall::Publish(
                Publication::new("cruce/reportes", "controlador:offline")
                    .reliable()
                    .retained()
            ),
            BusCall::Disconnect,
        ]
    );
}
