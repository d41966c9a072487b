// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use xc_adapters::{MemoryBroker, MemoryBus};

const WAIT: Duration = Duration::from_secs(2);

fn crossing(resend: Option<Duration>) -> Crossing {
    Crossing {
        agent: AgentId::new("robot1"),
        lane: LaneId::new("horizontal"),
        channels: Channels::default(),
        hold: Duration::from_millis(10),
        resend,
    }
}

/// A stand-in controller session that sees requests and reports
async fn controller(broker: &MemoryBroker) -> (MemoryBus, mpsc::UnboundedReceiver<BusMessage>) {
    let bus = MemoryBus::new(broker.clone());
    let inbox = bus.connect(ConnectOptions::new("controlador")).await.unwrap();
    bus.subscribe("cruce/solicitud").await.unwrap();
    bus.subscribe("cruce/reportes").await.unwrap();
    (bus, inbox)
}

async fn next_payload(inbox: &mut mpsc::UnboundedReceiver<BusMessage>) -> String {
    let message = tokio::time::timeout(WAIT, inbox.recv())
        .await
        .expect("timed out")
        .expect("stream ended");
    message.payload_str().unwrap().to_string()
}

async fn start(
    broker: &MemoryBroker,
    crossing: Crossing,
) -> tokio::task::JoinHandle<Result<Outcome, BusError>> {
    let bus = MemoryBus::new(broker.clone());
    let mut inbox = bus.connect(crossing.connect_options()).await.unwrap();
    tokio::spawn(async move { crossing.run(&bus, &mut inbox).await })
}

#[test]
fn session_will_reports_offline() {
    let options = crossing(None).connect_options();

    assert_eq!(options.client_id, "robot1");
    let will = options.last_will.unwrap();
    assert_eq!(will.topic, "cruce/reportes");
    assert_eq!(will.payload, b"robot1:offline".to_vec());
    assert!(will.retain);
}

#[tokio::test]
async fn granted_agent_crosses_and_releases() {
    let broker = MemoryBroker::new();
    let (controller, mut requests) = controller(&broker).await;
    let run = start(&broker, crossing(None)).await;

    assert_eq!(next_payload(&mut requests).await, "robot1:online");
    assert_eq!(next_payload(&mut requests).await, "robot1:horizontal");
    controller
        .publish(Publication::new("cruce/respuesta", "robot1:pasar"))
        .await
        .unwrap();

    assert_eq!(next_payload(&mut requests).await, "robot1:llego");
    assert_eq!(next_payload(&mut requests).await, "robot1:cruce_liberado");
    assert_eq!(next_payload(&mut requests).await, "robot1:offline");
    assert_eq!(run.await.unwrap(), Ok(Outcome::Crossed));
}

#[tokio::test]
async fn replies_for_other_agents_are_ignored() {
    let broker = MemoryBroker::new();
    let (controller, mut requests) = controller(&broker).await;
    let run = start(&broker, crossing(None)).await;
    next_payload(&mut requests).await;
    next_payload(&mut requests).await;

    controller
        .publish(Publication::new("cruce/respuesta", "robot2:pasar"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!run.is_finished());

    controller
        .publish(Publication::new("cruce/respuesta", "robot1:pasar"))
        .await
        .unwrap();
    assert_eq!(run.await.unwrap(), Ok(Outcome::Crossed));
}

#[tokio::test]
async fn resync_broadcast_triggers_a_new_request() {
    let broker = MemoryBroker::new();
    let (controller, mut requests) = controller(&broker).await;
    let run = start(&broker, crossing(None)).await;
    next_payload(&mut requests).await;
    assert_eq!(next_payload(&mut requests).await, "robot1:horizontal");

    controller
        .publish(Publication::new("robots/solicitar_estado", "reanunciar"))
        .await
        .unwrap();

    assert_eq!(next_payload(&mut requests).await, "robot1:horizontal");
    run.abort();
}

#[tokio::test]
async fn resend_interval_repeats_the_request() {
    let broker = MemoryBroker::new();
    let (_controller, mut requests) = controller(&broker).await;
    let run = start(&broker, crossing(Some(Duration::from_millis(20)))).await;
    next_payload(&mut requests).await;

    assert_eq!(next_payload(&mut requests).await, "robot1:horizontal");
    assert_eq!(next_payload(&mut requests).await, "robot1:horizontal");
    assert_eq!(next_payload(&mut requests).await, "robot1:horizontal");
    run.abort();
}

#[tokio::test]
async fn expulsion_during_hold_is_acknowledged() {
    let broker = MemoryBroker::new();
    let (controller, mut requests) = controller(&broker).await;
    let mut slow = crossing(None);
    slow.hold = Duration::from_secs(30);
    let run = start(&broker, slow).await;
    next_payload(&mut requests).await;
    next_payload(&mut requests).await;

    controller
        .publish(Publication::new("cruce/respuesta", "robot1:pasar"))
        .await
        .unwrap();
    controller
        .publish(Publication::new("cruce/respuesta", "robot1:expulsado"))
        .await
        .unwrap();

    assert_eq!(next_payload(&mut requests).await, "robot1:expulsado");
    assert_eq!(run.await.unwrap(), Ok(Outcome::Expelled));
}

#[tokio::test]
async fn lost_gateway_is_an_error() {
    let broker = MemoryBroker::new();
    let (_controller, mut requests) = controller(&broker).await;
    let run = start(&broker, crossing(None)).await;
    next_payload(&mut requests).await;
    next_payload(&mut requests).await;

    broker.sever("robot1");

    let result = run.await.unwrap();
    assert!(matches!(result, Err(BusError::ConnectionLost(_))));
    // The will announced the drop
    assert_eq!(next_payload(&mut requests).await, "robot1:offline");
}
