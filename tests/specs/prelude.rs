//! Test harness: one controller runtime on an in-process broker, plus an
//! observer session that records everything the controller publishes.

use std::time::Duration;

use tokio::sync::mpsc;
use xc_adapters::{BusAdapter, BusMessage, ConnectOptions, MemoryBroker, MemoryBus, Publication};
use xc_core::{Controller, ControllerConfig, FakeClock};
use xc_engine::{Runtime, RuntimeConfig};

pub const MAX_CROSSING: Duration = Duration::from_secs(10);

pub struct Harness {
    pub broker: MemoryBroker,
    pub clock: FakeClock,
    pub runtime: Runtime<MemoryBus, FakeClock>,
    // Keeps the controller session alive; traffic is fed through `send`
    _inbox: mpsc::UnboundedReceiver<BusMessage>,
    observer: mpsc::UnboundedReceiver<BusMessage>,
    _observer_bus: MemoryBus,
}

fn config() -> ControllerConfig {
    let mut config = ControllerConfig::default();
    config.timing.max_crossing = MAX_CROSSING;
    config.timing.recovery_wait = Duration::from_millis(30);
    config
}

impl Harness {
    /// Start a controller on a fresh broker
    pub async fn start() -> Self {
        Self::start_on(MemoryBroker::new()).await
    }

    /// Start a controller on an existing broker, recovering what it retained
    pub async fn start_on(broker: MemoryBroker) -> Self {
        let observer_bus = MemoryBus::new(broker.clone());
        let observer = observer_bus
            .connect(ConnectOptions::new(format!("observer-{}", broker.session_count())))
            .await
            .unwrap();

        let config = config();
        let clock = FakeClock::new();
        let controller = Controller::from_config(&config, clock.clone()).unwrap();
        let bus = MemoryBus::new(broker.clone());
        let mut runtime = Runtime::new(controller, bus.clone(), RuntimeConfig::from(&config));
        let mut inbox = bus.connect(runtime.connect_options()).await.unwrap();
        runtime.recover(&mut inbox).await.unwrap();

        // Subscribe after recovery so the log starts with live traffic
        observer_bus.subscribe("#").await.unwrap();
        let mut harness = Self {
            broker,
            clock,
            runtime,
            _inbox: inbox,
            observer,
            _observer_bus: observer_bus,
        };
        harness.published();
        harness
    }

    /// Simulate a controller crash: the broker sees the link die
    pub fn crash(self) -> MemoryBroker {
        assert!(self.broker.sever("controlador"));
        self.broker
    }

    pub async fn request(&mut self, agent: &str, lane: &str) {
        self.send("cruce/solicitud", &format!("{agent}:{lane}")).await;
    }

    pub async fn report(&mut self, agent: &str, event: &str) {
        self.send("cruce/reportes", &format!("{agent}:{event}")).await;
    }

    pub async fn send(&mut self, topic: &str, payload: &str) {
        let message = BusMessage {
            topic: topic.to_string(),
            payload: payload.as_bytes().to_vec(),
            retained: false,
        };
        self.runtime.handle_message(&message).await.unwrap();
    }

    pub async fn tick(&mut self) {
        self.runtime.tick().await.unwrap();
    }

    /// Seed a retained value as some other client would
    pub async fn retain(broker: &MemoryBroker, topic: &str, payload: &str) {
        let bus = MemoryBus::new(broker.clone());
        bus.connect(ConnectOptions::new("seed")).await.unwrap();
        bus.publish(Publication::new(topic, payload).reliable().retained())
            .await
            .unwrap();
        bus.disconnect().await.unwrap();
    }

    /// Everything published since the last call, as `topic payload` lines
    pub fn published(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(message) = self.observer.try_recv() {
            lines.push(format!(
                "{} {}",
                message.topic,
                String::from_utf8_lossy(&message.payload)
            ));
        }
        lines
    }

    pub fn retained(&self, topic: &str) -> String {
        self.broker
            .retained(topic)
            .map(|p| String::from_utf8_lossy(&p).into_owned())
            .unwrap_or_default()
    }

    pub fn holders(&self) -> Vec<String> {
        self.runtime
            .controller()
            .state()
            .holders()
            .map(|h| format!("{}@{}", h.agent, h.lane))
            .collect()
    }
}
