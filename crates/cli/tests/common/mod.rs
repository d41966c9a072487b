// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::time::{Duration, Instant};

use assert_cmd::Command;
use tempfile::TempDir;
use tokio::net::UnixListener;
use tokio::sync::oneshot;
use xc_adapters::{MemoryBroker, MemoryBus, NoOpWatchdog};
use xc_core::{Controller, ControllerConfig, SystemClock, TimingConfig};
use xc_engine::{Dispatcher, DispatcherConfig, Runtime, RuntimeConfig};

/// A controller and gateway running in the test process
pub struct Intersection {
    _dir: TempDir,
    pub socket: PathBuf,
    pub broker: MemoryBroker,
    stop: Option<oneshot::Sender<()>>,
    runtime: Option<tokio::runtime::Runtime>,
}

impl Intersection {
    pub fn start() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let socket = dir.path().join("gateway.sock");
        let broker = MemoryBroker::new();
        let runtime = tokio::runtime::Runtime::new().expect("Failed to build runtime");

        let config = ControllerConfig {
            timing: TimingConfig {
                max_crossing: Duration::from_secs(5),
                tick_interval: Duration::from_millis(10),
                reconnect_backoff: Duration::from_millis(50),
                recovery_wait: Duration::from_millis(50),
            },
            ..ControllerConfig::default()
        };
        let (stop, stopped) = oneshot::channel::<()>();

        runtime.block_on(async {
            let listener = UnixListener::bind(&socket).expect("Failed to bind gateway socket");
            tokio::spawn(xc_daemon::server::serve(listener, broker.clone()));

            let controller = Controller::from_config(&config, SystemClock).expect("bad config");
            let runtime = Runtime::new(
                controller,
                MemoryBus::new(broker.clone()),
                RuntimeConfig::from(&config),
            );
            let mut dispatcher = Dispatcher::new(
                runtime,
                NoOpWatchdog::new(),
                DispatcherConfig::from(&config.timing),
            );
            tokio::spawn(async move {
                dispatcher
                    .run(async move {
                        let _ = stopped.await;
                    })
                    .await;
            });
        });

        let intersection = Self {
            _dir: dir,
            socket,
            broker,
            stop: Some(stop),
            runtime: Some(runtime),
        };
        intersection.wait_for_retained("cruce/reportes", "controlador:online");
        intersection
    }

    /// `xc` pointed at this gateway
    pub fn xc(&self) -> Command {
        let mut cmd = Command::cargo_bin("xc").expect("xc binary not built");
        cmd.env_remove("XC_CONFIG")
            .env("XC_TIMEOUT_SNAPSHOT_MS", "1000")
            .arg("--socket")
            .arg(&self.socket);
        cmd
    }

    pub fn wait_for_retained(&self, topic: &str, payload: &str) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.broker.retained(topic).as_deref() != Some(payload.as_bytes()) {
            assert!(
                Instant::now() < deadline,
                "never saw retained {payload:?} on {topic}"
            );
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for Intersection {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(Duration::from_secs(1));
        }
    }
}
