// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway client for CLI commands

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;
use xc_adapters::{BusAdapter, BusError, BusMessage, ConnectOptions, Publication};
use xc_core::{Channels, ConfigError, ControllerConfig};
use xc_daemon::GatewayBus;

// Timeout configuration (env vars in milliseconds)
fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// How long `status` waits for retained snapshots
pub fn timeout_snapshot() -> Duration {
    parse_duration_ms("XC_TIMEOUT_SNAPSHOT_MS").unwrap_or(Duration::from_millis(500))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Gateway not running at {0}")]
    GatewayNotRunning(PathBuf),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not determine state directory")]
    NoStateDir,
}

/// Socket of the default controller's gateway
pub fn default_socket_path() -> Result<PathBuf, ClientError> {
    let base = dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .ok_or(ClientError::NoStateDir)?;
    let controller_id = ControllerConfig::default().controller_id;
    Ok(base.join("xc").join(controller_id).join("gateway.sock"))
}

/// Channel topics, from the controller config when one is given
pub fn load_channels(config: Option<&Path>) -> Result<Channels, ClientError> {
    match config {
        Some(path) => Ok(ControllerConfig::load(path)?.channels),
        None => Ok(Channels::default()),
    }
}

/// Client id for commands that do not act as an agent
pub fn ephemeral_id() -> String {
    format!("xc-{}", Uuid::new_v4().simple())
}

/// A connected bus session through the gateway
pub struct BusClient {
    bus: GatewayBus,
    pub channels: Channels,
}

impl BusClient {
    pub async fn connect(
        socket_path: &Path,
        channels: Channels,
        options: ConnectOptions,
    ) -> Result<(Self, mpsc::UnboundedReceiver<BusMessage>), ClientError> {
        if !socket_path.exists() {
            return Err(ClientError::GatewayNotRunning(socket_path.to_path_buf()));
        }

        let bus = GatewayBus::new(socket_path);
        let inbox = bus.connect(options).await?;
        Ok((Self { bus, channels }, inbox))
    }

    pub fn bus(&self) -> &GatewayBus {
        &self.bus
    }

    pub async fn subscribe(&self, filter: &str) -> Result<(), ClientError> {
        Ok(self.bus.subscribe(filter).await?)
    }

    pub async fn publish(&self, publication: Publication) -> Result<(), ClientError> {
        Ok(self.bus.publish(publication).await?)
    }

    pub async fn disconnect(self) -> Result<(), ClientError> {
        Ok(self.bus.disconnect().await?)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
