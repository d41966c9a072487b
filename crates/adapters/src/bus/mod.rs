// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Publish/subscribe bus adapters
//!
//! The transport contract the controller and agents rely on: topic based
//! publish/subscribe, per-publish `reliable` and `retain` flags, and a last
//! will the broker publishes when a client drops without disconnecting.

mod memory;

pub use memory::{MemoryBroker, MemoryBus, SessionId};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{BusCall, FakeBus};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from bus operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("not connected")]
    NotConnected,
    #[error("connection refused: {0}")]
    Refused(String),
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    #[error("invalid topic filter: {0}")]
    InvalidFilter(String),
    #[error("broker error: {0}")]
    Broker(String),
}

/// A message delivered to a subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    /// Delivered from the retained store on subscribe rather than live
    #[serde(default)]
    pub retained: bool,
}

impl BusMessage {
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// An outbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub topic: String,
    pub payload: Vec<u8>,
    /// At-least-once delivery
    #[serde(default)]
    pub reliable: bool,
    /// Broker keeps the value and hands it to later subscribers
    #[serde(default)]
    pub retain: bool,
}

impl Publication {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            reliable: false,
            retain: false,
        }
    }

    pub fn reliable(mut self) -> Self {
        self.reliable = true;
        self
    }

    pub fn retained(mut self) -> Self {
        self.retain = true;
        self
    }
}

/// Parameters of a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOptions {
    pub client_id: String,
    /// Published by the broker if the client drops uncleanly
    #[serde(default)]
    pub last_will: Option<Publication>,
}

impl ConnectOptions {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            last_will: None,
        }
    }

    pub fn with_last_will(mut self, will: Publication) -> Self {
        self.last_will = Some(will);
        self
    }
}

/// Adapter for a publish/subscribe broker
///
/// `connect` returns the stream of inbound messages for the new session.
/// The stream ending means the connection is gone.
#[async_trait]
pub trait BusAdapter: Clone + Send + Sync + 'static {
    async fn connect(
        &self,
        options: ConnectOptions,
    ) -> Result<mpsc::UnboundedReceiver<BusMessage>, BusError>;

    /// Subscribe to a topic filter; retained matches are delivered at once
    async fn subscribe(&self, filter: &str) -> Result<(), BusError>;

    async fn publish(&self, publication: Publication) -> Result<(), BusError>;

    /// Clean disconnect; the last will is discarded
    async fn disconnect(&self) -> Result<(), BusError>;
}

/// Check a topic filter for valid `+` and `#` placement
pub fn validate_filter(filter: &str) -> Result<(), BusError> {
    if filter.is_empty() {
        return Err(BusError::InvalidFilter(filter.to_string()));
    }
    let levels: Vec<&str> = filter.split('/').collect();
    for (i, level) in levels.iter().enumerate() {
        let is_last = i + 1 == levels.len();
        let misplaced_hash = level.contains('#') && (*level != "#" || !is_last);
        let misplaced_plus = level.contains('+') && *level != "+";
        if misplaced_hash || misplaced_plus {
            return Err(BusError::InvalidFilter(filter.to_string()));
        }
    }
    Ok(())
}

/// MQTT-style topic matching: `+` matches one level, a trailing `#` any rest
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
