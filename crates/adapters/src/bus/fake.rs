// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake bus adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{BusAdapter, BusError, BusMessage, ConnectOptions, Publication};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Recorded bus call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusCall {
    Connect(ConnectOptions),
    Subscribe(String),
    Publish(Publication),
    Disconnect,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<BusCall>,
    inbox: Option<mpsc::UnboundedSender<BusMessage>>,
    /// Messages handed out on the next subscribe to a matching filter
    retained: Vec<BusMessage>,
    connect_failures: VecDeque<BusError>,
    publish_failures: usize,
}

/// Fake bus adapter for testing
///
/// Records every call. Tests inject inbound messages with [`FakeBus::inject`]
/// and simulate a dropped link with [`FakeBus::drop_connection`].
#[derive(Clone, Default)]
pub struct FakeBus {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<BusCall> {
        self.lock().calls.clone()
    }

    /// Recorded publications, in order
    pub fn publications(&self) -> Vec<Publication> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                BusCall::Publish(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    /// Payloads published to one topic, as text
    pub fn published_to(&self, topic: &str) -> Vec<String> {
        self.publications()
            .into_iter()
            .filter(|p| p.topic == topic)
            .map(|p| String::from_utf8_lossy(&p.payload).into_owned())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Deliver a live message to the connected session
    pub fn inject(&self, topic: &str, payload: &str) -> bool {
        let state = self.lock();
        state.inbox.as_ref().is_some_and(|tx| {
            tx.send(BusMessage {
                topic: topic.to_string(),
                payload: payload.as_bytes().to_vec(),
                retained: false,
            })
            .is_ok()
        })
    }

    /// Queue a retained value delivered when a matching filter is subscribed
    pub fn set_retained(&self, topic: &str, payload: &str) {
        self.lock().retained.push(BusMessage {
            topic: topic.to_string(),
            payload: payload.as_bytes().to_vec(),
            retained: true,
        });
    }

    /// End the inbound stream as if the link died
    pub fn drop_connection(&self) {
        self.lock().inbox = None;
    }

    pub fn is_connected(&self) -> bool {
        self.lock().inbox.is_some()
    }

    /// Fail the next connect attempt with `error`
    pub fn fail_next_connect(&self, error: BusError) {
        self.lock().connect_failures.push_back(error);
    }

    /// Fail the next `count` publishes
    pub fn fail_publishes(&self, count: usize) {
        self.lock().publish_failures = count;
    }
}

#[async_trait]
impl BusAdapter for FakeBus {
    async fn connect(
        &self,
        options: ConnectOptions,
    ) -> Result<mpsc::UnboundedReceiver<BusMessage>, BusError> {
        let mut state = self.lock();
        state.calls.push(BusCall::Connect(options));
        if let Some(error) = state.connect_failures.pop_front() {
            return Err(error);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.inbox = Some(tx);
        Ok(rx)
    }

    async fn subscribe(&self, filter: &str) -> Result<(), BusError> {
        let mut state = self.lock();
        state.calls.push(BusCall::Subscribe(filter.to_string()));
        let Some(tx) = state.inbox.clone() else {
            return Err(BusError::NotConnected);
        };
        for message in state
            .retained
            .iter()
            .filter(|m| super::topic_matches(filter, &m.topic))
        {
            let _ = tx.send(message.clone());
        }
        Ok(())
    }

    async fn publish(&self, publication: Publication) -> Result<(), BusError> {
        let mut state = self.lock();
        state.calls.push(BusCall::Publish(publication));
        if state.inbox.is_none() {
            return Err(BusError::NotConnected);
        }
        if state.publish_failures > 0 {
            state.publish_failures -= 1;
            return Err(BusError::Broker("injected failure".to_string()));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        let mut state = self.lock();
        state.calls.push(BusCall::Disconnect);
        state.inbox = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
