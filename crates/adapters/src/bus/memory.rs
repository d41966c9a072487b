// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process broker
//!
//! Implements the transport contract inside one process. The daemon hosts
//! one and exposes it over a socket; tests drive it directly.
//!
//! Retained values are kept per topic, including empty ones. A session that
//! is severed (or whose connection drops) has its last will published; a
//! clean disconnect discards it.

use super::{
    topic_matches, validate_filter, BusAdapter, BusError, BusMessage, ConnectOptions, Publication,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Handle to one broker session
pub type SessionId = u64;

struct Session {
    client_id: String,
    filters: Vec<String>,
    sender: mpsc::UnboundedSender<BusMessage>,
    last_will: Option<Publication>,
}

#[derive(Default)]
struct BrokerState {
    retained: BTreeMap<String, Vec<u8>>,
    sessions: HashMap<SessionId, Session>,
    next_session: SessionId,
    refusing: bool,
}

impl BrokerState {
    fn route(&mut self, publication: &Publication) {
        if publication.retain {
            self.retained
                .insert(publication.topic.clone(), publication.payload.clone());
        }

        let mut gone = Vec::new();
        for (id, session) in &self.sessions {
            if !session.filters.iter().any(|f| topic_matches(f, &publication.topic)) {
                continue;
            }
            let message = BusMessage {
                topic: publication.topic.clone(),
                payload: publication.payload.clone(),
                retained: false,
            };
            if session.sender.send(message).is_err() {
                gone.push(*id);
            }
        }

        // receivers dropped without a disconnect count as unclean drops
        for id in gone {
            self.drop_session(id, true);
        }
    }

    fn drop_session(&mut self, id: SessionId, publish_will: bool) {
        let Some(session) = self.sessions.remove(&id) else {
            return;
        };
        tracing::debug!(client_id = %session.client_id, publish_will, "session closed");
        if publish_will {
            if let Some(will) = session.last_will {
                self.route(&will);
            }
        }
    }
}

/// Shared in-process broker; clones refer to the same broker
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Open a session; an existing session with the same client id is
    /// taken over without publishing its will
    pub fn open(
        &self,
        options: ConnectOptions,
    ) -> Result<(SessionId, mpsc::UnboundedReceiver<BusMessage>), BusError> {
        let mut state = self.lock();
        if state.refusing {
            return Err(BusError::Refused("broker unavailable".to_string()));
        }

        let taken_over: Vec<SessionId> = state
            .sessions
            .iter()
            .filter(|(_, s)| s.client_id == options.client_id)
            .map(|(id, _)| *id)
            .collect();
        for id in taken_over {
            state.drop_session(id, false);
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let id = state.next_session;
        state.next_session += 1;
        state.sessions.insert(
            id,
            Session {
                client_id: options.client_id,
                filters: Vec::new(),
                sender,
                last_will: options.last_will,
            },
        );
        Ok((id, receiver))
    }

    pub fn subscribe(&self, session: SessionId, filter: &str) -> Result<(), BusError> {
        validate_filter(filter)?;
        let mut state = self.lock();
        let retained: Vec<BusMessage> = state
            .retained
            .iter()
            .filter(|(topic, _)| topic_matches(filter, topic))
            .map(|(topic, payload)| BusMessage {
                topic: topic.clone(),
                payload: payload.clone(),
                retained: true,
            })
            .collect();

        let entry = state.sessions.get_mut(&session).ok_or(BusError::NotConnected)?;
        if !entry.filters.iter().any(|f| f == filter) {
            entry.filters.push(filter.to_string());
        }
        for message in retained {
            if entry.sender.send(message).is_err() {
                state.drop_session(session, true);
                return Err(BusError::NotConnected);
            }
        }
        Ok(())
    }

    pub fn publish(&self, session: SessionId, publication: &Publication) -> Result<(), BusError> {
        let mut state = self.lock();
        if !state.sessions.contains_key(&session) {
            return Err(BusError::NotConnected);
        }
        state.route(publication);
        Ok(())
    }

    /// Clean close: the will is discarded
    pub fn close(&self, session: SessionId) {
        self.lock().drop_session(session, false);
    }

    /// Unclean close: the will is published
    pub fn abort(&self, session: SessionId) {
        self.lock().drop_session(session, true);
    }

    /// Drop every session of a client as if its link died
    pub fn sever(&self, client_id: &str) -> bool {
        let mut state = self.lock();
        let ids: Vec<SessionId> = state
            .sessions
            .iter()
            .filter(|(_, s)| s.client_id == client_id)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            state.drop_session(*id, true);
        }
        !ids.is_empty()
    }

    /// Refuse new sessions until re-enabled
    pub fn set_refusing(&self, refusing: bool) {
        self.lock().refusing = refusing;
    }

    pub fn retained(&self, topic: &str) -> Option<Vec<u8>> {
        self.lock().retained.get(topic).cloned()
    }

    pub fn is_connected(&self, client_id: &str) -> bool {
        self.lock().sessions.values().any(|s| s.client_id == client_id)
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }
}

/// A client of a [`MemoryBroker`]
#[derive(Clone)]
pub struct MemoryBus {
    broker: MemoryBroker,
    session: Arc<Mutex<Option<SessionId>>>,
}

impl MemoryBus {
    pub fn new(broker: MemoryBroker) -> Self {
        Self {
            broker,
            session: Arc::new(Mutex::new(None)),
        }
    }

    pub fn broker(&self) -> &MemoryBroker {
        &self.broker
    }

    fn session(&self) -> Result<SessionId, BusError> {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .ok_or(BusError::NotConnected)
    }
}

#[async_trait]
impl BusAdapter for MemoryBus {
    async fn connect(
        &self,
        options: ConnectOptions,
    ) -> Result<mpsc::UnboundedReceiver<BusMessage>, BusError> {
        let (id, receiver) = self.broker.open(options)?;
        let previous = self
            .session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(id);
        if let Some(previous) = previous {
            if previous != id {
                self.broker.close(previous);
            }
        }
        Ok(receiver)
    }

    async fn subscribe(&self, filter: &str) -> Result<(), BusError> {
        self.broker.subscribe(self.session()?, filter)
    }

    async fn publish(&self, publication: Publication) -> Result<(), BusError> {
        self.broker.publish(self.session()?, &publication)
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        let session = self.session.lock().unwrap_or_else(|e| e.into_inner()).take();
        match session {
            Some(id) => {
                self.broker.close(id);
                Ok(())
            }
            None => Err(BusError::NotConnected),
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
