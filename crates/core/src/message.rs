// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire payloads exchanged with agents
//!
//! Every payload is UTF-8 text of the form `<agent>:<body>`. The agent part
//! is everything before the first `:`; both parts are trimmed and must be
//! non-empty.

use crate::id::{AgentId, LaneId};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors parsing an inbound payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("payload is not valid UTF-8")]
    NotUtf8,
    #[error("missing ':' separator in {0:?}")]
    MissingSeparator(String),
    #[error("empty agent in {0:?}")]
    EmptyAgent(String),
    #[error("empty body in {0:?}")]
    EmptyBody(String),
    #[error("unknown report event: {0}")]
    UnknownEvent(String),
}

fn split(payload: &str) -> Result<(&str, &str), MessageError> {
    let (agent, body) = payload
        .split_once(':')
        .ok_or_else(|| MessageError::MissingSeparator(payload.to_string()))?;
    let (agent, body) = (agent.trim(), body.trim());
    if agent.is_empty() {
        return Err(MessageError::EmptyAgent(payload.to_string()));
    }
    if body.is_empty() {
        return Err(MessageError::EmptyBody(payload.to_string()));
    }
    Ok((agent, body))
}

/// Decode raw bytes as UTF-8 text
pub fn text(payload: &[u8]) -> Result<&str, MessageError> {
    std::str::from_utf8(payload).map_err(|_| MessageError::NotUtf8)
}

/// `<agent>:<lane>` on the request channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestMessage {
    pub agent: AgentId,
    pub lane: LaneId,
}

impl RequestMessage {
    pub fn new(agent: impl Into<AgentId>, lane: impl Into<LaneId>) -> Self {
        Self {
            agent: agent.into(),
            lane: lane.into(),
        }
    }

    pub fn parse(payload: &str) -> Result<Self, MessageError> {
        let (agent, lane) = split(payload)?;
        Ok(Self::new(agent, lane))
    }
}

impl fmt::Display for RequestMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.agent, self.lane)
    }
}

/// Events an agent (or the controller itself) reports
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReportEvent {
    /// The agent left the lane
    Released,
    /// The agent reached the far side
    Arrived,
    /// The controller evicted the agent for holding too long
    TimedOut,
    Online,
    Offline,
    /// The agent acknowledged an eviction
    Expelled,
}

impl ReportEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportEvent::Released => "cruce_liberado",
            ReportEvent::Arrived => "llego",
            ReportEvent::TimedOut => "timeout",
            ReportEvent::Online => "online",
            ReportEvent::Offline => "offline",
            ReportEvent::Expelled => "expulsado",
        }
    }

    /// Presence reports are published retained
    pub fn is_durable(self) -> bool {
        matches!(self, ReportEvent::Online | ReportEvent::Offline)
    }

    /// Whether the report frees whatever the agent holds or waits for
    pub fn ends_participation(self) -> bool {
        matches!(
            self,
            ReportEvent::Released | ReportEvent::Offline | ReportEvent::Expelled
        )
    }
}

impl FromStr for ReportEvent {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cruce_liberado" => Ok(ReportEvent::Released),
            "llego" => Ok(ReportEvent::Arrived),
            "timeout" => Ok(ReportEvent::TimedOut),
            "online" => Ok(ReportEvent::Online),
            "offline" => Ok(ReportEvent::Offline),
            "expulsado" => Ok(ReportEvent::Expelled),
            other => Err(MessageError::UnknownEvent(other.to_string())),
        }
    }
}

impl fmt::Display for ReportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<agent>:<event>` on the report channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportMessage {
    pub agent: AgentId,
    pub event: ReportEvent,
}

impl ReportMessage {
    pub fn new(agent: impl Into<AgentId>, event: ReportEvent) -> Self {
        Self {
            agent: agent.into(),
            event,
        }
    }

    pub fn parse(payload: &str) -> Result<Self, MessageError> {
        let (agent, event) = split(payload)?;
        Ok(Self::new(agent, event.parse()?))
    }
}

impl fmt::Display for ReportMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.agent, self.event)
    }
}

/// Controller decision addressed to one agent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    Pass,
    Expelled,
    Wait,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "pasar",
            Verdict::Expelled => "expulsado",
            Verdict::Wait => "esperar",
        }
    }
}

impl FromStr for Verdict {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pasar" => Ok(Verdict::Pass),
            "expulsado" => Ok(Verdict::Expelled),
            "esperar" => Ok(Verdict::Wait),
            other => Err(MessageError::UnknownEvent(other.to_string())),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<agent>:<verdict>` on the reply channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub agent: AgentId,
    pub verdict: Verdict,
}

impl Reply {
    pub fn new(agent: impl Into<AgentId>, verdict: Verdict) -> Self {
        Self {
            agent: agent.into(),
            verdict,
        }
    }

    pub fn parse(payload: &str) -> Result<Self, MessageError> {
        let (agent, verdict) = split(payload)?;
        Ok(Self::new(agent, verdict.parse()?))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.agent, self.verdict)
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
