// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot payload codec
//!
//! Holder snapshot: comma-joined `agent@lane` entries, empty when nobody
//! holds a lane. The `@lane` suffix extends the plain list of holder ids so
//! a restart can rebuild occupancy from the snapshot alone. Agents never
//! read this channel, and bare ids are still accepted on parse.
//!
//! Queue snapshot: `;`-joined `lane|a,b` groups, one per lane in declaration
//! order, empty groups included.

use thiserror::Error;
use xc_core::{AgentId, ArbitrationState, LaneId};

const HOLDER_SEP: char = ',';
const LANE_MARK: char = '@';
const GROUP_SEP: char = ';';
const GROUP_MARK: char = '|';

/// A malformed snapshot entry; the entry is skipped, the rest is kept
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("holder entry without agent: {0:?}")]
    EmptyAgent(String),
    #[error("holder entry with empty lane: {0:?}")]
    EmptyLane(String),
    #[error("queue group without '|': {0:?}")]
    MissingGroupMark(String),
}

/// Both retained payloads for one state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPayloads {
    pub holders: String,
    pub queues: String,
}

/// Encode both snapshots of a state
pub fn encode(state: &ArbitrationState) -> SnapshotPayloads {
    SnapshotPayloads {
        holders: encode_holders(state),
        queues: encode_queues(state),
    }
}

/// Encode the holder snapshot, sorted by agent
pub fn encode_holders(state: &ArbitrationState) -> String {
    state
        .holders()
        .map(|h| format!("{}{LANE_MARK}{}", h.agent, h.lane))
        .collect::<Vec<_>>()
        .join(&HOLDER_SEP.to_string())
}

pub fn encode_queues(state: &ArbitrationState) -> String {
    state
        .queues()
        .iter()
        .map(|q| {
            let agents: Vec<&str> = q.agents.iter().map(AgentId::as_str).collect();
            format!("{}{GROUP_MARK}{}", q.lane, agents.join(&HOLDER_SEP.to_string()))
        })
        .collect::<Vec<_>>()
        .join(&GROUP_SEP.to_string())
}

/// Entries decoded from a payload plus the ones that were rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    pub items: Vec<T>,
    pub rejected: Vec<SnapshotError>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

/// One holder snapshot entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderEntry {
    pub agent: AgentId,
    /// `None` for bare legacy entries, which name no lane
    pub lane: Option<LaneId>,
}

pub fn parse_holders(payload: &str) -> Parsed<HolderEntry> {
    let mut parsed = Parsed::default();

    for raw in payload.split(HOLDER_SEP).map(str::trim).filter(|s| !s.is_empty()) {
        let (agent, lane) = match raw.split_once(LANE_MARK) {
            Some((agent, lane)) => (agent.trim(), Some(lane.trim())),
            None => (raw, None),
        };
        if agent.is_empty() {
            parsed.rejected.push(SnapshotError::EmptyAgent(raw.to_string()));
            continue;
        }
        if lane == Some("") {
            parsed.rejected.push(SnapshotError::EmptyLane(raw.to_string()));
            continue;
        }
        parsed.items.push(HolderEntry {
            agent: AgentId::new(agent),
            lane: lane.map(LaneId::new),
        });
    }

    parsed
}

/// One queue snapshot group, agents in queue order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueGroup {
    pub lane: LaneId,
    pub agents: Vec<AgentId>,
}

pub fn parse_queues(payload: &str) -> Parsed<QueueGroup> {
    let mut parsed = Parsed::default();

    for raw in payload.split(GROUP_SEP).map(str::trim).filter(|s| !s.is_empty()) {
        let Some((lane, agents)) = raw.split_once(GROUP_MARK) else {
            parsed.rejected.push(SnapshotError::MissingGroupMark(raw.to_string()));
            continue;
        };
        let lane = lane.trim();
        if lane.is_empty() {
            parsed.rejected.push(SnapshotError::EmptyLane(raw.to_string()));
            continue;
        }
        parsed.items.push(QueueGroup {
            lane: LaneId::new(lane),
            agents: agents
                .split(HOLDER_SEP)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(AgentId::new)
                .collect(),
        });
    }

    parsed
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
