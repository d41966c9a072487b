// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource and queue store
//!
//! The arbitration state: resource occupancy, per-lane wait queues and
//! holder records. Every mutation of controller state goes through the
//! operations here, which keep occupancy and holder records in lockstep.

use crate::id::{AgentId, LaneId, ResourceId};
use crate::lane::LaneTable;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use thiserror::Error;

/// Errors from store mutations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unknown lane: {0}")]
    UnknownLane(LaneId),
    #[error("resource {resource} is held by {holder}")]
    ResourceBusy { resource: ResourceId, holder: AgentId },
    #[error("agent {0} already holds a lane")]
    AlreadyHolding(AgentId),
}

/// A broken store invariant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("resource {resource} occupied by {holder} without a matching holder record")]
    OrphanOccupancy { resource: ResourceId, holder: AgentId },
    #[error("holder {agent} does not occupy resource {resource}")]
    PartialHold { agent: AgentId, resource: ResourceId },
    #[error("holder {agent} holds resources that differ from lane {lane}")]
    LaneMismatch { agent: AgentId, lane: LaneId },
    #[error("agent {0} is queued more than once")]
    DuplicateQueueEntry(AgentId),
    #[error("agent {0} is queued while holding")]
    QueuedHolder(AgentId),
}

/// Occupancy of one resource
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    pub id: ResourceId,
    pub holder: Option<AgentId>,
    pub acquired_at: Option<Instant>,
}

impl Resource {
    fn free(id: ResourceId) -> Self {
        Self {
            id,
            holder: None,
            acquired_at: None,
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.holder.is_some()
    }
}

/// An agent currently granted a lane
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HolderRecord {
    pub agent: AgentId,
    pub lane: LaneId,
    pub resources: BTreeSet<ResourceId>,
    pub acquired_at: Instant,
}

/// Wait queue of a single lane, in arrival order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaneQueue {
    pub lane: LaneId,
    pub agents: Vec<AgentId>,
}

/// Result of an enqueue attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Appended to the lane's queue
    Queued,
    /// Was waiting in another lane; now waits in this one
    Moved { from: LaneId },
    /// Already waiting in this lane
    AlreadyQueued,
    /// Currently holds a lane
    Holding,
    UnknownLane,
}

/// The controller's complete arbitration state
#[derive(Clone, Debug)]
pub struct ArbitrationState {
    lanes: LaneTable,
    resources: BTreeMap<ResourceId, Resource>,
    queues: Vec<LaneQueue>,
    holders: BTreeMap<AgentId, HolderRecord>,
}

impl ArbitrationState {
    /// Empty state: every resource free, every queue empty
    pub fn new(lanes: LaneTable) -> Self {
        let resources = lanes
            .resources()
            .into_iter()
            .map(|id| (id.clone(), Resource::free(id)))
            .collect();
        let queues = lanes
            .iter()
            .map(|l| LaneQueue {
                lane: l.id.clone(),
                agents: Vec::new(),
            })
            .collect();

        Self {
            lanes,
            resources,
            queues,
            holders: BTreeMap::new(),
        }
    }

    pub fn lanes(&self) -> &LaneTable {
        &self.lanes
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn is_occupied(&self, id: &str) -> bool {
        self.resources.get(id).is_some_and(Resource::is_occupied)
    }

    /// True if every resource the lane needs is free
    pub fn is_lane_free(&self, lane: &str) -> bool {
        self.lanes
            .get(lane)
            .is_some_and(|l| l.resources.iter().all(|r| !self.is_occupied(r.as_str())))
    }

    pub fn holders(&self) -> impl Iterator<Item = &HolderRecord> {
        self.holders.values()
    }

    pub fn holder(&self, agent: &AgentId) -> Option<&HolderRecord> {
        self.holders.get(agent)
    }

    pub fn is_holder(&self, agent: &AgentId) -> bool {
        self.holders.contains_key(agent)
    }

    /// Queues in lane declaration order
    pub fn queues(&self) -> &[LaneQueue] {
        &self.queues
    }

    pub fn queue(&self, lane: &str) -> &[AgentId] {
        self.queues
            .iter()
            .find(|q| q.lane.as_str() == lane)
            .map(|q| q.agents.as_slice())
            .unwrap_or(&[])
    }

    /// Lane the agent is currently waiting in
    pub fn queued_lane(&self, agent: &AgentId) -> Option<&LaneId> {
        self.queues
            .iter()
            .find(|q| q.agents.contains(agent))
            .map(|q| &q.lane)
    }

    /// Total number of waiting agents across all lanes
    pub fn queued_len(&self) -> usize {
        self.queues.iter().map(|q| q.agents.len()).sum()
    }

    /// Append an agent to a lane's queue
    ///
    /// No-op for current holders and for agents already waiting in the lane.
    pub fn enqueue(&mut self, lane: &LaneId, agent: &AgentId) -> EnqueueOutcome {
        if self.lanes.get(lane.as_str()).is_none() {
            return EnqueueOutcome::UnknownLane;
        }
        if self.is_holder(agent) {
            return EnqueueOutcome::Holding;
        }

        let previous = self.queued_lane(agent).cloned();
        if previous.as_ref() == Some(lane) {
            return EnqueueOutcome::AlreadyQueued;
        }
        if previous.is_some() {
            self.remove_from_queues(agent);
        }
        if let Some(queue) = self.queues.iter_mut().find(|q| &q.lane == lane) {
            queue.agents.push(agent.clone());
        }

        match previous {
            Some(from) => EnqueueOutcome::Moved { from },
            None => EnqueueOutcome::Queued,
        }
    }

    /// Grant a lane: occupy all of its resources and record the holder
    ///
    /// Fails without changing anything if any resource is occupied.
    pub fn grant(&mut self, lane: &LaneId, agent: &AgentId, now: Instant) -> Result<(), StoreError> {
        let resources = self
            .lanes
            .get(lane.as_str())
            .map(|l| l.resources.clone())
            .ok_or_else(|| StoreError::UnknownLane(lane.clone()))?;

        if self.is_holder(agent) {
            return Err(StoreError::AlreadyHolding(agent.clone()));
        }
        for id in &resources {
            if let Some(holder) = self.resources.get(id).and_then(|r| r.holder.as_ref()) {
                return Err(StoreError::ResourceBusy {
                    resource: id.clone(),
                    holder: holder.clone(),
                });
            }
        }

        for id in &resources {
            if let Some(resource) = self.resources.get_mut(id) {
                resource.holder = Some(agent.clone());
                resource.acquired_at = Some(now);
            }
        }
        self.remove_from_queues(agent);
        self.holders.insert(
            agent.clone(),
            HolderRecord {
                agent: agent.clone(),
                lane: lane.clone(),
                resources,
                acquired_at: now,
            },
        );
        Ok(())
    }

    /// Release whatever the agent holds; `None` if it held nothing
    pub fn release(&mut self, agent: &AgentId) -> Option<HolderRecord> {
        let record = self.holders.remove(agent)?;
        for id in &record.resources {
            if let Some(resource) = self.resources.get_mut(id) {
                resource.holder = None;
                resource.acquired_at = None;
            }
        }
        Some(record)
    }

    /// Purge the agent from every queue; returns whether it was queued
    pub fn remove_from_queues(&mut self, agent: &AgentId) -> bool {
        let mut removed = false;
        for queue in &mut self.queues {
            let before = queue.agents.len();
            queue.agents.retain(|a| a != agent);
            removed |= queue.agents.len() != before;
        }
        removed
    }

    /// Verify mutual exclusion, all-or-nothing holds and queue disjointness
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for resource in self.resources.values() {
            if let Some(holder) = &resource.holder {
                let matches = self
                    .holders
                    .get(holder)
                    .is_some_and(|h| h.resources.contains(&resource.id));
                if !matches {
                    return Err(InvariantViolation::OrphanOccupancy {
                        resource: resource.id.clone(),
                        holder: holder.clone(),
                    });
                }
            }
        }

        for record in self.holders.values() {
            let lane_matches = self
                .lanes
                .get(record.lane.as_str())
                .is_some_and(|l| l.resources == record.resources);
            if !lane_matches {
                return Err(InvariantViolation::LaneMismatch {
                    agent: record.agent.clone(),
                    lane: record.lane.clone(),
                });
            }
            for id in &record.resources {
                let occupied_by_holder = self
                    .resources
                    .get(id)
                    .is_some_and(|r| r.holder.as_ref() == Some(&record.agent));
                if !occupied_by_holder {
                    return Err(InvariantViolation::PartialHold {
                        agent: record.agent.clone(),
                        resource: id.clone(),
                    });
                }
            }
        }

        let mut seen = BTreeSet::new();
        for agent in self.queues.iter().flat_map(|q| q.agents.iter()) {
            if !seen.insert(agent) {
                return Err(InvariantViolation::DuplicateQueueEntry(agent.clone()));
            }
            if self.is_holder(agent) {
                return Err(InvariantViolation::QueuedHolder(agent.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
