// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Arbitration engine
//!
//! Greedy scheduling policy, run to a fixed point after every mutation:
//!
//! 1. The head of a lane is its waiting agent with the lowest rank; ties go
//!    to the earliest arrival.
//! 2. Guarded lanes (the combined lane in the standard layout) come first.
//!    One is granted only when all of its resources are free and its head
//!    strictly outranks the head of every lane needing a subset of them.
//! 3. Otherwise the first unguarded lane whose resources are free is granted
//!    to its head.
//!
//! The policy is not starvation-free: a guarded lane whose head does not
//! outrank the smaller lanes waits as long as they keep the resources busy.

use crate::id::{AgentId, LaneId};
use crate::lane::Lane;
use crate::priority::{PriorityTable, Rank};
use crate::store::ArbitrationState;
use std::time::Instant;

/// A lane handed to an agent by the engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grant {
    pub agent: AgentId,
    pub lane: LaneId,
}

/// Decides which waiting agents are granted which lanes
#[derive(Clone, Debug, Default)]
pub struct ArbitrationEngine {
    priorities: PriorityTable,
}

impl ArbitrationEngine {
    pub fn new(priorities: PriorityTable) -> Self {
        Self { priorities }
    }

    pub fn priorities(&self) -> &PriorityTable {
        &self.priorities
    }

    /// Head of a lane's queue and its rank
    pub fn head<'s>(&self, state: &'s ArbitrationState, lane: &str) -> Option<(&'s AgentId, Rank)> {
        state
            .queue(lane)
            .iter()
            .map(|agent| (agent, self.priorities.rank(agent)))
            // min_by_key keeps the first of equal minima, i.e. the earliest arrival
            .min_by_key(|(_, rank)| *rank)
    }

    /// One pass of the policy: the next grant, if any is possible
    pub fn next_grant(&self, state: &ArbitrationState) -> Option<Grant> {
        let lanes = state.lanes();

        for lane in lanes.guarded() {
            if let Some(grant) = self.guarded_grant(state, lane) {
                return Some(grant);
            }
        }

        lanes.unguarded().into_iter().find_map(|lane| {
            let (agent, _) = self.head(state, lane.id.as_str())?;
            state.is_lane_free(lane.id.as_str()).then(|| Grant {
                agent: agent.clone(),
                lane: lane.id.clone(),
            })
        })
    }

    fn guarded_grant(&self, state: &ArbitrationState, lane: &Lane) -> Option<Grant> {
        let (agent, rank) = self.head(state, lane.id.as_str())?;
        if !state.is_lane_free(lane.id.as_str()) {
            return None;
        }

        // lanes with nobody waiting never block
        let outranks_subsets = state
            .lanes()
            .strict_subsets(lane)
            .all(|sub| self.head(state, sub.id.as_str()).map_or(true, |(_, r)| rank < r));

        outranks_subsets.then(|| Grant {
            agent: agent.clone(),
            lane: lane.id.clone(),
        })
    }

    /// Grant repeatedly until a pass grants nothing
    ///
    /// Every grant removes one agent from the queues, so at most
    /// `queued + 1` passes run.
    pub fn saturate(&self, state: &mut ArbitrationState, now: Instant) -> Vec<Grant> {
        let max_passes = state.queued_len() + 1;
        let mut grants = Vec::new();

        for _ in 0..max_passes {
            let Some(grant) = self.next_grant(state) else {
                break;
            };
            if let Err(e) = state.grant(&grant.lane, &grant.agent, now) {
                tracing::error!(agent = %grant.agent, lane = %grant.lane, error = %e, "engine proposed an impossible grant");
                break;
            }
            grants.push(grant);
        }

        grants
    }
}

#[cfg(test)]
#[path = "arbitration_tests.rs"]
mod tests;
