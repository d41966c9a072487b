// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State restoration from retained snapshots
//!
//! Restoration never trusts the payloads: holders are re-granted through
//! the store, so a snapshot that would break mutual exclusion or the
//! all-or-nothing rule loses the offending entries instead.

use crate::snapshot::{parse_holders, parse_queues, HolderEntry, SnapshotError};
use std::time::Instant;
use xc_core::{AgentId, ArbitrationState, LaneId, StoreError};

/// An entry restoration refused to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dropped {
    Malformed(SnapshotError),
    /// Bare holder entry next to entries that do name lanes
    NoLane(AgentId),
    UnknownLane { agent: Option<AgentId>, lane: LaneId },
    /// Holder entry that conflicts with one restored before it
    Conflict { agent: AgentId, lane: LaneId, error: StoreError },
    /// Queue entry for an agent restored as holder
    QueuedHolder { agent: AgentId, lane: LaneId },
    /// Queue entry for an agent already queued in an earlier group
    DuplicateQueued { agent: AgentId, lane: LaneId },
}

/// What restoration did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// The holder snapshot named agents but implied no occupied resource
    pub stale_holders: bool,
    /// No holder payload arrived; in-memory holders were kept
    pub holders_kept: bool,
    /// No queue payload arrived; in-memory queues were kept
    pub queues_kept: bool,
    pub dropped: Vec<Dropped>,
}

#[derive(Debug, Clone)]
pub struct Restored {
    pub state: ArbitrationState,
    pub report: RestoreReport,
}

/// Rebuild the arbitration state from the retained payloads
///
/// `None` means the broker delivered nothing for that channel within the
/// wait window, in which case the matching part of `previous` is kept. A
/// restored holder keeps its acquisition instant if it already held the
/// same lane in `previous`; otherwise its timer starts at `now`.
pub fn restore(
    previous: &ArbitrationState,
    holders: Option<&str>,
    queues: Option<&str>,
    now: Instant,
) -> Restored {
    let mut restorer = Restorer {
        previous,
        state: ArbitrationState::new(previous.lanes().clone()),
        report: RestoreReport::default(),
        now,
    };

    match holders {
        Some(payload) => restorer.apply_holders(payload),
        None => {
            restorer.report.holders_kept = true;
            restorer.keep_holders();
        }
    }
    match queues {
        Some(payload) => restorer.apply_queues(payload),
        None => {
            restorer.report.queues_kept = true;
            restorer.keep_queues();
        }
    }

    for dropped in &restorer.report.dropped {
        tracing::warn!(?dropped, "snapshot entry dropped");
    }

    Restored {
        state: restorer.state,
        report: restorer.report,
    }
}

struct Restorer<'a> {
    previous: &'a ArbitrationState,
    state: ArbitrationState,
    report: RestoreReport,
    now: Instant,
}

impl Restorer<'_> {
    fn apply_holders(&mut self, payload: &str) {
        let parsed = parse_holders(payload);
        self.report
            .dropped
            .extend(parsed.rejected.into_iter().map(Dropped::Malformed));

        let entries = parsed.items;
        if entries.is_empty() {
            return;
        }

        // occupancy must follow from the entries themselves
        let implies_occupancy = entries.iter().any(|e| {
            e.lane
                .as_ref()
                .and_then(|l| self.state.lanes().get(l.as_str()))
                .is_some()
        });
        if !implies_occupancy {
            tracing::warn!(payload, "holder snapshot implies no occupied resource, discarding");
            self.report.stale_holders = true;
            return;
        }

        for entry in entries {
            self.restore_holder(entry);
        }
    }

    fn restore_holder(&mut self, entry: HolderEntry) {
        let HolderEntry { agent, lane } = entry;
        let Some(lane) = lane else {
            self.report.dropped.push(Dropped::NoLane(agent));
            return;
        };
        if self.state.lanes().get(lane.as_str()).is_none() {
            self.report.dropped.push(Dropped::UnknownLane {
                agent: Some(agent),
                lane,
            });
            return;
        }

        let acquired_at = self
            .previous
            .holder(&agent)
            .filter(|h| h.lane == lane)
            .map_or(self.now, |h| h.acquired_at);

        if let Err(error) = self.state.grant(&lane, &agent, acquired_at) {
            self.report.dropped.push(Dropped::Conflict { agent, lane, error });
        }
    }

    fn keep_holders(&mut self) {
        for record in self.previous.holders() {
            if let Err(error) = self.state.grant(&record.lane, &record.agent, record.acquired_at) {
                self.report.dropped.push(Dropped::Conflict {
                    agent: record.agent.clone(),
                    lane: record.lane.clone(),
                    error,
                });
            }
        }
    }

    fn apply_queues(&mut self, payload: &str) {
        let parsed = parse_queues(payload);
        self.report
            .dropped
            .extend(parsed.rejected.into_iter().map(Dropped::Malformed));

        for group in parsed.items {
            if self.state.lanes().get(group.lane.as_str()).is_none() {
                self.report.dropped.push(Dropped::UnknownLane {
                    agent: None,
                    lane: group.lane,
                });
                continue;
            }
            for agent in group.agents {
                self.restore_queued(&group.lane, agent);
            }
        }
    }

    fn keep_queues(&mut self) {
        for queue in self.previous.queues() {
            for agent in &queue.agents {
                self.restore_queued(&queue.lane, agent.clone());
            }
        }
    }

    fn restore_queued(&mut self, lane: &LaneId, agent: AgentId) {
        if self.state.is_holder(&agent) {
            self.report.dropped.push(Dropped::QueuedHolder {
                agent,
                lane: lane.clone(),
            });
            return;
        }
        // enqueue would move the agent; the earlier group wins instead
        if self.state.queued_lane(&agent).is_some() {
            self.report.dropped.push(Dropped::DuplicateQueued {
                agent,
                lane: lane.clone(),
            });
            return;
        }
        self.state.enqueue(lane, &agent);
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
