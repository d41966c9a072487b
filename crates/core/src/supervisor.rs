// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timeout supervisor
//!
//! Finds holders that have kept their lane longer than the maximum crossing
//! time. The controller turns each one into an eviction.

use crate::clock::Clock;
use crate::id::AgentId;
use crate::store::ArbitrationState;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeoutSupervisor {
    max_hold: Duration,
}

impl TimeoutSupervisor {
    pub fn new(max_hold: Duration) -> Self {
        Self { max_hold }
    }

    pub fn max_hold(&self) -> Duration {
        self.max_hold
    }

    /// Holders whose hold time strictly exceeds the maximum, oldest first
    pub fn expired(&self, state: &ArbitrationState, clock: &impl Clock) -> Vec<AgentId> {
        let mut expired: Vec<_> = state
            .holders()
            .filter(|h| clock.elapsed_since(h.acquired_at) > self.max_hold)
            .collect();
        expired.sort_by_key(|h| h.acquired_at);
        expired.into_iter().map(|h| h.agent.clone()).collect()
    }
}
