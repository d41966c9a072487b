// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Arbitration controller
//!
//! Owns the arbitration state and turns one event at a time into state
//! changes plus the effects that announce them. Nothing here performs I/O;
//! the engine crate executes the returned effects in order.

use crate::arbitration::{ArbitrationEngine, Grant};
use crate::clock::Clock;
use crate::config::{ConfigError, ControllerConfig};
use crate::effect::{Effect, Event};
use crate::id::AgentId;
use crate::lane::LaneTable;
use crate::message::{Reply, ReportEvent, ReportMessage, RequestMessage, Verdict};
use crate::priority::PriorityTable;
use crate::store::{ArbitrationState, EnqueueOutcome};
use crate::supervisor::TimeoutSupervisor;
use std::time::Duration;

pub struct Controller<C: Clock> {
    engine: ArbitrationEngine,
    supervisor: TimeoutSupervisor,
    state: ArbitrationState,
    clock: C,
    reply_wait: bool,
}

impl<C: Clock> Controller<C> {
    pub fn new(lanes: LaneTable, priorities: PriorityTable, max_hold: Duration, clock: C) -> Self {
        Self {
            engine: ArbitrationEngine::new(priorities),
            supervisor: TimeoutSupervisor::new(max_hold),
            state: ArbitrationState::new(lanes),
            clock,
            reply_wait: false,
        }
    }

    pub fn from_config(config: &ControllerConfig, clock: C) -> Result<Self, ConfigError> {
        let controller = Self::new(
            config.lane_table()?,
            config.priority_table(),
            config.timing.max_crossing,
            clock,
        );
        Ok(controller.with_reply_wait(config.reply_wait))
    }

    /// Also answer `esperar` to agents that end up queued
    pub fn with_reply_wait(mut self, reply_wait: bool) -> Self {
        self.reply_wait = reply_wait;
        self
    }

    pub fn state(&self) -> &ArbitrationState {
        &self.state
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn engine(&self) -> &ArbitrationEngine {
        &self.engine
    }

    /// Swap in a restored state
    pub fn replace_state(&mut self, state: ArbitrationState) {
        self.state = state;
    }

    /// Apply one event and return the effects to execute, in order
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Request(request) => self.on_request(request),
            Event::Report(report) => self.on_report(report),
            Event::ResyncObserved => Vec::new(),
            Event::Tick => self.on_tick(),
        }
    }

    /// Grant everything grantable, then publish a fresh snapshot
    pub fn settle(&mut self) -> Vec<Effect> {
        let mut effects = self.saturate();
        effects.push(Effect::PublishSnapshot);
        effects
    }

    fn on_request(&mut self, request: RequestMessage) -> Vec<Effect> {
        let RequestMessage { agent, lane } = request;

        let outcome = self.state.enqueue(&lane, &agent);
        match &outcome {
            EnqueueOutcome::UnknownLane => {
                tracing::warn!(%agent, %lane, "request for unknown lane dropped");
                return Vec::new();
            }
            EnqueueOutcome::Holding => {
                tracing::debug!(%agent, "request from current holder ignored");
                return Vec::new();
            }
            EnqueueOutcome::AlreadyQueued => {
                tracing::debug!(%agent, %lane, "duplicate request");
            }
            EnqueueOutcome::Moved { from } => {
                tracing::info!(%agent, %from, to = %lane, "agent moved to another lane");
            }
            EnqueueOutcome::Queued => {
                tracing::info!(%agent, %lane, "agent queued");
            }
        }

        let mut effects = self.saturate();
        if effects.is_empty() && outcome != EnqueueOutcome::AlreadyQueued {
            // queues changed even though nothing was granted
            effects.push(Effect::PublishSnapshot);
        }
        if self.reply_wait && self.state.queued_lane(&agent).is_some() {
            effects.push(Effect::Reply(Reply::new(agent, Verdict::Wait)));
        }
        effects
    }

    fn on_report(&mut self, report: ReportMessage) -> Vec<Effect> {
        let ReportMessage { agent, event } = report;
        if !event.ends_participation() {
            tracing::info!(%agent, %event, "report");
            return Vec::new();
        }
        self.withdraw(&agent, event)
    }

    /// Release a holder or purge a queued agent
    fn withdraw(&mut self, agent: &AgentId, event: ReportEvent) -> Vec<Effect> {
        if let Some(record) = self.state.release(agent) {
            tracing::info!(%agent, lane = %record.lane, %event, "lane released");
            let mut effects = vec![Effect::PublishSnapshot];
            effects.extend(self.saturate());
            return effects;
        }

        if self.state.remove_from_queues(agent) {
            tracing::info!(%agent, %event, "agent left the queue");
            return vec![Effect::PublishSnapshot];
        }

        tracing::debug!(%agent, %event, "report from unknown agent");
        Vec::new()
    }

    fn on_tick(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();

        for agent in self.supervisor.expired(&self.state, &self.clock) {
            tracing::warn!(%agent, max_hold = ?self.supervisor.max_hold(), "holder evicted");
            effects.push(Effect::Reply(Reply::new(agent.clone(), Verdict::Expelled)));
            effects.push(Effect::Report(ReportMessage::new(agent.clone(), ReportEvent::TimedOut)));
            self.state.release(&agent);
            effects.push(Effect::PublishSnapshot);
        }

        if !effects.is_empty() {
            effects.extend(self.saturate());
        }
        effects
    }

    fn saturate(&mut self) -> Vec<Effect> {
        let grants = self.engine.saturate(&mut self.state, self.clock.now());
        grants
            .into_iter()
            .flat_map(|Grant { agent, lane }| {
                tracing::info!(%agent, %lane, "lane granted");
                [Effect::Reply(Reply::new(agent, Verdict::Pass)), Effect::PublishSnapshot]
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
