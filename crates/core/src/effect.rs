// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events fed to the controller and the effects it requests

use crate::message::{Reply, ReportMessage, RequestMessage};

/// The inputs the dispatcher serializes into the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `<agent>:<lane>` arrived on the request channel
    Request(RequestMessage),
    /// `<agent>:<event>` arrived on the report channel
    Report(ReportMessage),
    /// Our own resync broadcast came back; agents act on it, we do not
    ResyncObserved,
    /// Periodic scheduling tick
    Tick,
}

impl Event {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Event::Request(_) => "request",
            Event::Report(_) => "report",
            Event::ResyncObserved => "resync",
            Event::Tick => "tick",
        }
    }
}

/// Side effects the controller asks the executor to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Publish a verdict on the reply channel
    Reply(Reply),
    /// Publish a report attributed to an agent
    Report(ReportMessage),
    /// Publish both state snapshots from the current state
    PublishSnapshot,
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::Reply(_) => "reply",
            Effect::Report(_) => "report",
            Effect::PublishSnapshot => "publish_snapshot",
        }
    }
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;
