// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! xc-core: Core library for Crossing Control (xc)
//!
//! This crate provides:
//! - Identity newtypes and the priority table
//! - The lane table and the arbitration state store
//! - The arbitration engine and timeout supervisor
//! - A pure controller that turns inbound events into effects
//! - Wire payload parsing and configuration

pub mod clock;
pub mod id;

pub mod config;
pub mod message;
pub mod priority;

// State and decision logic (order matters for dependencies)
pub mod lane;
pub mod store;
pub mod arbitration;
pub mod supervisor;
pub mod effect;
pub mod controller;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{Channels, ConfigError, ControllerConfig, LaneConfig, PriorityConfig, TimingConfig};
pub use controller::Controller;
pub use effect::{Effect, Event};
pub use id::{AgentId, LaneId, ResourceId};
pub use lane::{Lane, LaneTable};
pub use message::{MessageError, Reply, ReportEvent, ReportMessage, RequestMessage, Verdict};
pub use priority::{PriorityTable, Rank};
pub use store::{ArbitrationState, EnqueueOutcome, HolderRecord, InvariantViolation, StoreError};
pub use supervisor::TimeoutSupervisor;
