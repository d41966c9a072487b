// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Crossing Control daemon library
//!
//! The broker gateway (server side, wire protocol) and [`GatewayBus`], the
//! bus adapter that `xc` and remote-mode `xcd` use to reach it.

mod gateway;
pub mod protocol;
pub mod server;
pub mod settings;

pub use gateway::GatewayBus;
pub use protocol::{ClientFrame, ProtocolError, ServerFrame, PROTOCOL_VERSION};
pub use settings::{BrokerMode, DaemonSettings, SettingsError};
