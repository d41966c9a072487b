// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: the message bus and the liveness watchdog

pub mod bus;
pub mod traced;
pub mod watchdog;

pub use bus::{
    topic_matches, validate_filter, BusAdapter, BusError, BusMessage, ConnectOptions, MemoryBroker,
    MemoryBus, Publication, SessionId,
};
pub use traced::{TracedBus, TracedWatchdog};
pub use watchdog::{FileWatchdog, NoOpWatchdog, WatchdogAdapter, WatchdogError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use bus::{BusCall, FakeBus};
#[cfg(any(test, feature = "test-support"))]
pub use watchdog::FakeWatchdog;
