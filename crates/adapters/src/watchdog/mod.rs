// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness watchdog adapters
//!
//! The controller feeds the watchdog from its event loop. If feeding stops
//! for longer than the supervisor's tolerance, the supervisor is expected to
//! restart the process.

mod file;
mod noop;

pub use file::FileWatchdog;
pub use noop::NoOpWatchdog;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeWatchdog;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from watchdog operations
#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error("failed to write heartbeat {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Adapter for an external liveness monitor
#[async_trait]
pub trait WatchdogAdapter: Clone + Send + Sync + 'static {
    /// Signal that the event loop is alive
    async fn feed(&self) -> Result<(), WatchdogError>;
}
