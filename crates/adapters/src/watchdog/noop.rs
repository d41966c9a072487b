// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op watchdog for deployments without an external supervisor.

use super::{WatchdogAdapter, WatchdogError};
use async_trait::async_trait;

/// Watchdog that does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpWatchdog;

impl NoOpWatchdog {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WatchdogAdapter for NoOpWatchdog {
    async fn feed(&self) -> Result<(), WatchdogError> {
        Ok(())
    }
}
