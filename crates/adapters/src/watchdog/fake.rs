// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake watchdog for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{WatchdogAdapter, WatchdogError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts feeds
#[derive(Clone, Debug, Default)]
pub struct FakeWatchdog {
    feeds: Arc<AtomicUsize>,
}

impl FakeWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feeds(&self) -> usize {
        self.feeds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WatchdogAdapter for FakeWatchdog {
    async fn feed(&self) -> Result<(), WatchdogError> {
        self.feeds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
