// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat-file watchdog
//!
//! Writes the current time (RFC 3339) to a file. An external supervisor
//! restarts the controller when the timestamp goes stale.

use super::{WatchdogAdapter, WatchdogError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct FileWatchdog {
    path: PathBuf,
    interval: Duration,
    last_write: Arc<Mutex<Option<Instant>>>,
}

impl FileWatchdog {
    /// Writes at most once per `interval`; feeds in between are absorbed
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
            last_write: Arc::new(Mutex::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn due(&self, now: Instant) -> bool {
        let last = self.last_write.lock().unwrap_or_else(|e| e.into_inner());
        last.map_or(true, |at| now.saturating_duration_since(at) >= self.interval)
    }
}

#[async_trait]
impl WatchdogAdapter for FileWatchdog {
    async fn feed(&self) -> Result<(), WatchdogError> {
        let now = Instant::now();
        if !self.due(now) {
            return Ok(());
        }

        let write_err = |source| WatchdogError::Write {
            path: self.path.display().to_string(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        let stamp = format!("{}\n", chrono::Utc::now().to_rfc3339());
        tokio::fs::write(&self.path, stamp).await.map_err(write_err)?;

        *self.last_write.lock().unwrap_or_else(|e| e.into_inner()) = Some(now);
        tracing::trace!(path = %self.path.display(), "watchdog fed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
