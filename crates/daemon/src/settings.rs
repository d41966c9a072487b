// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `[daemon]` table of the controller config file
//!
//! The controller tables are read by `xc-core`; this module only picks up
//! what the process itself needs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid [daemon] table: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("daemon.watchdog_interval must be greater than zero")]
    ZeroWatchdogInterval,
    #[error("daemon.mode = \"remote\" needs daemon.socket")]
    RemoteWithoutSocket,
}

/// Where the broker lives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerMode {
    /// Host the broker and serve it on the gateway socket
    #[default]
    Embedded,
    /// Join the broker of another `xcd` through its gateway socket
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// Gateway socket; defaults to `<state dir>/gateway.sock`
    pub socket: Option<PathBuf>,
    pub mode: BrokerMode,
    /// Heartbeat file for an external supervisor; no watchdog when unset
    pub watchdog_file: Option<PathBuf>,
    #[serde(with = "humantime_serde")]
    pub watchdog_interval: Duration,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            socket: None,
            mode: BrokerMode::Embedded,
            watchdog_file: None,
            watchdog_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Deserialize)]
struct DaemonFile {
    #[serde(default)]
    daemon: DaemonSettings,
}

impl DaemonSettings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse the `[daemon]` table, ignoring every other table
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let file: DaemonFile = toml::from_str(content)?;
        let settings = file.daemon;
        if settings.watchdog_interval.is_zero() {
            return Err(SettingsError::ZeroWatchdogInterval);
        }
        if settings.mode == BrokerMode::Remote && settings.socket.is_none() {
            return Err(SettingsError::RemoteWithoutSocket);
        }
        Ok(settings)
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
