// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller configuration
//!
//! Loaded once from TOML at process start. Durations use humantime syntax
//! (`"10s"`, `"100ms"`). Tables that are absent fall back to the standard
//! two-resource, three-lane layout.

mod channels;

pub use channels::Channels;

use crate::id::{AgentId, LaneId};
use crate::lane::{Lane, LaneError, LaneTable};
use crate::priority::{PriorityTable, Rank, DEFAULT_RANK};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Lanes(#[from] LaneError),
    #[error("timing.{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("controller_id must not be empty")]
    EmptyControllerId,
    #[error("channels.{0} must not be empty")]
    EmptyChannel(&'static str),
}

/// Timing knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Longest a holder may keep its lane before eviction
    #[serde(with = "humantime_serde")]
    pub max_crossing: Duration,
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    /// Fixed delay between reconnect attempts
    #[serde(with = "humantime_serde")]
    pub reconnect_backoff: Duration,
    /// How long recovery waits for each retained snapshot
    #[serde(with = "humantime_serde")]
    pub recovery_wait: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            max_crossing: Duration::from_secs(10),
            tick_interval: Duration::from_millis(100),
            reconnect_backoff: Duration::from_secs(5),
            recovery_wait: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    pub default_rank: u32,
    pub ranks: BTreeMap<String, u32>,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            default_rank: DEFAULT_RANK.0,
            ranks: [("robot1", 1), ("robot2", 2), ("robot3", 3), ("robot4", 4)]
                .into_iter()
                .map(|(agent, rank)| (agent.to_string(), rank))
                .collect(),
        }
    }
}

/// One `[[lane]]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneConfig {
    pub name: String,
    pub resources: Vec<String>,
}

impl LaneConfig {
    pub fn new(name: &str, resources: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            resources: resources.iter().map(|r| r.to_string()).collect(),
        }
    }
}

fn standard_lanes() -> Vec<LaneConfig> {
    vec![
        LaneConfig::new("vertical_A", &["I1"]),
        LaneConfig::new("vertical_B", &["I2"]),
        LaneConfig::new("horizontal", &["I1", "I2"]),
    ]
}

fn default_controller_id() -> String {
    "controlador".to_string()
}

/// Everything the controller needs to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Client id on the bus and agent id of the controller's own reports
    #[serde(default = "default_controller_id")]
    pub controller_id: String,
    /// Tell queued agents to wait instead of staying silent
    #[serde(default)]
    pub reply_wait: bool,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub priorities: PriorityConfig,
    #[serde(default)]
    pub channels: Channels,
    #[serde(rename = "lane", default = "standard_lanes")]
    pub lanes: Vec<LaneConfig>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            controller_id: default_controller_id(),
            reply_wait: false,
            timing: TimingConfig::default(),
            priorities: PriorityConfig::default(),
            channels: Channels::default(),
            lanes: standard_lanes(),
        }
    }
}

impl ControllerConfig {
    /// Read, parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML text; unknown tables are ignored
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.controller_id.trim().is_empty() {
            return Err(ConfigError::EmptyControllerId);
        }

        let timing = &self.timing;
        for (name, value) in [
            ("max_crossing", timing.max_crossing),
            ("tick_interval", timing.tick_interval),
            ("reconnect_backoff", timing.reconnect_backoff),
            ("recovery_wait", timing.recovery_wait),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroDuration(name));
            }
        }

        self.channels.validate()?;
        self.lane_table()?;
        Ok(())
    }

    pub fn lane_table(&self) -> Result<LaneTable, LaneError> {
        LaneTable::new(
            self.lanes
                .iter()
                .map(|l| Lane::new(LaneId::new(&l.name), l.resources.iter().map(String::as_str)))
                .collect(),
        )
    }

    pub fn priority_table(&self) -> PriorityTable {
        self.priorities
            .ranks
            .iter()
            .fold(PriorityTable::new(Rank(self.priorities.default_rank)), |table, (agent, rank)| {
                table.with_rank(AgentId::new(agent), *rank)
            })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
