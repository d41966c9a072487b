// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus topics for every logical channel

use super::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Channels {
    /// Agents ask for a lane here
    pub request: String,
    /// Verdicts addressed to agents
    pub reply: String,
    pub report: String,
    /// Retained holder snapshot
    pub holders: String,
    /// Retained queue snapshot
    pub queues: String,
    /// Resync broadcast asking agents to re-announce
    pub resync: String,
    pub resync_token: String,
}

impl Default for Channels {
    fn default() -> Self {
        Self {
            request: "cruce/solicitud".to_string(),
            reply: "cruce/respuesta".to_string(),
            report: "cruce/reportes".to_string(),
            holders: "cruce/estado/active_robot".to_string(),
            queues: "cruce/estado/cola".to_string(),
            resync: "robots/solicitar_estado".to_string(),
            resync_token: "reanunciar".to_string(),
        }
    }
}

impl Channels {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("request", &self.request),
            ("reply", &self.reply),
            ("report", &self.report),
            ("holders", &self.holders),
            ("queues", &self.queues),
            ("resync", &self.resync),
            ("resync_token", &self.resync_token),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyChannel(name));
            }
        }
        Ok(())
    }

    /// Topics the controller consumes during normal dispatch
    pub fn inbound(&self) -> [&str; 3] {
        [&self.request, &self.report, &self.resync]
    }
}
