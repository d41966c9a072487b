// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `xc status` - show holders and queues from the retained snapshots

use std::fmt;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use xc_adapters::{BusMessage, ConnectOptions};
use xc_core::Channels;
use xc_storage::{parse_holders, parse_queues};

use crate::client::{ephemeral_id, timeout_snapshot, BusClient};
use crate::output::{self, OutputFormat};
use crate::Context;

#[derive(Args)]
pub struct StatusArgs {
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HolderView {
    pub agent: String,
    pub lane: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueView {
    pub lane: String,
    pub agents: Vec<String>,
}

/// What the retained snapshots say; `None` when a snapshot was never published
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Status {
    pub holders: Option<Vec<HolderView>>,
    pub queues: Option<Vec<QueueView>>,
}

impl Status {
    pub fn apply(&mut self, channels: &Channels, message: &BusMessage) {
        let Some(payload) = message.payload_str() else {
            return;
        };
        if message.topic == channels.holders {
            self.holders = Some(
                parse_holders(payload)
                    .items
                    .into_iter()
                    .map(|h| HolderView {
                        agent: h.agent.to_string(),
                        lane: h.lane.map(|l| l.to_string()),
                    })
                    .collect(),
            );
        } else if message.topic == channels.queues {
            self.queues = Some(
                parse_queues(payload)
                    .items
                    .into_iter()
                    .map(|g| QueueView {
                        lane: g.lane.to_string(),
                        agents: g.agents.iter().map(|a| a.to_string()).collect(),
                    })
                    .collect(),
            );
        }
    }

    fn complete(&self) -> bool {
        self.holders.is_some() && self.queues.is_some()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Holders:")?;
        match &self.holders {
            None => writeln!(f, "  (no snapshot)")?,
            Some(holders) if holders.is_empty() => writeln!(f, "  (none)")?,
            Some(holders) => {
                for holder in holders {
                    match &holder.lane {
                        Some(lane) => writeln!(f, "  {} in {}", holder.agent, lane)?,
                        None => writeln!(f, "  {}", holder.agent)?,
                    }
                }
            }
        }

        writeln!(f, "Queues:")?;
        match &self.queues {
            None => writeln!(f, "  (no snapshot)")?,
            Some(queues) => {
                for queue in queues {
                    let agents = if queue.agents.is_empty() {
                        "-".to_string()
                    } else {
                        queue.agents.join(", ")
                    };
                    writeln!(f, "  {}: {}", queue.lane, agents)?;
                }
            }
        }
        Ok(())
    }
}

/// Gather retained snapshots until both arrived or the wait ran out
pub async fn collect(
    channels: &Channels,
    inbox: &mut mpsc::UnboundedReceiver<BusMessage>,
    deadline: Instant,
) -> Status {
    let mut status = Status::default();
    while !status.complete() {
        match tokio::time::timeout_at(deadline, inbox.recv()).await {
            Ok(Some(message)) => status.apply(channels, &message),
            Ok(None) | Err(_) => break,
        }
    }
    status
}

pub async fn handle(args: StatusArgs, ctx: &Context) -> Result<()> {
    let (client, mut inbox) = BusClient::connect(
        &ctx.socket,
        ctx.channels.clone(),
        ConnectOptions::new(ephemeral_id()),
    )
    .await?;

    client.subscribe(&client.channels.holders).await?;
    client.subscribe(&client.channels.queues).await?;
    let status = collect(&client.channels, &mut inbox, Instant::now() + timeout_snapshot()).await;
    client.disconnect().await?;

    output::print(&status, args.format);
    Ok(())
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
