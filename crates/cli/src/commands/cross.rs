// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `xc cross <agent> <lane>` - play one agent through the crossing
//!
//! Announces presence, requests the lane and waits for `pasar`, re-requesting
//! on every resync broadcast and optionally on a timer. After the hold it
//! reports arrival and release.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use xc_adapters::{BusAdapter, BusError, BusMessage, ConnectOptions, Publication};
use xc_core::{
    AgentId, Channels, LaneId, Reply, ReportEvent, ReportMessage, RequestMessage, Verdict,
};

use crate::client::BusClient;
use crate::commands::report::publication;
use crate::error::XcError;
use crate::Context;

#[derive(Args)]
pub struct CrossArgs {
    /// Agent id, e.g. robot1
    pub agent: String,
    /// Lane name, e.g. horizontal
    pub lane: String,

    /// Time spent in the crossing once granted
    #[arg(long, value_parser = humantime::parse_duration, default_value = "2s")]
    pub hold: Duration,

    /// Re-send the request at this interval while waiting
    #[arg(long, value_parser = humantime::parse_duration)]
    pub resend: Option<Duration>,
}

/// How a crossing attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Crossed,
    Expelled,
}

/// One agent's crossing attempt
pub struct Crossing {
    pub agent: AgentId,
    pub lane: LaneId,
    pub channels: Channels,
    pub hold: Duration,
    pub resend: Option<Duration>,
}

impl Crossing {
    /// Last will for the agent's session
    pub fn connect_options(&self) -> ConnectOptions {
        let offline = ReportMessage::new(self.agent.clone(), ReportEvent::Offline);
        ConnectOptions::new(self.agent.as_str())
            .with_last_will(publication(&self.channels.report, &offline))
    }

    fn report(&self, event: ReportEvent) -> Publication {
        publication(
            &self.channels.report,
            &ReportMessage::new(self.agent.clone(), event),
        )
    }

    fn request(&self) -> Publication {
        let message = RequestMessage::new(self.agent.clone(), self.lane.clone());
        Publication::new(self.channels.request.clone(), message.to_string()).reliable()
    }

    /// The verdict addressed to this agent, if `message` carries one
    fn verdict(&self, message: &BusMessage) -> Option<Verdict> {
        if message.topic != self.channels.reply {
            return None;
        }
        let reply = Reply::parse(message.payload_str()?).ok()?;
        (reply.agent == self.agent).then_some(reply.verdict)
    }

    fn is_resync(&self, message: &BusMessage) -> bool {
        message.topic == self.channels.resync
            && message.payload_str() == Some(self.channels.resync_token.as_str())
    }

    /// Run the attempt on a connected bus
    pub async fn run<B: BusAdapter>(
        &self,
        bus: &B,
        inbox: &mut mpsc::UnboundedReceiver<BusMessage>,
    ) -> Result<Outcome, BusError> {
        bus.subscribe(&self.channels.reply).await?;
        bus.subscribe(&self.channels.resync).await?;
        bus.publish(self.report(ReportEvent::Online)).await?;
        bus.publish(self.request()).await?;

        if self.wait_for_grant(bus, inbox).await? == Outcome::Expelled {
            return self.acknowledge_expulsion(bus).await;
        }
        println!("{}: pasar", self.agent);

        let hold = tokio::time::sleep(self.hold);
        tokio::pin!(hold);
        loop {
            tokio::select! {
                () = &mut hold => break,
                message = inbox.recv() => {
                    let message = message.ok_or_else(gateway_closed)?;
                    if self.verdict(&message) == Some(Verdict::Expelled) {
                        return self.acknowledge_expulsion(bus).await;
                    }
                }
            }
        }

        bus.publish(self.report(ReportEvent::Arrived)).await?;
        bus.publish(self.report(ReportEvent::Released)).await?;
        bus.publish(self.report(ReportEvent::Offline)).await?;
        println!("{}: crossed {}", self.agent, self.lane);
        Ok(Outcome::Crossed)
    }

    async fn wait_for_grant<B: BusAdapter>(
        &self,
        bus: &B,
        inbox: &mut mpsc::UnboundedReceiver<BusMessage>,
    ) -> Result<Outcome, BusError> {
        // Without --resend the timer never fires
        let period = self.resend.unwrap_or(Duration::from_secs(3600));
        let mut resend = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        resend.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                message = inbox.recv() => {
                    let message = message.ok_or_else(gateway_closed)?;
                    match self.verdict(&message) {
                        Some(Verdict::Pass) => return Ok(Outcome::Crossed),
                        Some(Verdict::Expelled) => return Ok(Outcome::Expelled),
                        Some(Verdict::Wait) => println!("{}: esperar", self.agent),
                        None if self.is_resync(&message) => {
                            tracing::info!(agent = %self.agent, "resync requested, re-sending request");
                            bus.publish(self.request()).await?;
                        }
                        None => {}
                    }
                }
                _ = resend.tick(), if self.resend.is_some() => {
                    tracing::debug!(agent = %self.agent, "re-sending request");
                    bus.publish(self.request()).await?;
                }
            }
        }
    }

    async fn acknowledge_expulsion<B: BusAdapter>(&self, bus: &B) -> Result<Outcome, BusError> {
        println!("{}: expulsado", self.agent);
        bus.publish(self.report(ReportEvent::Expelled)).await?;
        Ok(Outcome::Expelled)
    }
}

fn gateway_closed() -> BusError {
    BusError::ConnectionLost("gateway closed the connection".to_string())
}

pub async fn handle(args: CrossArgs, ctx: &Context) -> Result<()> {
    let crossing = Crossing {
        agent: AgentId::new(&args.agent),
        lane: LaneId::new(&args.lane),
        channels: ctx.channels.clone(),
        hold: args.hold,
        resend: args.resend,
    };

    let (client, mut inbox) =
        BusClient::connect(&ctx.socket, ctx.channels.clone(), crossing.connect_options()).await?;
    let outcome = crossing.run(client.bus(), &mut inbox).await?;
    client.disconnect().await?;

    match outcome {
        Outcome::Crossed => Ok(()),
        Outcome::Expelled => Err(XcError::expelled(&args.agent).into()),
    }
}

#[cfg(test)]
#[path = "cross_tests.rs"]
mod tests;
