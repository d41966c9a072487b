// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `xc report <agent> <event>` - publish one agent report

use anyhow::Result;
use clap::Args;
use xc_adapters::{ConnectOptions, Publication};
use xc_core::{ReportEvent, ReportMessage};

use crate::client::{ephemeral_id, BusClient};
use crate::Context;

#[derive(Args)]
pub struct ReportArgs {
    /// Agent id, e.g. robot1
    pub agent: String,
    /// cruce_liberado, llego, timeout, online, offline or expulsado
    #[arg(value_parser = parse_event)]
    pub event: ReportEvent,
}

fn parse_event(s: &str) -> Result<ReportEvent, String> {
    s.parse().map_err(|e: xc_core::MessageError| e.to_string())
}

/// Report publication; presence events are retained
pub fn publication(topic: &str, message: &ReportMessage) -> Publication {
    let publication = Publication::new(topic, message.to_string()).reliable();
    if message.event.is_durable() {
        publication.retained()
    } else {
        publication
    }
}

pub async fn handle(args: ReportArgs, ctx: &Context) -> Result<()> {
    let message = ReportMessage::new(args.agent.as_str(), args.event);
    let (client, _inbox) = BusClient::connect(
        &ctx.socket,
        ctx.channels.clone(),
        ConnectOptions::new(ephemeral_id()),
    )
    .await?;

    client
        .publish(publication(&client.channels.report, &message))
        .await?;
    client.disconnect().await?;

    println!("Reported: {}", message);
    Ok(())
}
