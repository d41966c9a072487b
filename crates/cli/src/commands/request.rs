// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `xc request <agent> <lane>` - ask for a lane once

use anyhow::Result;
use clap::Args;
use xc_adapters::{ConnectOptions, Publication};
use xc_core::RequestMessage;

use crate::client::{ephemeral_id, BusClient};
use crate::Context;

#[derive(Args)]
pub struct RequestArgs {
    /// Agent id, e.g. robot1
    pub agent: String,
    /// Lane name, e.g. vertical_A
    pub lane: String,
}

pub async fn handle(args: RequestArgs, ctx: &Context) -> Result<()> {
    let message = RequestMessage::new(args.agent.as_str(), args.lane.as_str());
    let (client, _inbox) = BusClient::connect(
        &ctx.socket,
        ctx.channels.clone(),
        ConnectOptions::new(ephemeral_id()),
    )
    .await?;

    client
        .publish(Publication::new(client.channels.request.clone(), message.to_string()).reliable())
        .await?;
    client.disconnect().await?;

    println!("Requested: {}", message);
    Ok(())
}
