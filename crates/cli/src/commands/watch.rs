// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `xc watch [filter]` - print bus traffic

use anyhow::Result;
use clap::Args;
use xc_adapters::{validate_filter, BusMessage, ConnectOptions};

use crate::client::{ephemeral_id, BusClient};
use crate::Context;

#[derive(Args)]
pub struct WatchArgs {
    /// Topic filter; `+` matches one level, `#` the rest
    #[arg(default_value = "#")]
    pub filter: String,

    /// Exit after this many messages
    #[arg(long)]
    pub count: Option<usize>,
}

/// One output line per message
pub fn format_message(message: &BusMessage) -> String {
    let payload = String::from_utf8_lossy(&message.payload);
    if message.retained {
        format!("{} {} (retained)", message.topic, payload)
    } else {
        format!("{} {}", message.topic, payload)
    }
}

pub async fn handle(args: WatchArgs, ctx: &Context) -> Result<()> {
    validate_filter(&args.filter)?;
    let (client, mut inbox) = BusClient::connect(
        &ctx.socket,
        ctx.channels.clone(),
        ConnectOptions::new(ephemeral_id()),
    )
    .await?;
    client.subscribe(&args.filter).await?;

    let mut seen = 0usize;
    loop {
        if args.count.is_some_and(|count| seen >= count) {
            break;
        }
        tokio::select! {
            message = inbox.recv() => {
                let Some(message) = message else {
                    anyhow::bail!("gateway closed the connection");
                };
                println!("{}", format_message(&message));
                seen += 1;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.disconnect().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_messages_print_topic_and_payload() {
        let message = BusMessage {
            topic: "cruce/respuesta".to_string(),
            payload: b"robot1:pasar".to_vec(),
            retained: false,
        };

        assert_eq!(format_message(&message), "cruce/respuesta robot1:pasar");
    }

    #[test]
    fn retained_messages_are_marked() {
        let message = BusMessage {
            topic: "cruce/reportes".to_string(),
            payload: b"controlador:online".to_vec(),
            retained: true,
        };

        assert_eq!(
            format_message(&message),
            "cruce/reportes controlador:online (retained)"
        );
    }
}
