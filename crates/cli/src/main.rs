// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! xc - Crossing Control agent CLI
//!
//! Talks to the controller's broker through the `xcd` gateway socket.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod error;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{cross, report, request, status, watch};
use xc_core::Channels;

use crate::client::{default_socket_path, load_channels, ClientError};
use crate::error::XcError;

#[derive(Parser)]
#[command(
    name = "xc",
    version,
    about = "Crossing Control - agent client for the crossing controller"
)]
struct Cli {
    /// Gateway socket of a running xcd
    #[arg(long, global = true, env = "XC_SOCKET")]
    socket: Option<PathBuf>,

    /// Controller config file, for non-default channel topics
    #[arg(long, global = true, env = "XC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask for a lane once
    Request(request::RequestArgs),
    /// Publish an agent report
    Report(report::ReportArgs),
    /// Show holders and queues
    Status(status::StatusArgs),
    /// Print bus traffic matching a topic filter
    Watch(watch::WatchArgs),
    /// Run an agent through the crossing
    Cross(cross::CrossArgs),
}

/// Resolved connection settings shared by every command
pub struct Context {
    pub socket: PathBuf,
    pub channels: Channels,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    let ctx = Context {
        socket: cli.socket.map_or_else(default_socket_path, Ok)?,
        channels: load_channels(cli.config.as_deref())?,
    };

    let result = match cli.command {
        Commands::Request(args) => request::handle(args, &ctx).await,
        Commands::Report(args) => report::handle(args, &ctx).await,
        Commands::Status(args) => status::handle(args, &ctx).await,
        Commands::Watch(args) => watch::handle(args, &ctx).await,
        Commands::Cross(args) => cross::handle(args, &ctx).await,
    };

    result.map_err(|e| match e.downcast_ref::<ClientError>() {
        Some(ClientError::GatewayNotRunning(path)) => XcError::gateway_unreachable(path).into(),
        _ => e,
    })
}

fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
