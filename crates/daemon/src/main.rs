// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crossing Control Daemon (xcd)
//!
//! Runs the arbitration controller against a bus. In embedded mode it also
//! hosts the broker and serves it to agents over the gateway socket.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod lifecycle;

use std::future::Future;
use std::path::PathBuf;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use xc_adapters::{
    BusAdapter, FileWatchdog, MemoryBroker, MemoryBus, NoOpWatchdog, TracedBus, TracedWatchdog,
    WatchdogAdapter,
};
use xc_core::{Controller, ControllerConfig, SystemClock};
use xc_daemon::{server, BrokerMode, DaemonSettings, GatewayBus};
use xc_engine::{Dispatcher, DispatcherConfig, Runtime, RuntimeConfig};

use crate::lifecycle::{DaemonPaths, LifecycleError};

#[derive(Parser)]
#[command(name = "xcd", version, about = "Crossing Control - crossing arbitration daemon")]
struct Args {
    /// Controller config file (TOML); built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// State directory for the pid lock, log and default socket
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Gateway socket path (overrides `[daemon] socket`)
    #[arg(long)]
    socket: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let (config, settings) = match &args.config {
        Some(path) => (ControllerConfig::load(path)?, DaemonSettings::load(path)?),
        None => (ControllerConfig::default(), DaemonSettings::default()),
    };

    let state_dir = match args.state_dir {
        Some(dir) => dir,
        None => DaemonPaths::default_state_dir(&config.controller_id)?,
    };
    let paths = DaemonPaths::new(state_dir, args.socket.or_else(|| settings.socket.clone()));

    // Write startup marker to log (before tracing setup, so operators can find it)
    write_startup_marker(&paths)?;

    let log_guard = setup_logging(&paths)?;

    info!(controller_id = %config.controller_id, mode = ?settings.mode, "Starting xcd");

    let mut daemon = match lifecycle::startup(&paths, settings.mode == BrokerMode::Embedded) {
        Ok(d) => d,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&paths, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
        }
    };

    let controller = Controller::from_config(&config, SystemClock)?;
    match daemon.listener.take() {
        Some(listener) => {
            let broker = MemoryBroker::new();
            tokio::spawn(server::serve(listener, broker.clone()));
            info!("Gateway listening on {}", paths.socket_path.display());
            println!("READY");
            run_with_watchdog(&config, &settings, controller, MemoryBus::new(broker), shutdown)
                .await;
        }
        None => {
            info!("Joining broker at {}", paths.socket_path.display());
            println!("READY");
            let bus = GatewayBus::new(paths.socket_path.clone());
            run_with_watchdog(&config, &settings, controller, bus, shutdown).await;
        }
    }

    daemon.shutdown();
    info!("Daemon stopped");
    Ok(())
}

async fn run_with_watchdog<B, F>(
    config: &ControllerConfig,
    settings: &DaemonSettings,
    controller: Controller<SystemClock>,
    bus: B,
    shutdown: F,
) where
    B: BusAdapter,
    F: Future<Output = ()>,
{
    match &settings.watchdog_file {
        Some(path) => {
            let watchdog = FileWatchdog::new(path.clone(), settings.watchdog_interval);
            run_controller(config, controller, bus, TracedWatchdog::new(watchdog), shutdown).await
        }
        None => run_controller(config, controller, bus, NoOpWatchdog::new(), shutdown).await,
    }
}

async fn run_controller<B, W, F>(
    config: &ControllerConfig,
    controller: Controller<SystemClock>,
    bus: B,
    watchdog: W,
    shutdown: F,
) where
    B: BusAdapter,
    W: WatchdogAdapter,
    F: Future<Output = ()>,
{
    let runtime = Runtime::new(controller, TracedBus::new(bus), RuntimeConfig::from(config));
    let mut dispatcher = Dispatcher::new(runtime, watchdog, DispatcherConfig::from(&config.timing));
    dispatcher.run(shutdown).await;
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- xcd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- xcd: starting (pid: ";

fn write_startup_marker(paths: &DaemonPaths) -> Result<(), LifecycleError> {
    use std::io::Write;

    std::fs::create_dir_all(&paths.state_dir)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

fn write_startup_error(paths: &DaemonPaths, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    paths: &DaemonPaths,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let file_appender = tracing_appender::rolling::never(
        &paths.state_dir,
        paths
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
