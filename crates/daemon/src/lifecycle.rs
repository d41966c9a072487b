// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: state directory, pid lock, gateway socket.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

/// Files owned by one controller instance
#[derive(Debug, Clone)]
pub struct DaemonPaths {
    pub state_dir: PathBuf,
    /// Lock/PID file
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    pub socket_path: PathBuf,
}

impl DaemonPaths {
    /// Paths under `state_dir`; `socket` overrides the gateway socket
    pub fn new(state_dir: PathBuf, socket: Option<PathBuf>) -> Self {
        Self {
            lock_path: state_dir.join("xcd.pid"),
            log_path: state_dir.join("xcd.log"),
            socket_path: socket.unwrap_or_else(|| state_dir.join("gateway.sock")),
            state_dir,
        }
    }

    /// Default state directory for a controller id
    pub fn default_state_dir(controller_id: &str) -> Result<PathBuf, LifecycleError> {
        let base = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .ok_or(LifecycleError::NoStateDir)?;
        Ok(base.join("xc").join(controller_id))
    }
}

/// A running daemon's exclusive resources
pub struct Daemon {
    pub paths: DaemonPaths,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Gateway listener, present when this daemon hosts the broker
    pub listener: Option<UnixListener>,
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Claim the state directory; binds the gateway socket when `serve_gateway`
pub fn startup(paths: &DaemonPaths, serve_gateway: bool) -> Result<Daemon, LifecycleError> {
    startup_inner(paths, serve_gateway).inspect_err(|e| {
        // A lock failure means the files belong to the running instance
        if !matches!(e, LifecycleError::LockFailed(_)) {
            cleanup_on_failure(paths);
        }
    })
}

fn startup_inner(paths: &DaemonPaths, serve_gateway: bool) -> Result<Daemon, LifecycleError> {
    std::fs::create_dir_all(&paths.state_dir)?;

    // Lock FIRST so two controllers never share a state directory
    let mut lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&paths.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    let listener = if serve_gateway {
        if let Some(parent) = paths.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if paths.socket_path.exists() {
            std::fs::remove_file(&paths.socket_path)?;
        }
        let listener = UnixListener::bind(&paths.socket_path)
            .map_err(|e| LifecycleError::BindFailed(paths.socket_path.clone(), e))?;
        Some(listener)
    } else {
        None
    };

    info!(state_dir = %paths.state_dir.display(), "daemon state claimed");

    Ok(Daemon {
        paths: paths.clone(),
        lock_file,
        listener,
    })
}

impl Daemon {
    /// Remove the socket and pid file; the lock goes with `self`
    pub fn shutdown(self) {
        info!("Shutting down daemon...");

        if self.listener.is_some() {
            remove_if_exists(&self.paths.socket_path, "socket");
        }
        remove_if_exists(&self.paths.lock_path, "PID");

        info!("Daemon shutdown complete");
    }
}

fn remove_if_exists(path: &Path, what: &str) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove {} file: {}", what, e);
        }
    }
}

fn cleanup_on_failure(paths: &DaemonPaths) {
    if paths.socket_path.exists() {
        let _ = std::fs::remove_file(&paths.socket_path);
    }
    if paths.lock_path.exists() {
        let _ = std::fs::remove_file(&paths.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
