// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event dispatcher
//!
//! The single task that mutates arbitration state. Inbound messages, the
//! supervisor tick and shutdown are multiplexed in one `select!` loop, so
//! events are applied strictly one at a time.

use crate::recovery::Recovery;
use crate::runtime::Runtime;
use crate::RuntimeError;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use xc_adapters::{BusAdapter, BusMessage, WatchdogAdapter};
use xc_core::{Clock, TimingConfig};

/// Loop timing
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    pub tick_interval: Duration,
    pub reconnect_backoff: Duration,
}

impl From<&TimingConfig> for DispatcherConfig {
    fn from(timing: &TimingConfig) -> Self {
        Self {
            tick_interval: timing.tick_interval,
            reconnect_backoff: timing.reconnect_backoff,
        }
    }
}

/// Why the dispatch loop stopped
enum Exit {
    ConnectionLost,
    Shutdown,
}

pub struct Dispatcher<B, W, C: Clock> {
    runtime: Runtime<B, C>,
    watchdog: W,
    config: DispatcherConfig,
}

impl<B, W, C> Dispatcher<B, W, C>
where
    B: BusAdapter,
    W: WatchdogAdapter,
    C: Clock,
{
    pub fn new(runtime: Runtime<B, C>, watchdog: W, config: DispatcherConfig) -> Self {
        Self {
            runtime,
            watchdog,
            config,
        }
    }

    pub fn runtime(&self) -> &Runtime<B, C> {
        &self.runtime
    }

    pub fn into_runtime(self) -> Runtime<B, C> {
        self.runtime
    }

    /// Serve until `shutdown` resolves
    ///
    /// Connection loss is never fatal: the loop reconnects with a fixed
    /// backoff and re-runs recovery before dispatching again.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let mut inbox = tokio::select! {
                inbox = self.establish() => inbox,
                () = &mut shutdown => {
                    tracing::info!("shutdown before connection was established");
                    return;
                }
            };

            match self.dispatch(&mut inbox, &mut shutdown).await {
                Exit::ConnectionLost => {
                    tracing::warn!("connection lost, reconnecting");
                }
                Exit::Shutdown => {
                    if let Err(e) = self.runtime.shutdown().await {
                        tracing::warn!(error = %e, "graceful disconnect failed");
                    }
                    return;
                }
            }
        }
    }

    async fn dispatch<F>(
        &mut self,
        inbox: &mut mpsc::UnboundedReceiver<BusMessage>,
        shutdown: &mut std::pin::Pin<&mut F>,
    ) -> Exit
    where
        F: Future<Output = ()>,
    {
        let mut tick = tokio::time::interval(self.config.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                message = inbox.recv() => {
                    let Some(message) = message else {
                        return Exit::ConnectionLost;
                    };
                    if let Err(e) = self.runtime.handle_message(&message).await {
                        tracing::error!(topic = %message.topic, error = %e, "event failed");
                    }
                }
                _ = tick.tick() => {
                    self.feed_watchdog().await;
                    if let Err(e) = self.runtime.tick().await {
                        tracing::error!(error = %e, "tick failed");
                    }
                }
                () = &mut *shutdown => return Exit::Shutdown,
            }
        }
    }

    /// Connect and recover, retrying forever
    async fn establish(&mut self) -> mpsc::UnboundedReceiver<BusMessage> {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            let options = self.runtime.connect_options();
            match self.runtime.bus().connect(options).await {
                Ok(mut inbox) => match self.recover(&mut inbox).await {
                    Ok(recovery) => {
                        for message in recovery.deferred {
                            if let Err(e) = self.runtime.handle_message(&message).await {
                                tracing::error!(topic = %message.topic, error = %e, "event failed");
                            }
                        }
                        return inbox;
                    }
                    Err(e) => tracing::warn!(attempt, error = %e, "recovery failed"),
                },
                Err(e) => tracing::warn!(attempt, error = %e, "connect failed"),
            }
            self.backoff().await;
        }
    }

    /// Run recovery, feeding the watchdog while it waits for snapshots
    async fn recover(
        &mut self,
        inbox: &mut mpsc::UnboundedReceiver<BusMessage>,
    ) -> Result<Recovery, RuntimeError> {
        let watchdog = &self.watchdog;
        let recover = self.runtime.recover(inbox);
        tokio::pin!(recover);
        let mut tick = tokio::time::interval(self.config.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                result = &mut recover => return result,
                _ = tick.tick() => feed(watchdog).await,
            }
        }
    }

    /// Sleep for the reconnect backoff, still feeding the watchdog
    async fn backoff(&self) {
        let deadline = tokio::time::Instant::now() + self.config.reconnect_backoff;
        loop {
            self.feed_watchdog().await;
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return;
            }
            let slice = self.config.tick_interval.min(deadline - now);
            tokio::time::sleep(slice).await;
        }
    }

    async fn feed_watchdog(&self) {
        feed(&self.watchdog).await;
    }
}

async fn feed<W: WatchdogAdapter>(watchdog: &W) {
    if let Err(e) = watchdog.feed().await {
        tracing::warn!(error = %e, "watchdog feed failed");
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
