// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery after every (re)connect
//!
//! The controller's state lives in two retained snapshots on the broker.
//! Recovery reads them back, rebuilds a consistent state, asks agents to
//! re-announce, and only then starts consuming requests and reports.

use crate::error::RuntimeError;
use crate::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::Instrument;
use xc_adapters::{BusAdapter, BusMessage, Publication};
use xc_core::{Clock, ReportEvent};
use xc_storage::{restore, RestoreReport};

/// Outcome of one recovery pass
#[derive(Debug, Default)]
pub struct Recovery {
    pub report: RestoreReport,
    /// Messages that arrived while waiting for snapshots, to be dispatched next
    pub deferred: Vec<BusMessage>,
}

/// Retained payloads collected during the wait window
#[derive(Default)]
struct Collected {
    holders: Option<String>,
    queues: Option<String>,
    deferred: Vec<BusMessage>,
}

impl<B, C> Runtime<B, C>
where
    B: BusAdapter,
    C: Clock,
{
    /// Restore state from the broker and resume service on a fresh session
    ///
    /// `inbox` is the stream returned by the connect that preceded this call.
    pub async fn recover(
        &mut self,
        inbox: &mut mpsc::UnboundedReceiver<BusMessage>,
    ) -> Result<Recovery, RuntimeError> {
        let span = tracing::info_span!("recovery", controller = %self.config.controller_id);
        self.recover_inner(inbox).instrument(span).await
    }

    async fn recover_inner(
        &mut self,
        inbox: &mut mpsc::UnboundedReceiver<BusMessage>,
    ) -> Result<Recovery, RuntimeError> {
        let channels = self.config.channels.clone();
        let bus = self.executor.bus().clone();

        bus.subscribe(&channels.holders).await?;
        bus.subscribe(&channels.queues).await?;
        let collected = self.collect_snapshots(inbox).await?;

        let restored = restore(
            self.controller.state(),
            collected.holders.as_deref(),
            collected.queues.as_deref(),
            self.controller.clock().now(),
        );
        log_report(&restored.report);
        self.controller.replace_state(restored.state);

        bus.publish(Publication::new(&channels.resync, channels.resync_token.as_str()).reliable())
            .await?;
        for topic in channels.inbound() {
            bus.subscribe(topic).await?;
        }
        bus.publish(self.presence(ReportEvent::Online)).await?;

        self.executor.forget_snapshot();
        self.settle().await?;

        tracing::info!(
            holders = self.controller.state().holders().count(),
            queued = self.controller.state().queued_len(),
            deferred = collected.deferred.len(),
            "recovered"
        );

        Ok(Recovery {
            report: restored.report,
            deferred: collected.deferred,
        })
    }

    /// Wait for both retained snapshots, bounded by `recovery_wait`
    async fn collect_snapshots(
        &self,
        inbox: &mut mpsc::UnboundedReceiver<BusMessage>,
    ) -> Result<Collected, RuntimeError> {
        let channels = &self.config.channels;
        let deadline = Instant::now() + self.config.recovery_wait;
        let mut collected = Collected::default();

        while collected.holders.is_none() || collected.queues.is_none() {
            let message = match tokio::time::timeout_at(deadline, inbox.recv()).await {
                Ok(Some(message)) => message,
                Ok(None) => return Err(RuntimeError::RecoveryInterrupted),
                Err(_) => {
                    tracing::info!(
                        holders = collected.holders.is_some(),
                        queues = collected.queues.is_some(),
                        "snapshot wait elapsed"
                    );
                    break;
                }
            };

            let slot = if message.topic == channels.holders {
                &mut collected.holders
            } else if message.topic == channels.queues {
                &mut collected.queues
            } else {
                collected.deferred.push(message);
                continue;
            };

            match message.payload_str() {
                Some(payload) => {
                    tracing::debug!(topic = %message.topic, payload, "snapshot received");
                    *slot = Some(payload.to_string());
                }
                None => tracing::warn!(topic = %message.topic, "snapshot is not UTF-8, ignored"),
            }
        }

        Ok(collected)
    }
}

fn log_report(report: &RestoreReport) {
    if report.stale_holders {
        tracing::warn!("holder snapshot names agents but no occupied resource; discarded");
    }
    if report.holders_kept {
        tracing::info!("no holder snapshot; keeping in-memory holders");
    }
    if report.queues_kept {
        tracing::info!("no queue snapshot; keeping in-memory queues");
    }
    for dropped in &report.dropped {
        tracing::warn!(?dropped, "snapshot entry dropped");
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
