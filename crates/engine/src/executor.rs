// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effect executor

use thiserror::Error;
use tracing::Instrument;
use xc_adapters::{BusAdapter, BusError, Publication};
use xc_core::{ArbitrationState, Channels, Effect};
use xc_storage::SnapshotPayloads;

/// Errors that can occur during effect execution
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("publish to {topic} failed: {source}")]
    Publish { topic: String, source: BusError },
}

/// Turns effects into bus publications
pub struct Executor<B> {
    bus: B,
    channels: Channels,
    /// Last snapshot that reached the broker
    published: Option<SnapshotPayloads>,
}

impl<B: BusAdapter> Executor<B> {
    pub fn new(bus: B, channels: Channels) -> Self {
        Self {
            bus,
            channels,
            published: None,
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn channels(&self) -> &Channels {
        &self.channels
    }

    /// Force the next snapshot out even if it matches the last one
    ///
    /// Called after a reconnect, since the broker may have lost or been
    /// handed a different retained value in the meantime.
    pub fn forget_snapshot(&mut self) {
        self.published = None;
    }

    /// Execute a single effect with tracing
    ///
    /// `state` is the controller state after the event that produced the
    /// effect, used to encode snapshots.
    pub async fn execute(
        &mut self,
        effect: Effect,
        state: &ArbitrationState,
    ) -> Result<(), ExecuteError> {
        let span = tracing::info_span!("effect", effect = effect.name());

        async move {
            tracing::debug!(?effect, "executing");

            let start = std::time::Instant::now();
            let result = self.execute_inner(effect, state).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "completed"),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    /// Execute effects in order
    ///
    /// Publishing is best effort: a failed effect does not stop the ones
    /// after it. The first failure is returned once all have been tried.
    pub async fn execute_all(
        &mut self,
        effects: Vec<Effect>,
        state: &ArbitrationState,
    ) -> Result<(), ExecuteError> {
        let mut first_error = None;
        for effect in effects {
            if let Err(e) = self.execute(effect, state).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn execute_inner(
        &mut self,
        effect: Effect,
        state: &ArbitrationState,
    ) -> Result<(), ExecuteError> {
        match effect {
            Effect::Reply(reply) => {
                let publication =
                    Publication::new(&self.channels.reply, reply.to_string()).reliable();
                self.publish(publication).await
            }

            Effect::Report(report) => {
                let mut publication =
                    Publication::new(&self.channels.report, report.to_string()).reliable();
                if report.event.is_durable() {
                    publication = publication.retained();
                }
                self.publish(publication).await
            }

            Effect::PublishSnapshot => {
                let payloads = xc_storage::encode(state);
                if self.published.as_ref() == Some(&payloads) {
                    tracing::trace!("snapshot unchanged");
                    return Ok(());
                }
                // Clear first: a half-published snapshot must be sent again
                self.published = None;
                self.publish(
                    Publication::new(&self.channels.holders, payloads.holders.as_str())
                        .reliable()
                        .retained(),
                )
                .await?;
                self.publish(
                    Publication::new(&self.channels.queues, payloads.queues.as_str())
                        .reliable()
                        .retained(),
                )
                .await?;
                tracing::info!(holders = %payloads.holders, queues = %payloads.queues, "snapshot");
                self.published = Some(payloads);
                Ok(())
            }
        }
    }

    async fn publish(&self, publication: Publication) -> Result<(), ExecuteError> {
        let topic = publication.topic.clone();
        self.bus
            .publish(publication)
            .await
            .map_err(|source| ExecuteError::Publish { topic, source })
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
