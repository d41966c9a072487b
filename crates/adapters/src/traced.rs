// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::bus::{validate_filter, BusAdapter, BusError, BusMessage, ConnectOptions, Publication};
use crate::watchdog::{WatchdogAdapter, WatchdogError};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::Instrument;

/// Wrapper that adds tracing to any BusAdapter
#[derive(Clone)]
pub struct TracedBus<B> {
    inner: B,
}

impl<B> TracedBus<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B: BusAdapter> BusAdapter for TracedBus<B> {
    async fn connect(
        &self,
        options: ConnectOptions,
    ) -> Result<mpsc::UnboundedReceiver<BusMessage>, BusError> {
        let span = tracing::info_span!("bus.connect", client_id = %options.client_id);

        async move {
            tracing::info!(has_will = options.last_will.is_some(), "connecting");

            let start = std::time::Instant::now();
            let result = self.inner.connect(options).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(_) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "connected"),
                Err(e) => tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "connect failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn subscribe(&self, filter: &str) -> Result<(), BusError> {
        let span = tracing::info_span!("bus.subscribe", filter);

        async move {
            // Precondition: filter must be well formed
            if let Err(e) = validate_filter(filter) {
                tracing::error!(error = %e, "rejected filter");
                return Err(e);
            }

            let result = self.inner.subscribe(filter).await;
            match &result {
                Ok(()) => tracing::debug!("subscribed"),
                Err(e) => tracing::error!(error = %e, "subscribe failed"),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn publish(&self, publication: Publication) -> Result<(), BusError> {
        let span = tracing::info_span!(
            "bus.publish",
            topic = %publication.topic,
            retain = publication.retain,
            reliable = publication.reliable,
        );

        async move {
            // Precondition: wildcards are for filters, never for topics
            if publication.topic.is_empty() || publication.topic.contains(['+', '#']) {
                tracing::error!("invalid publish topic");
                return Err(BusError::InvalidFilter(publication.topic));
            }

            tracing::debug!(
                payload = %String::from_utf8_lossy(&publication.payload),
                "publishing"
            );
            let result = self.inner.publish(publication).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "publish failed");
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        async move {
            let result = self.inner.disconnect().await;
            // disconnect() failing is often acceptable (link already gone)
            match &result {
                Ok(()) => tracing::info!("disconnected"),
                Err(e) => tracing::warn!(error = %e, "disconnect failed (may be expected)"),
            }
            result
        }
        .instrument(tracing::info_span!("bus.disconnect"))
        .await
    }
}

/// Wrapper that adds tracing to any WatchdogAdapter
#[derive(Clone)]
pub struct TracedWatchdog<W> {
    inner: W,
}

impl<W> TracedWatchdog<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W: WatchdogAdapter> WatchdogAdapter for TracedWatchdog<W> {
    async fn feed(&self) -> Result<(), WatchdogError> {
        let result = self.inner.feed().await;
        match &result {
            Ok(()) => tracing::trace!("watchdog fed"),
            Err(e) => tracing::error!(error = %e, "watchdog feed failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
