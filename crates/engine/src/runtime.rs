// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime for the crossing controller

use crate::{error::RuntimeError, Executor};
use std::time::Duration;
use tracing::Instrument;
use xc_adapters::{BusAdapter, BusMessage, ConnectOptions, Publication};
use xc_core::message::text;
use xc_core::{
    Channels, Clock, Controller, ControllerConfig, Event, ReportEvent, ReportMessage,
    RequestMessage,
};

/// Identity and channel settings of one controller
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub controller_id: String,
    pub channels: Channels,
    /// How long recovery waits for each retained snapshot
    pub recovery_wait: Duration,
}

impl From<&ControllerConfig> for RuntimeConfig {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            controller_id: config.controller_id.clone(),
            channels: config.channels.clone(),
            recovery_wait: config.timing.recovery_wait,
        }
    }
}

/// Runtime that couples the controller to the bus
pub struct Runtime<B, C: Clock> {
    pub(crate) controller: Controller<C>,
    pub(crate) executor: Executor<B>,
    pub(crate) config: RuntimeConfig,
}

impl<B, C> Runtime<B, C>
where
    B: BusAdapter,
    C: Clock,
{
    pub fn new(controller: Controller<C>, bus: B, config: RuntimeConfig) -> Self {
        Self {
            executor: Executor::new(bus, config.channels.clone()),
            controller,
            config,
        }
    }

    pub fn controller(&self) -> &Controller<C> {
        &self.controller
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn bus(&self) -> &B {
        self.executor.bus()
    }

    /// The controller's own report about itself
    pub fn presence(&self, event: ReportEvent) -> Publication {
        let report = ReportMessage::new(self.config.controller_id.as_str(), event);
        Publication::new(&self.config.channels.report, report.to_string())
            .reliable()
            .retained()
    }

    /// Connect options carrying the retained `offline` last will
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions::new(&self.config.controller_id)
            .with_last_will(self.presence(ReportEvent::Offline))
    }

    /// Map an inbound message to a controller event
    ///
    /// Malformed payloads and unrelated topics yield `None`.
    pub fn event_for(&self, message: &BusMessage) -> Option<Event> {
        let channels = &self.config.channels;
        let topic = message.topic.as_str();

        if topic == channels.resync {
            return Some(Event::ResyncObserved);
        }

        let parsed = if topic == channels.request {
            text(&message.payload)
                .and_then(RequestMessage::parse)
                .map(Event::Request)
        } else if topic == channels.report {
            text(&message.payload)
                .and_then(ReportMessage::parse)
                .map(Event::Report)
        } else {
            // Echoes of our own snapshots land here
            tracing::trace!(topic, "ignored message");
            return None;
        };

        match parsed {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(
                    topic,
                    payload = %String::from_utf8_lossy(&message.payload),
                    error = %e,
                    "dropped malformed message"
                );
                None
            }
        }
    }

    /// Handle one inbound bus message
    pub async fn handle_message(&mut self, message: &BusMessage) -> Result<(), RuntimeError> {
        match self.event_for(message) {
            Some(event) => self.handle_event(event).await,
            None => Ok(()),
        }
    }

    /// Apply an event to the controller and execute the resulting effects
    pub async fn handle_event(&mut self, event: Event) -> Result<(), RuntimeError> {
        let span = tracing::info_span!("event", event = event.name());

        async move {
            if !matches!(event, Event::Tick) {
                tracing::debug!(?event, "handling");
            }
            let effects = self.controller.handle(event);
            if effects.is_empty() {
                return Ok(());
            }
            self.executor
                .execute_all(effects, self.controller.state())
                .await?;
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Run the timeout supervisor once
    pub async fn tick(&mut self) -> Result<(), RuntimeError> {
        self.handle_event(Event::Tick).await
    }

    /// Grant what can be granted and publish a fresh snapshot
    pub async fn settle(&mut self) -> Result<(), RuntimeError> {
        let effects = self.controller.settle();
        self.executor
            .execute_all(effects, self.controller.state())
            .await?;
        Ok(())
    }

    /// Announce a graceful exit and leave the broker cleanly
    pub async fn shutdown(&mut self) -> Result<(), RuntimeError> {
        let bus = self.executor.bus();
        bus.publish(self.presence(ReportEvent::Offline)).await?;
        bus.disconnect().await?;
        tracing::info!(controller = %self.config.controller_id, "offline");
        Ok(())
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
