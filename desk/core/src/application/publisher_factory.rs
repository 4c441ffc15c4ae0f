// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Publisher Factory - Application Layer
//!
//! Selects the `EventPublisher` behind the status notifier from configuration.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::domain::messaging::EventPublisher;
use crate::domain::service_config::{MessagingConfig, MessagingKind};
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::webhook_publisher::WebhookEventPublisher;

/// Creates the configured publisher. The in-process bus is passed in so callers
/// can keep subscribing to it.
pub fn create_event_publisher(config: &MessagingConfig, event_bus: &EventBus) -> Result<Arc<dyn EventPublisher>> {
    match config.backend {
        MessagingKind::InProcess => {
            info!(topic = %config.topic, "Publishing status events on the in-process event bus");
            Ok(Arc::new(event_bus.clone()))
        }
        MessagingKind::Webhook => {
            let webhook = config
                .webhook
                .as_ref()
                .context("messaging.webhook must be set for the webhook backend")?;
            info!(topic = %config.topic, endpoint = %webhook.endpoint, "Publishing status events to webhook");
            let publisher = WebhookEventPublisher::from_config(webhook)
                .context("Failed to initialize webhook publisher")?;
            Ok(Arc::new(publisher))
        }
    }
}
