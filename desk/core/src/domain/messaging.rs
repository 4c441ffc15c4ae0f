// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Event publishing port.
//!
//! The core only needs "hand this payload to the outside world under a topic".
//! Connection lifecycle, queue declaration and delivery durability belong to
//! the implementation (see `crate::infrastructure::event_bus` and
//! `crate::infrastructure::webhook_publisher`).

use async_trait::async_trait;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a serialized payload on `topic`.
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), PublishError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Publish rejected by receiver with status {status}")]
    Rejected { status: u16 },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Publisher is closed")]
    Closed,
}

impl From<serde_json::Error> for PublishError {
    fn from(err: serde_json::Error) -> Self {
        PublishError::Serialization(err.to_string())
    }
}
