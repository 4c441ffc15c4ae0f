// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Status Event Notifier
//!
//! Builds the status-change envelope and hands it to the configured
//! [`EventPublisher`]. Delivery failures never propagate as errors: the write
//! that triggered the notification has already committed, so the caller gets a
//! [`NotificationOutcome::Failed`] instead and the failure is logged.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Collaborators:** Domain `StatusChangeEvent`, `EventPublisher` port

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::domain::events::{StatusChangeEvent, STATUS_TOPIC};
use crate::domain::messaging::{EventPublisher, PublishError};
use crate::domain::proposal::{ProposalId, ProposalStatus};

/// What happened to the status-change notification of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationOutcome {
    Published,
    /// The operation did not change any status (idempotent replay, same-status set).
    NotRequired,
    Failed { reason: String },
}

impl NotificationOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, NotificationOutcome::Failed { .. })
    }
}

pub struct StatusEventNotifier {
    publisher: Arc<dyn EventPublisher>,
    topic: String,
}

impl StatusEventNotifier {
    pub fn new(publisher: Arc<dyn EventPublisher>, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
        }
    }

    pub fn with_default_topic(publisher: Arc<dyn EventPublisher>) -> Self {
        Self::new(publisher, STATUS_TOPIC)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub async fn notify(
        &self,
        proposal_id: ProposalId,
        previous_status: ProposalStatus,
        new_status: ProposalStatus,
    ) -> NotificationOutcome {
        let event = StatusChangeEvent::new(proposal_id, previous_status, new_status);

        let result = match serde_json::to_value(&event) {
            Ok(payload) => self.publisher.publish(&self.topic, payload).await,
            Err(e) => Err(PublishError::from(e)),
        };

        match result {
            Ok(()) => {
                info!(
                    %proposal_id,
                    from = %previous_status,
                    to = %new_status,
                    topic = %self.topic,
                    "Status change event published"
                );
                NotificationOutcome::Published
            }
            Err(e) => {
                error!(
                    %proposal_id,
                    from = %previous_status,
                    to = %new_status,
                    topic = %self.topic,
                    error = %e,
                    "Failed to publish status change event"
                );
                metrics::counter!("status_events_failed_total").increment(1);
                NotificationOutcome::Failed { reason: e.to_string() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<(String, serde_json::Value)>>,
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), PublishError> {
            self.published.lock().push((topic.to_string(), payload));
            Ok(())
        }
    }

    struct BrokenPublisher;

    #[async_trait]
    impl EventPublisher for BrokenPublisher {
        async fn publish(&self, _topic: &str, _payload: serde_json::Value) -> Result<(), PublishError> {
            Err(PublishError::Transport("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_notify_publishes_envelope_on_topic() {
        let publisher = Arc::new(RecordingPublisher::default());
        let notifier = StatusEventNotifier::new(publisher.clone(), "proposal-status");
        let id = ProposalId::new();

        let outcome = notifier
            .notify(id, ProposalStatus::InReview, ProposalStatus::Approved)
            .await;

        assert_eq!(outcome, NotificationOutcome::Published);
        let published = publisher.published.lock();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "proposal-status");
        assert_eq!(published[0].1["previousStatus"], "InReview");
        assert_eq!(published[0].1["newStatus"], "Approved");
        assert_eq!(published[0].1["eventType"], "StatusChanged");
    }

    #[tokio::test]
    async fn test_publish_failure_is_reported_not_raised() {
        let notifier = StatusEventNotifier::with_default_topic(Arc::new(BrokenPublisher));

        let outcome = notifier
            .notify(ProposalId::new(), ProposalStatus::Approved, ProposalStatus::Contracted)
            .await;

        assert!(outcome.is_degraded());
        match outcome {
            NotificationOutcome::Failed { reason } => assert!(reason.contains("connection refused")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
