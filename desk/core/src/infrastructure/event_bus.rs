// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - In-process Pub/Sub for published events
//
// Provides in-memory event streaming using tokio broadcast channels.
// Used as the default EventPublisher when no external receiver is configured,
// and by tests that need to observe what the core published.
//
// Events are not persisted: a subscriber only sees what is published after it
// subscribed, and slow subscribers lose the oldest buffered events.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::events::StatusChangeEvent;
use crate::domain::messaging::{EventPublisher, PublishError};
use crate::domain::proposal::ProposalId;

/// A payload as it was handed to the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedEvent {
    pub topic: String,
    pub payload: serde_json::Value,
}

/// Event bus for publishing and subscribing to events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<PublishedEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    /// Capacity determines how many events can be buffered before dropping old ones
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    fn send(&self, event: PublishedEvent) {
        debug!(topic = %event.topic, "Publishing event: {}", event.payload);

        // send() fails only when nobody is subscribed
        let receiver_count = self.sender.send(event).unwrap_or(0);

        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to the status changes of one proposal
    pub fn subscribe_proposal(&self, proposal_id: ProposalId) -> ProposalEventReceiver {
        ProposalEventReceiver {
            receiver: self.sender.subscribe(),
            proposal_id,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), PublishError> {
        self.send(PublishedEvent {
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all events
pub struct EventReceiver {
    receiver: broadcast::Receiver<PublishedEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<PublishedEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<PublishedEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver for one proposal's status changes (filtered)
pub struct ProposalEventReceiver {
    receiver: broadcast::Receiver<PublishedEvent>,
    proposal_id: ProposalId,
}

impl ProposalEventReceiver {
    /// Receive the next status change for the subscribed proposal.
    /// Payloads of other proposals, or that are not status changes, are skipped.
    pub async fn recv(&mut self) -> Result<StatusChangeEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;

            if let Ok(change) = serde_json::from_value::<StatusChangeEvent>(event.payload) {
                if change.proposal_id == self.proposal_id {
                    return Ok(change);
                }
            }
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::proposal::ProposalStatus;

    fn change(id: ProposalId) -> serde_json::Value {
        serde_json::to_value(StatusChangeEvent::new(
            id,
            ProposalStatus::InReview,
            ProposalStatus::Approved,
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();
        let id = ProposalId::new();

        event_bus.publish("status", change(id)).await.unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.topic, "status");
        assert_eq!(received.payload["proposalId"], serde_json::json!(id.0.to_string()));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_succeeds() {
        let event_bus = EventBus::new(10);
        assert_eq!(event_bus.subscriber_count(), 0);
        assert!(event_bus.publish("status", change(ProposalId::new())).await.is_ok());
    }

    #[tokio::test]
    async fn test_proposal_event_filtering() {
        let event_bus = EventBus::new(10);
        let id = ProposalId::new();
        let mut receiver = event_bus.subscribe_proposal(id);

        // Other proposal and foreign payloads are filtered out
        event_bus.publish("status", change(ProposalId::new())).await.unwrap();
        event_bus
            .publish("status", serde_json::json!({ "hello": "world" }))
            .await
            .unwrap();
        event_bus.publish("status", change(id)).await.unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.proposal_id, id);
        assert_eq!(received.new_status, ProposalStatus::Approved);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();

        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus.publish("status", change(ProposalId::new())).await.unwrap();

        assert!(receiver1.recv().await.is_ok());
        assert!(receiver2.try_recv().is_ok());
        assert!(matches!(receiver2.try_recv(), Err(EventBusError::Empty)));
    }
}
