// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Webhook Event Publisher
//!
//! Delivers each payload as a JSON `POST {endpoint}/{topic}`. Any 2xx counts
//! as delivered; everything else becomes a `PublishError` that the notifier
//! reports as a degraded outcome. No retries: the caller's notification
//! guarantee is best-effort.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::domain::messaging::{EventPublisher, PublishError};
use crate::domain::service_config::WebhookConfig;

pub const TOPIC_HEADER: &str = "X-Event-Topic";

#[derive(Debug, Clone)]
pub struct WebhookEventPublisher {
    client: Client,
    endpoint: String,
}

impl WebhookEventPublisher {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PublishError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &WebhookConfig) -> Result<Self, PublishError> {
        Self::new(config.endpoint.clone(), Duration::from_millis(config.timeout_ms))
    }

    fn topic_url(&self, topic: &str) -> String {
        format!("{}/{}", self.endpoint, topic)
    }
}

#[async_trait]
impl EventPublisher for WebhookEventPublisher {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), PublishError> {
        let url = self.topic_url(topic);

        let response = self
            .client
            .post(&url)
            .header(TOPIC_HEADER, topic)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Rejected { status: status.as_u16() });
        }

        debug!(%url, status = status.as_u16(), "Webhook accepted event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_publish_posts_json_to_topic_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hooks/status")
            .match_header("x-event-topic", "status")
            .match_body(Matcher::PartialJson(serde_json::json!({ "eventType": "StatusChanged" })))
            .with_status(202)
            .create_async()
            .await;

        let publisher =
            WebhookEventPublisher::new(format!("{}/hooks/", server.url()), Duration::from_secs(2)).unwrap();
        publisher
            .publish("status", serde_json::json!({ "eventType": "StatusChanged" }))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/status")
            .with_status(503)
            .create_async()
            .await;

        let publisher = WebhookEventPublisher::new(server.url(), Duration::from_secs(2)).unwrap();
        let result = publisher.publish("status", serde_json::json!({})).await;

        assert!(matches!(result, Err(PublishError::Rejected { status: 503 })));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Port 9 (discard) on localhost is not listening in test environments
        let publisher = WebhookEventPublisher::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let result = publisher.publish("status", serde_json::json!({})).await;

        assert!(matches!(result, Err(PublishError::Transport(_))));
    }
}
