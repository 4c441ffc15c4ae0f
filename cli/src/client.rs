// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP client for communicating with a running Proposal Desk server

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

use proposal_desk_core::domain::contract::Contract;
use proposal_desk_core::domain::proposal::{Proposal, ProposalStatus};
use proposal_desk_core::domain::service_config::ServiceConfigManifest;

/// Server URL implied by the `spec.http` section. A wildcard bind address is
/// reached through loopback.
pub fn default_base_url(config: &ServiceConfigManifest) -> String {
    let host = match config.spec.http.bind_address.as_str() {
        "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
        other => other,
    };
    format!("http://{}:{}", host, config.spec.http.port)
}

/// Status change as returned by the server. The notification outcome is kept
/// as raw JSON so the client does not need to mirror the server's enum.
#[derive(Debug, serde::Deserialize)]
pub struct StatusChangeView {
    pub proposal: Proposal,
    pub previous_status: ProposalStatus,
    pub notification: serde_json::Value,
}

#[derive(Debug, serde::Deserialize)]
pub struct IssuanceView {
    pub contract: Contract,
    pub already_existed: bool,
    pub proposal: Proposal,
    pub notification: serde_json::Value,
}

#[derive(Debug, serde::Deserialize)]
pub struct StatusCheckView {
    pub proposal: Proposal,
    pub contract: Option<Contract>,
    pub already_existed: Option<bool>,
    pub notification: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn parse<T: DeserializeOwned>(response: Response, action: &str) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = body["error"].as_str().unwrap_or("no error message").to_string();
            anyhow::bail!("Failed to {} ({}): {}", action, status, message);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response to {}", action))
    }

    pub async fn health(&self) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .with_context(|| format!("Server is not reachable at {}", self.base_url))?;

        Self::parse(response, "check health").await
    }

    pub async fn create_proposal(&self, client_name: &str, coverage_amount: Decimal) -> Result<Proposal> {
        let response = self
            .client
            .post(format!("{}/api/proposals", self.base_url))
            .json(&json!({
                "client_name": client_name,
                "coverage_amount": coverage_amount,
            }))
            .send()
            .await
            .context("Failed to create proposal")?;

        Self::parse(response, "create proposal").await
    }

    pub async fn get_proposal(&self, id: Uuid) -> Result<Proposal> {
        let response = self
            .client
            .get(format!("{}/api/proposals/{}", self.base_url, id))
            .send()
            .await
            .context("Failed to get proposal")?;

        Self::parse(response, "get proposal").await
    }

    pub async fn list_proposals(&self, status: Option<&str>) -> Result<Vec<Proposal>> {
        let mut url = format!("{}/api/proposals", self.base_url);
        if let Some(status) = status {
            url.push_str(&format!("?status={}", status));
        }

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to list proposals")?;
        Self::parse(response, "list proposals").await
    }

    pub async fn set_status(&self, id: Uuid, status: &str) -> Result<StatusChangeView> {
        let response = self
            .client
            .put(format!("{}/api/proposals/{}/status", self.base_url, id))
            .json(&json!({ "status": status }))
            .send()
            .await
            .context("Failed to set proposal status")?;

        Self::parse(response, "set proposal status").await
    }

    pub async fn approve(&self, id: Uuid) -> Result<StatusChangeView> {
        let response = self
            .client
            .post(format!("{}/api/proposals/{}/approve", self.base_url, id))
            .send()
            .await
            .context("Failed to approve proposal")?;

        Self::parse(response, "approve proposal").await
    }

    pub async fn issue_contract(&self, proposal_id: Uuid) -> Result<IssuanceView> {
        let response = self
            .client
            .post(format!("{}/api/contracts", self.base_url))
            .json(&json!({ "proposal_id": proposal_id }))
            .send()
            .await
            .context("Failed to issue contract")?;

        Self::parse(response, "issue contract").await
    }

    pub async fn get_contract(&self, proposal_id: Uuid) -> Result<Contract> {
        let response = self
            .client
            .get(format!("{}/api/contracts/{}", self.base_url, proposal_id))
            .send()
            .await
            .context("Failed to get contract")?;

        Self::parse(response, "get contract").await
    }

    pub async fn check_status(&self, proposal_id: Uuid) -> Result<StatusCheckView> {
        let response = self
            .client
            .get(format!("{}/api/contracts/check-status/{}", self.base_url, proposal_id))
            .send()
            .await
            .context("Failed to check proposal status")?;

        Self::parse(response, "check proposal status").await
    }
}
