// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Proposal Lifecycle Service
//!
//! Application service wrapping the `Proposal` aggregate with persistence and
//! status-change notification.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Create, read and transition proposals
//! - **Collaborators:**
//!   - Domain: Proposal aggregate (validation, transition rules)
//!   - Infrastructure: ProposalRepository, ContractRepository, StatusEventNotifier
//!
//! # Flow (status change)
//!
//! 1. Load the proposal (`NotFound` if absent)
//! 2. Refuse if a contract was already issued for it
//! 3. Apply the transition on the aggregate (`IllegalTransition` on violation)
//! 4. Persist the proposal, conditional on the status read in step 1
//!    (`IllegalTransition` if a concurrent request changed it)
//! 5. Notify, best-effort, if the status actually changed

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::error::ServiceError;
use crate::application::status_notifier::{NotificationOutcome, StatusEventNotifier};
use crate::domain::proposal::{Proposal, ProposalError, ProposalId, ProposalStatus, TransitionPolicy};
use crate::domain::repository::{ContractRepository, ProposalRepository, RepositoryError};

/// Result of a status change
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
    pub proposal: Proposal,
    pub previous_status: ProposalStatus,
    pub notification: NotificationOutcome,
}

#[async_trait]
pub trait ProposalService: Send + Sync {
    /// Create a new proposal in `InReview`
    ///
    /// # Errors
    ///
    /// - `Validation`: client name shorter than 3 characters after trimming,
    ///   or coverage amount not strictly positive. Nothing is persisted.
    async fn create_proposal(&self, client_name: &str, coverage_amount: Decimal) -> Result<Proposal, ServiceError>;

    async fn get_proposal(&self, id: ProposalId) -> Result<Proposal, ServiceError>;

    /// List proposals, optionally restricted to one status
    async fn list_proposals(&self, status: Option<ProposalStatus>) -> Result<Vec<Proposal>, ServiceError>;

    /// Set the status of a proposal through the generic transition operation
    ///
    /// # Errors
    ///
    /// - `NotFound`: unknown proposal
    /// - `IllegalTransition`: proposal contracted, target `Contracted`, or a
    ///   move the configured [`TransitionPolicy`] forbids, or the proposal
    ///   changed status while the request was in flight
    async fn set_proposal_status(&self, id: ProposalId, new_status: ProposalStatus) -> Result<StatusChange, ServiceError>;

    async fn approve_proposal(&self, id: ProposalId) -> Result<StatusChange, ServiceError>;
}

pub struct StandardProposalService {
    proposals: Arc<dyn ProposalRepository>,
    contracts: Arc<dyn ContractRepository>,
    notifier: Arc<StatusEventNotifier>,
    policy: TransitionPolicy,
}

impl StandardProposalService {
    pub fn new(
        proposals: Arc<dyn ProposalRepository>,
        contracts: Arc<dyn ContractRepository>,
        notifier: Arc<StatusEventNotifier>,
        policy: TransitionPolicy,
    ) -> Self {
        Self {
            proposals,
            contracts,
            notifier,
            policy,
        }
    }
}

#[async_trait]
impl ProposalService for StandardProposalService {
    async fn create_proposal(&self, client_name: &str, coverage_amount: Decimal) -> Result<Proposal, ServiceError> {
        let proposal = Proposal::new(client_name, coverage_amount).map_err(|e| match e {
            ProposalError::Validation(msg) => ServiceError::Validation(msg),
            other => ServiceError::Validation(other.to_string()),
        })?;

        let created = self.proposals.insert(&proposal).await?;

        info!(proposal_id = %created.id(), "Proposal created");
        metrics::counter!("proposals_created_total").increment(1);

        Ok(created)
    }

    async fn get_proposal(&self, id: ProposalId) -> Result<Proposal, ServiceError> {
        self.proposals
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound(id))
    }

    async fn list_proposals(&self, status: Option<ProposalStatus>) -> Result<Vec<Proposal>, ServiceError> {
        let proposals = match status {
            Some(status) => self.proposals.list_by_status(status).await?,
            None => self.proposals.list_all().await?,
        };
        Ok(proposals)
    }

    async fn set_proposal_status(&self, id: ProposalId, new_status: ProposalStatus) -> Result<StatusChange, ServiceError> {
        let mut proposal = self.get_proposal(id).await?;

        // A stored contract pins the proposal.
        if self.contracts.find_by_proposal_id(id).await?.is_some() {
            return Err(ServiceError::IllegalTransition {
                from: proposal.status(),
                to: new_status,
            });
        }

        let previous_status = proposal
            .set_status(new_status, self.policy)
            .map_err(|e| ServiceError::from_domain(e, id))?;

        let proposal = match self.proposals.update(&proposal, previous_status).await {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict(reason)) => {
                // Another request moved the proposal after we read it.
                let current = self.get_proposal(id).await?;
                warn!(proposal_id = %id, %reason, "Status changed concurrently; transition refused");
                return Err(ServiceError::IllegalTransition {
                    from: current.status(),
                    to: new_status,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let notification = if previous_status != new_status {
            info!(proposal_id = %id, from = %previous_status, to = %new_status, "Proposal status changed");
            metrics::counter!("proposal_status_changes_total", "to" => new_status.as_str()).increment(1);
            self.notifier.notify(id, previous_status, new_status).await
        } else {
            NotificationOutcome::NotRequired
        };

        Ok(StatusChange {
            proposal,
            previous_status,
            notification,
        })
    }

    async fn approve_proposal(&self, id: ProposalId) -> Result<StatusChange, ServiceError> {
        self.set_proposal_status(id, ProposalStatus::Approved).await
    }
}
