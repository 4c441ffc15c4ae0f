// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Contracting Workflow
//!
//! The only path that moves a proposal into `Contracted`, and the unit that
//! guarantees at most one contract per proposal.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Verify approval, issue the contract idempotently,
//!   record the `Contracted` status and emit the status-change event
//! - **Collaborators:**
//!   - Domain: Proposal aggregate, Contract
//!   - Infrastructure: ProposalRepository, ContractRepository, StatusEventNotifier
//!
//! # Flow
//!
//! 1. Load the proposal (`NotFound` if absent)
//! 2. Require `Approved` (`InvalidState` otherwise; a `Contracted` proposal is
//!    let through so that a replay can find its contract)
//! 3. Existing contract → return it with `already_existed = true`, no event
//! 4. Claim the proposal: write `Contracted` conditional on it still being
//!    `Approved`. Losing the claim to a reject is `InvalidState`; losing it
//!    to another contracting request continues with the claimed proposal.
//! 5. Insert the contract
//! 6. First issuance only: notify `Approved → Contracted`
//!
//! The claim comes before the insert so a contract is only ever stored for a
//! `Contracted` proposal. A request that stops between the two leaves a
//! `Contracted` proposal without a contract; the next request resumes at
//! step 5.
//!
//! The existence check in step 3 is not atomic with the insert in step 5.
//! Concurrent requests can all reach step 5; the store's uniqueness on the
//! proposal id rejects every insert but one with `Conflict`, and the losers
//! re-read the stored contract and take the replay path.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::error::ServiceError;
use crate::application::status_notifier::{NotificationOutcome, StatusEventNotifier};
use crate::domain::contract::Contract;
use crate::domain::proposal::{Proposal, ProposalId, ProposalStatus};
use crate::domain::repository::{ContractRepository, ProposalRepository, RepositoryError};

/// Result of a contracting request
#[derive(Debug, Clone, Serialize)]
pub struct ContractIssuance {
    pub contract: Contract,
    pub already_existed: bool,
    pub proposal: Proposal,
    pub notification: NotificationOutcome,
}

/// Result of a status check; an approved proposal is contracted on the way
#[derive(Debug, Clone, Serialize)]
pub struct StatusCheck {
    pub proposal: Proposal,
    pub contract: Option<Contract>,
    pub already_existed: Option<bool>,
    pub notification: NotificationOutcome,
}

#[async_trait]
pub trait ContractingService: Send + Sync {
    /// Issue the contract for an approved proposal
    ///
    /// # Errors
    ///
    /// - `NotFound`: unknown proposal
    /// - `InvalidState`: proposal is not `Approved` (and not an already
    ///   contracted replay)
    /// - `Repository`: store failure while writing; nothing is published
    async fn contract_proposal(&self, proposal_id: ProposalId) -> Result<ContractIssuance, ServiceError>;

    async fn get_contract(&self, proposal_id: ProposalId) -> Result<Contract, ServiceError>;

    async fn check_status(&self, proposal_id: ProposalId) -> Result<StatusCheck, ServiceError>;
}

pub struct StandardContractingService {
    proposals: Arc<dyn ProposalRepository>,
    contracts: Arc<dyn ContractRepository>,
    notifier: Arc<StatusEventNotifier>,
}

impl StandardContractingService {
    pub fn new(
        proposals: Arc<dyn ProposalRepository>,
        contracts: Arc<dyn ContractRepository>,
        notifier: Arc<StatusEventNotifier>,
    ) -> Self {
        Self {
            proposals,
            contracts,
            notifier,
        }
    }

    async fn load_proposal(&self, proposal_id: ProposalId) -> Result<Proposal, ServiceError> {
        self.proposals
            .find_by_id(proposal_id)
            .await?
            .ok_or(ServiceError::NotFound(proposal_id))
    }

    /// Move an approved proposal into `Contracted`, conditional on the
    /// store still holding it as `Approved`.
    async fn claim(&self, mut proposal: Proposal) -> Result<Proposal, ServiceError> {
        let proposal_id = proposal.id();
        proposal
            .mark_contracted()
            .map_err(|e| ServiceError::from_domain(e, proposal_id))?;

        match self.proposals.update(&proposal, ProposalStatus::Approved).await {
            Ok(stored) => {
                metrics::counter!("proposal_status_changes_total", "to" => ProposalStatus::Contracted.as_str())
                    .increment(1);
                Ok(stored)
            }
            Err(RepositoryError::Conflict(reason)) => {
                let current = self.load_proposal(proposal_id).await?;
                match current.status() {
                    ProposalStatus::Contracted => {
                        debug!(%proposal_id, "Proposal already claimed by a concurrent request");
                        Ok(current)
                    }
                    status => {
                        warn!(%proposal_id, %reason, "Proposal left Approved before it could be contracted");
                        Err(ServiceError::InvalidState { id: proposal_id, status })
                    }
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn check_by_contracting(&self, proposal_id: ProposalId) -> Result<StatusCheck, ServiceError> {
        let issuance = self.contract_proposal(proposal_id).await?;
        Ok(StatusCheck {
            proposal: issuance.proposal,
            contract: Some(issuance.contract),
            already_existed: Some(issuance.already_existed),
            notification: issuance.notification,
        })
    }

    /// Return an already issued contract. A proposal still `Approved` next to
    /// a stored contract is claimed first; no event is emitted either way.
    async fn replay(&self, mut proposal: Proposal, existing: Contract) -> Result<ContractIssuance, ServiceError> {
        let proposal_id = proposal.id();

        if proposal.status() == ProposalStatus::Approved {
            warn!(%proposal_id, "Contract exists but proposal is still Approved; completing status");
            proposal = self.claim(proposal).await?;
        }

        info!(
            %proposal_id,
            contract_number = %existing.contract_number,
            "Contract already issued; returning existing contract"
        );
        metrics::counter!("contract_replays_total").increment(1);

        Ok(ContractIssuance {
            contract: existing,
            already_existed: true,
            proposal,
            notification: NotificationOutcome::NotRequired,
        })
    }
}

#[async_trait]
impl ContractingService for StandardContractingService {
    async fn contract_proposal(&self, proposal_id: ProposalId) -> Result<ContractIssuance, ServiceError> {
        // Step 1: Load proposal
        let proposal = self.load_proposal(proposal_id).await?;

        // Step 2: Approval precondition
        match proposal.status() {
            ProposalStatus::Approved | ProposalStatus::Contracted => {}
            status => return Err(ServiceError::InvalidState { id: proposal_id, status }),
        }

        // Step 3: Idempotent replay
        if let Some(existing) = self.contracts.find_by_proposal_id(proposal_id).await? {
            return self.replay(proposal, existing).await;
        }

        // Step 4: Claim (a Contracted proposal without a contract resumes here)
        let proposal = match proposal.status() {
            ProposalStatus::Approved => self.claim(proposal).await?,
            _ => {
                info!(%proposal_id, "Proposal is Contracted without a contract; resuming issuance");
                proposal
            }
        };

        // Step 5: Issue
        let contract = Contract::issue(proposal_id);
        let stored = match self.contracts.insert(&contract).await {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict(reason)) => {
                info!(%proposal_id, %reason, "Concurrent issuance detected; converging on stored contract");
                let existing = self
                    .contracts
                    .find_by_proposal_id(proposal_id)
                    .await?
                    .ok_or_else(|| {
                        RepositoryError::Unknown(format!(
                            "Insert conflicted but no contract is stored for proposal {}",
                            proposal_id
                        ))
                    })?;
                let current = self.load_proposal(proposal_id).await?;
                return self.replay(current, existing).await;
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            %proposal_id,
            contract_number = %stored.contract_number,
            "Contract issued"
        );
        metrics::counter!("contracts_issued_total").increment(1);

        // Step 6: Notify after the writes are acknowledged
        let notification = self
            .notifier
            .notify(proposal_id, ProposalStatus::Approved, ProposalStatus::Contracted)
            .await;

        Ok(ContractIssuance {
            contract: stored,
            already_existed: false,
            proposal,
            notification,
        })
    }

    async fn get_contract(&self, proposal_id: ProposalId) -> Result<Contract, ServiceError> {
        self.contracts
            .find_by_proposal_id(proposal_id)
            .await?
            .ok_or(ServiceError::ContractNotFound(proposal_id))
    }

    async fn check_status(&self, proposal_id: ProposalId) -> Result<StatusCheck, ServiceError> {
        let proposal = self.load_proposal(proposal_id).await?;

        match proposal.status() {
            ProposalStatus::Approved => self.check_by_contracting(proposal_id).await,
            ProposalStatus::Contracted => match self.contracts.find_by_proposal_id(proposal_id).await? {
                Some(contract) => Ok(StatusCheck {
                    proposal,
                    contract: Some(contract),
                    already_existed: Some(true),
                    notification: NotificationOutcome::NotRequired,
                }),
                // Issuance stopped after the claim; finish it
                None => self.check_by_contracting(proposal_id).await,
            },
            _ => Ok(StatusCheck {
                proposal,
                contract: None,
                already_existed: None,
                notification: NotificationOutcome::NotRequired,
            }),
        }
    }
}
