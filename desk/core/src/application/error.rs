// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::proposal::{ProposalError, ProposalId, ProposalStatus};
use crate::domain::repository::RepositoryError;

/// Errors surfaced by the application services.
///
/// Business-rule variants are fatal to the triggering call. Store conflicts
/// never reach this type from the contracting workflow (they become the
/// idempotent path) and publish failures are reported as a
/// `NotificationOutcome`, not as an error.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Proposal not found: {0}")]
    NotFound(ProposalId),

    #[error("No contract issued for proposal {0}")]
    ContractNotFound(ProposalId),

    #[error("Illegal status transition from {from} to {to}")]
    IllegalTransition {
        from: ProposalStatus,
        to: ProposalStatus,
    },

    #[error("Proposal {id} is {status}; only approved proposals can be contracted")]
    InvalidState {
        id: ProposalId,
        status: ProposalStatus,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    pub(crate) fn from_domain(err: ProposalError, id: ProposalId) -> Self {
        match err {
            ProposalError::Validation(msg) => ServiceError::Validation(msg),
            ProposalError::IllegalTransition { from, to } => ServiceError::IllegalTransition { from, to },
            ProposalError::InvalidState { status } => ServiceError::InvalidState { id, status },
        }
    }
}
