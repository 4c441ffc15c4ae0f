// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Proposal Aggregate
//!
//! A proposal is a request for insurance coverage. It is created in
//! `InReview` and moves through a small status graph:
//!
//! ```text
//! InReview ──► Approved ──► Contracted   (contracting workflow only)
//!     │
//!     └──────► Rejected
//! ```
//!
//! `Rejected` and `Contracted` are terminal. Field invariants (client name,
//! coverage amount) are checked once in [`Proposal::new`] and hold for the
//! lifetime of the value because the fields are private.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Proposal lifecycle state machine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Minimum number of characters in a trimmed client name.
pub const MIN_CLIENT_NAME_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(pub Uuid);

impl ProposalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for ProposalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    InReview,
    Approved,
    Rejected,
    Contracted,
}

impl ProposalStatus {
    pub const ALL: [ProposalStatus; 4] = [
        ProposalStatus::InReview,
        ProposalStatus::Approved,
        ProposalStatus::Rejected,
        ProposalStatus::Contracted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::InReview => "InReview",
            ProposalStatus::Approved => "Approved",
            ProposalStatus::Rejected => "Rejected",
            ProposalStatus::Contracted => "Contracted",
        }
    }

    /// Stable numeric code used by persistent stores.
    pub fn code(&self) -> i16 {
        match self {
            ProposalStatus::InReview => 1,
            ProposalStatus::Approved => 2,
            ProposalStatus::Rejected => 3,
            ProposalStatus::Contracted => 4,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalStatus::Rejected | ProposalStatus::Contracted)
    }

    /// Edges of the lifecycle graph, including the contracting edge.
    pub fn can_transition_to(&self, target: ProposalStatus) -> bool {
        matches!(
            (self, target),
            (ProposalStatus::InReview, ProposalStatus::Approved)
                | (ProposalStatus::InReview, ProposalStatus::Rejected)
                | (ProposalStatus::Approved, ProposalStatus::Contracted)
        )
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = ProposalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != ' ')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "inreview" => Ok(ProposalStatus::InReview),
            "approved" => Ok(ProposalStatus::Approved),
            "rejected" => Ok(ProposalStatus::Rejected),
            "contracted" => Ok(ProposalStatus::Contracted),
            _ => Err(ProposalError::Validation(format!("Unknown proposal status: '{}'", s))),
        }
    }
}

/// How much of the status graph the generic status operation enforces.
///
/// Both policies refuse to leave `Contracted` and refuse to enter it; the
/// contracting workflow is the only way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    #[default]
    Permissive,
    /// Only `InReview -> Approved | Rejected` through the generic operation.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProposalError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Illegal status transition from {from} to {to}")]
    IllegalTransition {
        from: ProposalStatus,
        to: ProposalStatus,
    },

    #[error("Operation not allowed while proposal is {status}")]
    InvalidState { status: ProposalStatus },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    id: ProposalId,
    client_name: String,
    coverage_amount: Decimal,
    status: ProposalStatus,
    updated_at: DateTime<Utc>,
}

impl Proposal {
    /// Create a new proposal in `InReview`.
    pub fn new(client_name: &str, coverage_amount: Decimal) -> Result<Self, ProposalError> {
        let client_name = client_name.trim();
        if client_name.chars().count() < MIN_CLIENT_NAME_LEN {
            return Err(ProposalError::Validation(format!(
                "Client name must have at least {} characters",
                MIN_CLIENT_NAME_LEN
            )));
        }

        if coverage_amount <= Decimal::ZERO {
            return Err(ProposalError::Validation(
                "Coverage amount must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            id: ProposalId::new(),
            client_name: client_name.to_string(),
            coverage_amount,
            status: ProposalStatus::InReview,
            updated_at: Utc::now(),
        })
    }

    /// Rebuild a proposal from a trusted store row. No validation runs here.
    pub fn restore(
        id: ProposalId,
        client_name: String,
        coverage_amount: Decimal,
        status: ProposalStatus,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            client_name,
            coverage_amount,
            status,
            updated_at,
        }
    }

    pub fn id(&self) -> ProposalId {
        self.id
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn coverage_amount(&self) -> Decimal {
        self.coverage_amount
    }

    pub fn status(&self) -> ProposalStatus {
        self.status
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Generic status change. Returns the previous status.
    pub fn set_status(
        &mut self,
        new_status: ProposalStatus,
        policy: TransitionPolicy,
    ) -> Result<ProposalStatus, ProposalError> {
        let from = self.status;
        let illegal = ProposalError::IllegalTransition { from, to: new_status };

        if from == ProposalStatus::Contracted || new_status == ProposalStatus::Contracted {
            return Err(illegal);
        }

        if policy == TransitionPolicy::Strict
            && from != new_status
            && !from.can_transition_to(new_status)
        {
            return Err(illegal);
        }

        self.status = new_status;
        self.updated_at = Utc::now();
        Ok(from)
    }

    pub fn approve(&mut self, policy: TransitionPolicy) -> Result<ProposalStatus, ProposalError> {
        self.set_status(ProposalStatus::Approved, policy)
    }

    /// Move an approved proposal into `Contracted`. Reserved for the
    /// contracting workflow, which owns contract issuance.
    pub(crate) fn mark_contracted(&mut self) -> Result<(), ProposalError> {
        if self.status != ProposalStatus::Approved {
            return Err(ProposalError::InvalidState { status: self.status });
        }
        self.status = ProposalStatus::Contracted;
        self.updated_at = Utc::now();
        Ok(())
    }
}
