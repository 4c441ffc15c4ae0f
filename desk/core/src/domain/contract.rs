// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Contract
//!
//! The binding artifact issued for an approved proposal. A contract is keyed by
//! the proposal it was issued for and is never modified after creation.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Contract value and contract number generation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::proposal::ProposalId;

pub const CONTRACT_NUMBER_PREFIX: &str = "CTR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub proposal_id: ProposalId,
    pub contracted_at: DateTime<Utc>,
    pub contract_number: String,
}

impl Contract {
    pub fn issue(proposal_id: ProposalId) -> Self {
        let contracted_at = Utc::now();
        Self {
            proposal_id,
            contract_number: generate_contract_number(contracted_at),
            contracted_at,
        }
    }
}

/// `CTR` + issue date (`YYYYMMDD`) + 8 upper-case hex digits.
pub fn generate_contract_number(issued_at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("{}{}{}", CONTRACT_NUMBER_PREFIX, issued_at.format("%Y%m%d"), suffix)
}
