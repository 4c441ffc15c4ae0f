// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each aggregate root, following the DDD Repository
//! pattern: one repository per aggregate, interface defined in the domain layer,
//! implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `ProposalRepository` | `Proposal` | `InMemoryProposalRepository`, `PostgresProposalRepository` |
//! | `ContractRepository` | `Contract` | `InMemoryContractRepository`, `PostgresContractRepository` |
//!
//! ## Uniqueness
//!
//! `ContractRepository::insert` must reject a second contract for the same
//! proposal with [`RepositoryError::Conflict`]. The contracting workflow relies
//! on that rejection to converge concurrent issuance attempts, so the check and
//! the write must be atomic inside the store.
//!
//! ## Conditional status writes
//!
//! `ProposalRepository::update` only lands if the stored status still equals
//! the status the caller read. Two requests racing on the same proposal (a
//! reject against a contracting claim) therefore cannot overwrite each other.

use async_trait::async_trait;

use crate::domain::contract::Contract;
use crate::domain::proposal::{Proposal, ProposalId, ProposalStatus};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

/// Repository interface for Proposal aggregates
#[async_trait]
pub trait ProposalRepository: Send + Sync {
    /// Find proposal by ID
    async fn find_by_id(&self, id: ProposalId) -> Result<Option<Proposal>, RepositoryError>;

    /// Insert a new proposal
    async fn insert(&self, proposal: &Proposal) -> Result<Proposal, RepositoryError>;

    /// Overwrite an existing proposal, provided its stored status is still
    /// `expected_status`.
    ///
    /// The status comparison and the write are atomic inside the store.
    /// Returns `Conflict` if another writer moved the proposal first and
    /// `NotFound` if it was never inserted.
    async fn update(&self, proposal: &Proposal, expected_status: ProposalStatus) -> Result<Proposal, RepositoryError>;

    /// List all proposals
    async fn list_all(&self) -> Result<Vec<Proposal>, RepositoryError>;

    /// List proposals currently in `status`
    async fn list_by_status(&self, status: ProposalStatus) -> Result<Vec<Proposal>, RepositoryError>;
}

/// Repository interface for Contract records, keyed by proposal
#[async_trait]
pub trait ContractRepository: Send + Sync {
    /// Find the contract issued for a proposal
    async fn find_by_proposal_id(&self, proposal_id: ProposalId) -> Result<Option<Contract>, RepositoryError>;

    /// Insert a contract; `Conflict` if one already exists for the proposal
    async fn insert(&self, contract: &Contract) -> Result<Contract, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Uniqueness conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.message().to_string())
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
