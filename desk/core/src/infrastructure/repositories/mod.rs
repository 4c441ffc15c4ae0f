// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! This module provides infrastructure implementations of repository abstractions
//! defined in the domain layer, following the Repository pattern from DDD.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve domain aggregates
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! - **PostgresProposalRepository** - `proposals` table
//! - **PostgresContractRepository** - `contracts` table, primary key on `proposal_id`
//!
//! ## In-Memory Repositories
//!
//! Lightweight implementations for testing and development:
//! - **InMemoryProposalRepository** - Thread-safe HashMap-backed storage
//! - **InMemoryContractRepository** - Uniqueness check and insert under one write lock
//!
//! # Design Principles
//!
//! 1. **Technology Agnostic**: Domain layer has no knowledge of persistence
//! 2. **Store-enforced uniqueness**: duplicate contracts are rejected with `Conflict`
//! 3. **Error Mapping**: Infrastructure errors mapped to domain RepositoryError

pub mod postgres_contract;
pub mod postgres_proposal;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::contract::Contract;
use crate::domain::proposal::{Proposal, ProposalId, ProposalStatus};
use crate::domain::repository::{ContractRepository, ProposalRepository, RepositoryError};

pub use postgres_contract::PostgresContractRepository;
pub use postgres_proposal::PostgresProposalRepository;

#[derive(Clone, Default)]
pub struct InMemoryProposalRepository {
    proposals: Arc<RwLock<HashMap<ProposalId, Proposal>>>,
}

impl InMemoryProposalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut proposals: Vec<Proposal>) -> Vec<Proposal> {
        // Most recently updated first
        proposals.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
        proposals
    }
}

#[async_trait]
impl ProposalRepository for InMemoryProposalRepository {
    async fn find_by_id(&self, id: ProposalId) -> Result<Option<Proposal>, RepositoryError> {
        Ok(self.proposals.read().get(&id).cloned())
    }

    async fn insert(&self, proposal: &Proposal) -> Result<Proposal, RepositoryError> {
        let mut proposals = self.proposals.write();
        match proposals.entry(proposal.id()) {
            Entry::Occupied(_) => Err(RepositoryError::Conflict(format!(
                "Proposal {} already exists",
                proposal.id()
            ))),
            Entry::Vacant(slot) => Ok(slot.insert(proposal.clone()).clone()),
        }
    }

    async fn update(&self, proposal: &Proposal, expected_status: ProposalStatus) -> Result<Proposal, RepositoryError> {
        let mut proposals = self.proposals.write();
        match proposals.get_mut(&proposal.id()) {
            Some(stored) if stored.status() != expected_status => Err(RepositoryError::Conflict(format!(
                "Proposal {} is {}, expected {}",
                proposal.id(),
                stored.status(),
                expected_status
            ))),
            Some(stored) => {
                *stored = proposal.clone();
                Ok(stored.clone())
            }
            None => Err(RepositoryError::NotFound(format!("Proposal {}", proposal.id()))),
        }
    }

    async fn list_all(&self) -> Result<Vec<Proposal>, RepositoryError> {
        let proposals = self.proposals.read();
        Ok(Self::sorted(proposals.values().cloned().collect()))
    }

    async fn list_by_status(&self, status: ProposalStatus) -> Result<Vec<Proposal>, RepositoryError> {
        let proposals = self.proposals.read();
        Ok(Self::sorted(
            proposals
                .values()
                .filter(|p| p.status() == status)
                .cloned()
                .collect(),
        ))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryContractRepository {
    contracts: Arc<RwLock<HashMap<ProposalId, Contract>>>,
}

impl InMemoryContractRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.contracts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.read().is_empty()
    }
}

#[async_trait]
impl ContractRepository for InMemoryContractRepository {
    async fn find_by_proposal_id(&self, proposal_id: ProposalId) -> Result<Option<Contract>, RepositoryError> {
        Ok(self.contracts.read().get(&proposal_id).cloned())
    }

    async fn insert(&self, contract: &Contract) -> Result<Contract, RepositoryError> {
        let mut contracts = self.contracts.write();
        match contracts.entry(contract.proposal_id) {
            Entry::Occupied(_) => Err(RepositoryError::Conflict(format!(
                "Contract for proposal {} already exists",
                contract.proposal_id
            ))),
            Entry::Vacant(slot) => Ok(slot.insert(contract.clone()).clone()),
        }
    }
}
