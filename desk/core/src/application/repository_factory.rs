// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates concrete repository implementations based on storage backend configuration,
//! keeping the Domain Layer free of infrastructure dependencies:
//! - Domain layer: Defines repository traits (pure interfaces)
//! - Application layer: Implements factories that create repository instances
//! - Infrastructure layer: Provides concrete implementations
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Select the proposal and contract stores

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::domain::repository::{ContractRepository, ProposalRepository, StorageBackend};
use crate::infrastructure::db::Database;
use crate::infrastructure::repositories::{
    InMemoryContractRepository, InMemoryProposalRepository, PostgresContractRepository,
    PostgresProposalRepository,
};

/// The pair of stores the services are built from. Both must share one backend
/// so a contract and its proposal live side by side.
#[derive(Clone)]
pub struct Repositories {
    pub proposals: Arc<dyn ProposalRepository>,
    pub contracts: Arc<dyn ContractRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            proposals: Arc::new(InMemoryProposalRepository::new()),
            contracts: Arc::new(InMemoryContractRepository::new()),
        }
    }

    pub fn postgres(database: &Database) -> Self {
        Self {
            proposals: Arc::new(PostgresProposalRepository::new(database.get_pool().clone())),
            contracts: Arc::new(PostgresContractRepository::new(database.get_pool().clone())),
        }
    }
}

/// Creates the repositories for the configured backend. For PostgreSQL this
/// opens the pool and applies the bootstrap schema.
pub async fn create_repositories(backend: &StorageBackend) -> Result<Repositories> {
    match backend {
        StorageBackend::InMemory => {
            info!("Using in-memory proposal and contract stores");
            Ok(Repositories::in_memory())
        }
        StorageBackend::PostgreSQL(config) => {
            info!(max_connections = config.max_connections, "Using PostgreSQL proposal and contract stores");
            let database = Database::new(config).await?;
            database.ensure_schema().await?;
            Ok(Repositories::postgres(&database))
        }
    }
}
