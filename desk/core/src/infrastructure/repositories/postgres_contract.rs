// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Contract Repository
//!
//! `ContractRepository` backed by the `contracts` table. `proposal_id` is the
//! primary key, so a second insert for the same proposal fails with a unique
//! violation that `RepositoryError::from(sqlx::Error)` maps to `Conflict`.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::contract::Contract;
use crate::domain::proposal::ProposalId;
use crate::domain::repository::{ContractRepository, RepositoryError};

pub struct PostgresContractRepository {
    pool: PgPool,
}

impl PostgresContractRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn from_row(row: &PgRow) -> Result<Contract, RepositoryError> {
        Ok(Contract {
            proposal_id: ProposalId(row.try_get("proposal_id")?),
            contracted_at: row.try_get("contracted_at")?,
            contract_number: row.try_get("contract_number")?,
        })
    }
}

#[async_trait]
impl ContractRepository for PostgresContractRepository {
    async fn find_by_proposal_id(&self, proposal_id: ProposalId) -> Result<Option<Contract>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT proposal_id, contracted_at, contract_number
            FROM contracts
            WHERE proposal_id = $1
            "#,
        )
        .bind(proposal_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::from_row).transpose()
    }

    async fn insert(&self, contract: &Contract) -> Result<Contract, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO contracts (proposal_id, contracted_at, contract_number)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(contract.proposal_id.0)
        .bind(contract.contracted_at)
        .bind(&contract.contract_number)
        .execute(&self.pool)
        .await?;

        Ok(contract.clone())
    }
}
