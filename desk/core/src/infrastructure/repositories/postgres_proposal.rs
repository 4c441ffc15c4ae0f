// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Proposal Repository
//!
//! `ProposalRepository` backed by the `proposals` table (see
//! `schema/bootstrap.sql`). Status is stored as its numeric code.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::proposal::{Proposal, ProposalId, ProposalStatus};
use crate::domain::repository::{ProposalRepository, RepositoryError};

pub struct PostgresProposalRepository {
    pool: PgPool,
}

impl PostgresProposalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn from_row(row: &PgRow) -> Result<Proposal, RepositoryError> {
        let id: uuid::Uuid = row.try_get("id")?;
        let client_name: String = row.try_get("client_name")?;
        let coverage_amount: Decimal = row.try_get("coverage_amount")?;
        let status_code: i16 = row.try_get("status")?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

        let status = ProposalStatus::from_code(status_code).ok_or_else(|| {
            RepositoryError::Serialization(format!("Unknown proposal status code {} for {}", status_code, id))
        })?;

        Ok(Proposal::restore(
            ProposalId(id),
            client_name,
            coverage_amount,
            status,
            updated_at,
        ))
    }
}

#[async_trait]
impl ProposalRepository for PostgresProposalRepository {
    async fn find_by_id(&self, id: ProposalId) -> Result<Option<Proposal>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, client_name, coverage_amount, status, updated_at
            FROM proposals
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::from_row).transpose()
    }

    async fn insert(&self, proposal: &Proposal) -> Result<Proposal, RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO proposals (id, client_name, coverage_amount, status, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(proposal.id().0)
        .bind(proposal.client_name())
        .bind(proposal.coverage_amount())
        .bind(proposal.status().code())
        .bind(proposal.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(proposal.clone())
    }

    async fn update(&self, proposal: &Proposal, expected_status: ProposalStatus) -> Result<Proposal, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE proposals
            SET status = $2, updated_at = $3
            WHERE id = $1 AND status = $4
            "#,
        )
        .bind(proposal.id().0)
        .bind(proposal.status().code())
        .bind(proposal.updated_at())
        .bind(expected_status.code())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current: Option<i16> = sqlx::query_scalar("SELECT status FROM proposals WHERE id = $1")
                .bind(proposal.id().0)
                .fetch_optional(&self.pool)
                .await?;

            return Err(match current.and_then(ProposalStatus::from_code) {
                Some(status) => RepositoryError::Conflict(format!(
                    "Proposal {} is {}, expected {}",
                    proposal.id(),
                    status,
                    expected_status
                )),
                None => RepositoryError::NotFound(format!("Proposal {}", proposal.id())),
            });
        }

        Ok(proposal.clone())
    }

    async fn list_all(&self) -> Result<Vec<Proposal>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, client_name, coverage_amount, status, updated_at
            FROM proposals
            ORDER BY updated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::from_row).collect()
    }

    async fn list_by_status(&self, status: ProposalStatus) -> Result<Vec<Proposal>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, client_name, coverage_amount, status, updated_at
            FROM proposals
            WHERE status = $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(status.code())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::from_row).collect()
    }
}
