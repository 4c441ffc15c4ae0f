// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use rust_decimal::Decimal;
use uuid::Uuid;

use proposal_desk_core::domain::proposal::{Proposal, ProposalStatus};

use super::{colored_status, describe_notification};
use crate::client::{ApiClient, StatusChangeView};

#[derive(Subcommand)]
pub enum ProposalCommand {
    /// Create a new proposal (starts InReview)
    Create {
        /// Client name (at least 3 characters)
        #[arg(long)]
        client: String,

        /// Coverage amount, e.g. 50000.00
        #[arg(long)]
        amount: Decimal,
    },

    /// Show a proposal
    Get {
        #[arg(value_name = "PROPOSAL_ID")]
        id: Uuid,
    },

    /// List proposals
    List {
        /// Only proposals in this status (in_review, approved, rejected, contracted)
        #[arg(long)]
        status: Option<ProposalStatus>,
    },

    /// Set the status of a proposal
    SetStatus {
        #[arg(value_name = "PROPOSAL_ID")]
        id: Uuid,

        #[arg(value_name = "STATUS")]
        status: ProposalStatus,
    },

    /// Approve a proposal
    Approve {
        #[arg(value_name = "PROPOSAL_ID")]
        id: Uuid,
    },
}

pub async fn handle_command(command: ProposalCommand, base_url: &str) -> Result<()> {
    let client = ApiClient::new(base_url)?;

    match command {
        ProposalCommand::Create { client: name, amount } => create(&client, &name, amount).await,
        ProposalCommand::Get { id } => get(&client, id).await,
        ProposalCommand::List { status } => list(&client, status).await,
        ProposalCommand::SetStatus { id, status } => set_status(&client, id, status).await,
        ProposalCommand::Approve { id } => approve(&client, id).await,
    }
}

async fn create(client: &ApiClient, name: &str, amount: Decimal) -> Result<()> {
    let proposal = client
        .create_proposal(name, amount)
        .await
        .context("Proposal was not created")?;

    println!("{}", format!("✓ Proposal created: {}", proposal.id()).green());
    print_proposal(&proposal);
    Ok(())
}

async fn get(client: &ApiClient, id: Uuid) -> Result<()> {
    let proposal = client.get_proposal(id).await?;
    print_proposal(&proposal);
    Ok(())
}

async fn list(client: &ApiClient, status: Option<ProposalStatus>) -> Result<()> {
    let proposals = client.list_proposals(status.map(|s| s.as_str())).await?;

    if proposals.is_empty() {
        println!("{}", "No proposals found".yellow());
        return Ok(());
    }

    println!("{} proposals found:", proposals.len());
    println!(
        "{:<38} {:<24} {:>16} {:<12} {}",
        "ID", "CLIENT", "COVERAGE", "STATUS", "UPDATED"
    );
    for proposal in proposals {
        println!(
            "{:<38} {:<24} {:>16} {:<12} {}",
            proposal.id().to_string(),
            proposal.client_name(),
            proposal.coverage_amount().to_string(),
            colored_status(proposal.status()),
            proposal.updated_at().format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(())
}

async fn set_status(client: &ApiClient, id: Uuid, status: ProposalStatus) -> Result<()> {
    let change = client.set_status(id, status.as_str()).await?;
    print_change(&change);
    Ok(())
}

async fn approve(client: &ApiClient, id: Uuid) -> Result<()> {
    let change = client.approve(id).await?;
    print_change(&change);
    Ok(())
}

fn print_change(change: &StatusChangeView) {
    println!(
        "{} {} → {}",
        "✓".green(),
        colored_status(change.previous_status),
        colored_status(change.proposal.status())
    );
    println!("  Notification: {}", describe_notification(&change.notification));
}

fn print_proposal(proposal: &Proposal) {
    println!("  ID:       {}", proposal.id());
    println!("  Client:   {}", proposal.client_name().bold());
    println!("  Coverage: {}", proposal.coverage_amount());
    println!("  Status:   {}", colored_status(proposal.status()));
    println!("  Updated:  {}", proposal.updated_at().to_rfc3339());
}
