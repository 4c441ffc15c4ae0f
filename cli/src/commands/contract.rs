// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use uuid::Uuid;

use proposal_desk_core::domain::contract::Contract;

use super::{colored_status, describe_notification};
use crate::client::ApiClient;

#[derive(Subcommand)]
pub enum ContractCommand {
    /// Issue the contract for an approved proposal (idempotent)
    Issue {
        #[arg(value_name = "PROPOSAL_ID")]
        proposal_id: Uuid,
    },

    /// Show the contract issued for a proposal
    Show {
        #[arg(value_name = "PROPOSAL_ID")]
        proposal_id: Uuid,
    },

    /// Check a proposal's status, contracting it if it is approved
    Check {
        #[arg(value_name = "PROPOSAL_ID")]
        proposal_id: Uuid,
    },
}

pub async fn handle_command(command: ContractCommand, base_url: &str) -> Result<()> {
    let client = ApiClient::new(base_url)?;

    match command {
        ContractCommand::Issue { proposal_id } => issue(&client, proposal_id).await,
        ContractCommand::Show { proposal_id } => show(&client, proposal_id).await,
        ContractCommand::Check { proposal_id } => check(&client, proposal_id).await,
    }
}

async fn issue(client: &ApiClient, proposal_id: Uuid) -> Result<()> {
    let issuance = client.issue_contract(proposal_id).await?;

    if issuance.already_existed {
        println!("{}", "Contract already issued for this proposal".yellow());
    } else {
        println!("{}", "✓ Contract issued".green());
    }
    print_contract(&issuance.contract);
    println!("  Proposal:     {}", colored_status(issuance.proposal.status()));
    println!("  Notification: {}", describe_notification(&issuance.notification));
    Ok(())
}

async fn show(client: &ApiClient, proposal_id: Uuid) -> Result<()> {
    let contract = client.get_contract(proposal_id).await?;
    print_contract(&contract);
    Ok(())
}

async fn check(client: &ApiClient, proposal_id: Uuid) -> Result<()> {
    let check = client.check_status(proposal_id).await?;

    println!("Proposal {} is {}", proposal_id, colored_status(check.proposal.status()));
    match (&check.contract, check.already_existed) {
        (Some(contract), Some(false)) => {
            println!("{}", "✓ Approved proposal contracted".green());
            print_contract(contract);
            println!("  Notification: {}", describe_notification(&check.notification));
        }
        (Some(contract), _) => print_contract(contract),
        (None, _) => println!("{}", "No contract issued".dimmed()),
    }
    Ok(())
}

fn print_contract(contract: &Contract) {
    println!("  Number:       {}", contract.contract_number.bold());
    println!("  Proposal ID:  {}", contract.proposal_id);
    println!("  Contracted:   {}", contract.contracted_at.to_rfc3339());
}
