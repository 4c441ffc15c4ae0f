// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Proposal Desk CLI

pub mod config;
pub mod contract;
pub mod proposal;

pub use self::config::ConfigCommand;
pub use self::contract::ContractCommand;
pub use self::proposal::ProposalCommand;

use colored::{ColoredString, Colorize};
use proposal_desk_core::domain::proposal::ProposalStatus;

pub(crate) fn colored_status(status: ProposalStatus) -> ColoredString {
    match status {
        ProposalStatus::InReview => status.as_str().yellow(),
        ProposalStatus::Approved => status.as_str().cyan(),
        ProposalStatus::Rejected => status.as_str().red(),
        ProposalStatus::Contracted => status.as_str().green(),
    }
}

/// One-line summary of a notification outcome as serialized by the server.
pub(crate) fn describe_notification(outcome: &serde_json::Value) -> ColoredString {
    match outcome["status"].as_str() {
        Some("published") => "event published".green(),
        Some("not_required") => "no status change, no event".dimmed(),
        Some("failed") => format!(
            "event NOT published: {}",
            outcome["reason"].as_str().unwrap_or("unknown error")
        )
        .yellow(),
        _ => "notification outcome unknown".dimmed(),
    }
}
