// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod error;
pub mod status_notifier;
pub mod proposal_service;
pub mod contracting;
pub mod repository_factory;
pub mod publisher_factory;

// Re-export use cases for convenience
pub use error::ServiceError;
pub use status_notifier::{NotificationOutcome, StatusEventNotifier};
pub use proposal_service::{ProposalService, StandardProposalService, StatusChange};
pub use contracting::{ContractIssuance, ContractingService, StandardContractingService, StatusCheck};
