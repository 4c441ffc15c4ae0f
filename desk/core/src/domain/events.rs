// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::proposal::{ProposalId, ProposalStatus};

/// Default topic for status-change notifications.
pub const STATUS_TOPIC: &str = "status";

/// Constant `eventType` tag carried by every status-change notification.
pub const STATUS_CHANGED_EVENT_TYPE: &str = "StatusChanged";

/// Notification describing a proposal moving from one status to another.
/// Transient: built by the notifier and handed to the publisher, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeEvent {
    pub proposal_id: ProposalId,
    pub previous_status: ProposalStatus,
    pub new_status: ProposalStatus,
    pub occurred_at: DateTime<Utc>,
    pub event_type: String,
}

impl StatusChangeEvent {
    pub fn new(
        proposal_id: ProposalId,
        previous_status: ProposalStatus,
        new_status: ProposalStatus,
    ) -> Self {
        Self {
            proposal_id,
            previous_status,
            new_status,
            occurred_at: Utc::now(),
            event_type: STATUS_CHANGED_EVENT_TYPE.to_string(),
        }
    }
}
