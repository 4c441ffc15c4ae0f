// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Proposal Desk core
//!
//! Proposal lifecycle, idempotent contract issuance and status-change
//! notification.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain rules, application services and their adapters

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
