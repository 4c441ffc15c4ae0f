// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Aggregates, events and the ports the core consumes.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Proposal lifecycle rules and collaborator interfaces

pub mod proposal;
pub mod contract;
pub mod events;
pub mod messaging;
pub mod repository;
pub mod service_config;
