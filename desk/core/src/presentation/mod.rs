// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`proposal-desk-core`)
//!
//! HTTP surface that translates external requests into application service
//! calls. Parsing and status-code mapping live here; every rule is delegated
//! to `crate::application`.
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`api`] | HTTP (Axum) | REST endpoints for proposals and contracts |

pub mod api;
