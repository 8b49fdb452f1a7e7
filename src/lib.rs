// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Messenger - Authentication & Authorization Core
//!
//! This crate is the auth core of the Relational end-to-end encrypted
//! messenger: challenge/response authentication over decentralized
//! identifiers, threshold signature verification with rotation cutover,
//! tiered send authorization with pattern exceptions, per-recipient
//! allow/deny overrides, sliding-window rate limiting and short-lived
//! session tokens.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Challenges, proofs, signatures, session tokens
//! - `authz` - Tiers, roles, patterns, access lists, rate limits
//! - `storage` - Embedded auth database (redb)

pub mod api;
pub mod auth;
pub mod authz;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
