// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authorization Module
//!
//! The send-decision side of the core: trust tiers, admin roles, regex
//! pattern exceptions, per-recipient allow/deny overrides and sliding-window
//! rate limiting.

pub mod access_control;
pub mod engine;
pub mod pattern;
pub mod rate_limit;
pub mod tier;

pub use access_control::AccessControlEngine;
pub use engine::{AuthorizationEngine, MessageType, SendDecision};
pub use pattern::{PatternEngine, RegexCache};
pub use rate_limit::RateLimiter;
pub use tier::{AdminRole, Tier};
