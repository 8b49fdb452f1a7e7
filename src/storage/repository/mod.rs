// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repositories over the auth database.
//!
//! Each entity gets its own repository borrowing [`super::AuthDatabase`].
//! Repositories own their table definitions and keep all redb plumbing out
//! of the domain layer.

pub mod access_lists;
pub mod audit;
pub mod challenges;
pub mod key_states;
pub mod patterns;
pub mod rate_limits;
pub mod roles;
pub mod session_tokens;
pub mod tiers;

pub use access_lists::{AccessList, AccessListRepository, AddOutcome, StoredListEntry};
pub use audit::{AuditEvent, AuditEventType, AuditRepository};
pub use challenges::{ChallengeRepository, ConsumeOutcome, StoredChallenge};
pub use key_states::{KeyStateRepository, StoredKeyState};
pub use patterns::{AuthPatternRepository, StoredAuthPattern};
pub use rate_limits::{RateLimitRepository, StoredRateCounter, StoredRateOverride};
pub use roles::{RoleRepository, StoredRole};
pub use session_tokens::{SessionTokenRepository, StoredSessionToken};
pub use tiers::{AssignOutcome, StoredTierRecord, TierRepository};
