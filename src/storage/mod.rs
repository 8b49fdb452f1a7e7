// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Auth Storage Module
//!
//! Persistent storage for the auth core, backed by a single **redb** database
//! file (pure Rust, ACID). redb serializes write transactions, which is what
//! gives challenge consumption and rate-counter increments their
//! exactly-one-winner semantics without any extra locking.
//!
//! ## Table Layout
//!
//! - `key_states`: identifier → KeyState (keys, threshold, ksn)
//! - `challenges`: challenge_id → Challenge
//! - `tiers`: identifier → TierRecord
//! - `admin_roles`: composite (identifier|role) → AdminRole
//! - `allow_list` / `deny_list`: composite (owner|other) → list entry
//! - `auth_patterns`: pattern_id → AuthPattern
//! - `rate_counters` / `rate_overrides`: identifier → counter / override
//! - `session_tokens`: token → SessionToken
//! - `audit_log`: composite (!timestamp|event_id) → AuditEvent
//!
//! All values are JSON bytes. Composite keys use the `a|b` layout with an
//! `0xFF`-padded upper bound for prefix range scans.

pub mod db;
pub mod keys;
pub mod repository;

pub use db::{AuthDatabase, DbError, DbResult};
pub use repository::{
    AccessList, AccessListRepository, AddOutcome, AssignOutcome, AuditEvent, AuditEventType,
    AuditRepository, AuthPatternRepository, ChallengeRepository, ConsumeOutcome,
    KeyStateRepository, RateLimitRepository, RoleRepository, SessionTokenRepository,
    StoredAuthPattern, StoredChallenge, StoredKeyState, StoredListEntry, StoredRateCounter,
    StoredRateOverride, StoredRole, StoredSessionToken, StoredTierRecord, TierRepository,
};
