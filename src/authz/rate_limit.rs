// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sliding-window rate limiting.
//!
//! Quotas are keyed by tier; an explicit per-identifier override replaces
//! the tier default entirely. The mutating path increments atomically, the
//! read-only path never writes.

use chrono::Utc;

use crate::config::{RATE_LIMIT_KNOWN, RATE_LIMIT_UNKNOWN, RATE_LIMIT_VERIFIED, RATE_WINDOW_MS};
use crate::storage::{AuthDatabase, DbResult, RateLimitRepository};

use super::Tier;

/// Default quota (limit per window) for a tier.
pub fn tier_quota(tier: Tier) -> (u32, i64) {
    let limit = match tier {
        Tier::Unknown => RATE_LIMIT_UNKNOWN,
        Tier::Known => RATE_LIMIT_KNOWN,
        Tier::Verified => RATE_LIMIT_VERIFIED,
    };
    (limit, RATE_WINDOW_MS)
}

/// Enforces per-identifier sending quotas.
pub struct RateLimiter<'a> {
    db: &'a AuthDatabase,
}

impl<'a> RateLimiter<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    /// Check the sender's quota. With `increment` the send is counted
    /// atomically; without it the check has zero side effects.
    ///
    /// Returns `true` when within limits.
    pub fn check(&self, identifier: &str, tier: Tier, increment: bool) -> DbResult<bool> {
        self.check_at(identifier, tier, increment, Utc::now().timestamp_millis())
    }

    pub(crate) fn check_at(
        &self,
        identifier: &str,
        tier: Tier,
        increment: bool,
        now_ms: i64,
    ) -> DbResult<bool> {
        let repo = RateLimitRepository::new(self.db);

        let (limit, window_ms) = match repo.get_override(identifier)? {
            Some(override_) => (override_.limit, override_.window_ms),
            None => tier_quota(tier),
        };

        if increment {
            repo.check_and_increment(identifier, limit, window_ms, now_ms)
        } else {
            repo.peek(identifier, limit, window_ms, now_ms)
        }
    }
}
