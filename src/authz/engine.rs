// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The send-authorization decision.
//!
//! Composes the tier gate, the pattern exceptions and the rate limiter into
//! a single yes/no with a reason. Allow/deny-list overrides are a separate
//! concern ([`super::AccessControlEngine`]) applied by the delivery caller
//! after a tier-level allow.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthError;
use crate::authz::{AdminRole, PatternEngine, RateLimiter, RegexCache, Tier};
use crate::storage::{AuthDatabase, RoleRepository, TierRepository};

/// Kind of message being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// One-to-one envelope.
    Direct,
    /// Group fanout envelope.
    Group,
}

/// Outcome of a send-authorization check.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SendDecision {
    /// Whether the send may proceed.
    pub allowed: bool,
    /// Denial reason, when not allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// The sender's effective tier.
    pub tier: Tier,
}

impl SendDecision {
    fn allow(tier: Tier) -> Self {
        Self {
            allowed: true,
            reason: None,
            tier,
        }
    }

    fn deny(tier: Tier, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            tier,
        }
    }
}

/// Tier-and-quota send gate.
pub struct AuthorizationEngine<'a> {
    db: &'a AuthDatabase,
    regex_cache: &'a RegexCache,
}

impl<'a> AuthorizationEngine<'a> {
    pub fn new(db: &'a AuthDatabase, regex_cache: &'a RegexCache) -> Self {
        Self { db, regex_cache }
    }

    /// Decide whether `from` may send to `to`.
    ///
    /// With `increment_rate` the send is counted against the quota
    /// atomically; a read-only probe passes `false` and has no side
    /// effects. A quota denial short-circuits every other check.
    pub fn can_send(
        &self,
        from: &str,
        to: &str,
        message_type: MessageType,
        increment_rate: bool,
    ) -> Result<SendDecision, AuthError> {
        let tier = TierRepository::new(self.db).tier_of(from)?;

        if !RateLimiter::new(self.db).check(from, tier, increment_rate)? {
            tracing::debug!(from, to, %tier, "send denied: rate limited");
            return Ok(SendDecision::deny(tier, "rate limit exceeded"));
        }

        if tier != Tier::Unknown {
            return Ok(SendDecision::allow(tier));
        }

        // Unknown senders reach onboarding admins and pattern-matched
        // recipients only
        if RoleRepository::new(self.db).has_role(to, AdminRole::OnboardingAdmin)? {
            return Ok(SendDecision::allow(tier));
        }

        if PatternEngine::new(self.db, self.regex_cache)
            .first_match(to, Tier::Unknown)?
            .is_some()
        {
            return Ok(SendDecision::allow(tier));
        }

        tracing::debug!(from, to, ?message_type, "send denied: unknown tier");
        Ok(SendDecision::deny(
            tier,
            "unknown users can only message onboarding admins",
        ))
    }
}
