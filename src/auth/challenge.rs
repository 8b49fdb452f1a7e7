// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Challenge issuance.
//!
//! A challenge binds an identifier to one specific operation: the purpose
//! plus a content hash of the operation arguments. The client signs the
//! canonicalized payload off-path and submits the signatures as an
//! [`super::AuthProof`].

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::{CHALLENGE_TTL_ENV, DEFAULT_CHALLENGE_TTL_SECONDS, MAX_CHALLENGE_TTL_SECONDS};
use crate::storage::{AuthDatabase, ChallengeRepository, StoredChallenge};

use super::canonical::args_hash;
use super::AuthError;

/// Version tag embedded in every signed payload.
pub const PAYLOAD_VERSION: u8 = 1;

/// Nonce length in bytes.
const NONCE_LEN: usize = 16;

/// Operations a challenge can authorize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// Send a message envelope.
    Send,
    /// Open a streaming session token.
    OpenSession,
    /// Onboard an unknown identifier to `known`.
    OnboardUser,
    /// Raise an identifier to `verified`.
    VerifyUser,
    /// Assign an arbitrary (higher) tier.
    AssignTier,
    /// Grant an admin role.
    GrantRole,
    /// Revoke an admin role.
    RevokeRole,
    /// Mutate the caller's allow-list.
    ManageAllowList,
    /// Mutate the caller's deny-list.
    ManageDenyList,
    /// Create or delete an authorization pattern.
    ManagePattern,
}

impl std::fmt::Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Purpose::Send => "send",
            Purpose::OpenSession => "open_session",
            Purpose::OnboardUser => "onboard_user",
            Purpose::VerifyUser => "verify_user",
            Purpose::AssignTier => "assign_tier",
            Purpose::GrantRole => "grant_role",
            Purpose::RevokeRole => "revoke_role",
            Purpose::ManageAllowList => "manage_allow_list",
            Purpose::ManageDenyList => "manage_deny_list",
            Purpose::ManagePattern => "manage_pattern",
        };
        write!(f, "{s}")
    }
}

/// The payload a client signs. Field order is irrelevant: signing operates
/// on the canonicalized rendering.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ChallengePayload {
    /// Payload format version.
    pub ver: u8,
    /// The identifier expected to sign.
    pub identifier: String,
    /// The operation being authorized.
    pub purpose: Purpose,
    /// Random nonce, base64.
    pub nonce: String,
    /// Issue instant, epoch milliseconds.
    pub issued_at: i64,
    /// Hex SHA-256 over the canonicalized operation arguments.
    pub args_hash: String,
}

impl ChallengePayload {
    /// Canonical bytes the client signs and the server verifies.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let value = serde_json::to_value(self).unwrap_or_default();
        super::canonical::canonicalize(&value).into_bytes()
    }
}

/// A freshly issued challenge, handed back to the client.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IssuedChallenge {
    /// Identifier the proof must reference.
    pub challenge_id: String,
    /// The payload to canonicalize and sign.
    pub payload: ChallengePayload,
    /// When the challenge stops being acceptable.
    pub expires_at: DateTime<Utc>,
}

/// Issues single-use, content-bound challenges.
pub struct ChallengeIssuer<'a> {
    db: &'a AuthDatabase,
}

impl<'a> ChallengeIssuer<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    /// Issue a challenge for `(identifier, purpose, args)`.
    pub fn issue(
        &self,
        identifier: &str,
        purpose: Purpose,
        args: &serde_json::Value,
    ) -> Result<IssuedChallenge, AuthError> {
        let repo = ChallengeRepository::new(self.db);

        // Opportunistic cleanup; never blocks issuance
        match repo.purge_expired(Utc::now()) {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "purged expired challenges"),
            Err(err) => tracing::warn!(error = %err, "challenge purge failed"),
        }

        let rng = SystemRandom::new();
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rng.fill(&mut nonce_bytes)
            .map_err(|_| AuthError::internal("system rng unavailable"))?;

        let now = Utc::now();
        let payload = ChallengePayload {
            ver: PAYLOAD_VERSION,
            identifier: identifier.to_string(),
            purpose,
            nonce: Base64::encode_string(&nonce_bytes),
            issued_at: now.timestamp_millis(),
            args_hash: args_hash(args),
        };

        let challenge = StoredChallenge {
            id: uuid::Uuid::new_v4().to_string(),
            identifier: identifier.to_string(),
            purpose,
            args_hash: payload.args_hash.clone(),
            nonce: payload.nonce.clone(),
            issued_at: now,
            expires_at: now + Duration::seconds(challenge_ttl_seconds()),
            consumed: false,
        };
        repo.insert(&challenge)?;

        tracing::debug!(
            challenge_id = %challenge.id,
            identifier,
            purpose = %purpose,
            "issued challenge"
        );

        Ok(IssuedChallenge {
            challenge_id: challenge.id,
            payload,
            expires_at: challenge.expires_at,
        })
    }
}

/// Challenge lifetime from the environment, clamped to the hard cap.
fn challenge_ttl_seconds() -> i64 {
    std::env::var(CHALLENGE_TTL_ENV)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|ttl| *ttl > 0)
        .unwrap_or(DEFAULT_CHALLENGE_TTL_SECONDS)
        .min(MAX_CHALLENGE_TTL_SECONDS)
}
