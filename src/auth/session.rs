// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token lifecycle.
//!
//! Streaming clients trade one fresh proof for a short-lived bearer token
//! scoped to `receive`/`ack`. Tokens are bound to the key sequence number at
//! issue: rotation invalidates them immediately. There is no in-place
//! extension; refreshing means a new proof through
//! [`SessionTokenManager::open_session`], which is what keeps long streams
//! proving possession periodically.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::MAX_SESSION_TTL_MS;
use crate::storage::{
    AuthDatabase, KeyStateRepository, SessionTokenRepository, StoredSessionToken,
};

use super::challenge::Purpose;
use super::verifier::{AuthProof, AuthVerifier};
use super::AuthError;

/// Token length in bytes before encoding.
const TOKEN_LEN: usize = 32;

/// What a session token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Receive pushed message envelopes.
    Receive,
    /// Acknowledge delivered envelopes.
    Ack,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Receive => write!(f, "receive"),
            Scope::Ack => write!(f, "ack"),
        }
    }
}

/// A freshly opened session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OpenedSession {
    /// Bearer token value.
    pub token: String,
    /// The identifier the token was issued to.
    pub identifier: String,
    /// When the token stops validating.
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates session tokens.
pub struct SessionTokenManager<'a> {
    db: &'a AuthDatabase,
}

impl<'a> SessionTokenManager<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    /// Open a session from a fresh proof.
    ///
    /// The proof's challenge must carry purpose `open_session` with args
    /// binding exactly `{scopes, ttl_ms}`, so the token's shape is what the
    /// client signed for.
    pub fn open_session(
        &self,
        proof: &AuthProof,
        scopes: &[Scope],
        ttl_ms: i64,
    ) -> Result<OpenedSession, AuthError> {
        if ttl_ms <= 0 || ttl_ms > MAX_SESSION_TTL_MS {
            return Err(AuthError::SessionTtlTooLong);
        }

        let args = session_args(scopes, ttl_ms);
        let identifier = AuthVerifier::new(self.db).verify_auth(proof, Purpose::OpenSession, &args)?;

        let repo = SessionTokenRepository::new(self.db);
        match repo.purge_expired(Utc::now()) {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "purged expired session tokens"),
            Err(err) => tracing::warn!(error = %err, "session token purge failed"),
        }

        let rng = SystemRandom::new();
        let mut token_bytes = [0u8; TOKEN_LEN];
        rng.fill(&mut token_bytes)
            .map_err(|_| AuthError::internal("system rng unavailable"))?;

        let now = Utc::now();
        let token = StoredSessionToken {
            token: Base64UrlUnpadded::encode_string(&token_bytes),
            identifier: identifier.clone(),
            // verify_auth checked proof.ksn against the current key state
            ksn_at_issue: proof.ksn,
            scopes: scopes.to_vec(),
            issued_at: now,
            expires_at: now + Duration::milliseconds(ttl_ms),
        };
        repo.insert(&token)?;

        tracing::debug!(identifier = %identifier, scopes = ?scopes, ttl_ms, "session opened");

        Ok(OpenedSession {
            token: token.token,
            identifier,
            expires_at: token.expires_at,
        })
    }

    /// Validate a bearer token for one operation. Fail-closed: any lookup
    /// failure, mismatch or staleness yields `false`.
    pub fn validate(&self, token: &str, identifier: &str, required: Scope) -> bool {
        self.validate_at(token, identifier, required, Utc::now())
    }

    pub(crate) fn validate_at(
        &self,
        token: &str,
        identifier: &str,
        required: Scope,
        now: DateTime<Utc>,
    ) -> bool {
        let stored = match SessionTokenRepository::new(self.db).get(token) {
            Ok(Some(stored)) => stored,
            Ok(None) => return false,
            Err(err) => {
                tracing::warn!(error = %err, "token lookup failed; failing closed");
                return false;
            }
        };

        if now > stored.expires_at {
            return false;
        }
        if stored.identifier != identifier {
            return false;
        }
        if !stored.scopes.contains(&required) {
            return false;
        }

        // Fresh key state read per validation; rotation revokes outstanding
        // tokens with no grace period
        match KeyStateRepository::new(self.db).get(identifier) {
            Ok(Some(key_state)) => key_state.ksn == stored.ksn_at_issue,
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(error = %err, "key state lookup failed; failing closed");
                false
            }
        }
    }
}

/// The args object bound into an `open_session` challenge.
pub fn session_args(scopes: &[Scope], ttl_ms: i64) -> serde_json::Value {
    serde_json::json!({"scopes": scopes, "ttl_ms": ttl_ms})
}
