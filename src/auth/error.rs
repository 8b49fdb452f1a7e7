// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.
//!
//! Every failure in the proof/authorization path is terminal and surfaces as
//! one of these variants; nothing here is retried internally. Re-issuing a
//! challenge after `ChallengeExpired` is the caller's business.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Typed failure for the auth core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The proof references a challenge that does not exist
    ChallengeNotFound,
    /// The challenge expired before the proof arrived
    ChallengeExpired,
    /// The challenge was already consumed by an earlier proof
    ChallengeAlreadyUsed,
    /// The challenge was issued for a different operation
    PurposeMismatch,
    /// The recomputed args hash differs from the one bound at issue
    ArgsMismatch,
    /// No key state exists for the identifier
    UnknownIdentifier,
    /// The proof was signed under a rotated-out key sequence number
    KsnMismatch,
    /// The signatures do not satisfy the key state's threshold
    SignatureInvalid,
    /// The sender exhausted its sending quota
    RateLimitExceeded,
    /// The sender is on the recipient's deny-list
    DenyListed,
    /// The recipient's allow-list is active and omits the sender
    NotOnAllowList,
    /// The acting identifier lacks the required admin role
    InsufficientRole,
    /// The target tier is not above the identifier's current tier
    AlreadyAtTier,
    /// A pattern regex failed to compile (write-time rejection)
    PatternInvalid(String),
    /// The session token is unknown, expired or otherwise invalid
    TokenExpiredOrUnknown,
    /// The requested session lifetime exceeds the hard cap
    SessionTtlTooLong,
    /// Storage failure surfacing through an auth path
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Wrap any displayable failure as an internal error.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        AuthError::Internal(err.to_string())
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::ChallengeNotFound => "challenge_not_found",
            AuthError::ChallengeExpired => "challenge_expired",
            AuthError::ChallengeAlreadyUsed => "challenge_already_used",
            AuthError::PurposeMismatch => "purpose_mismatch",
            AuthError::ArgsMismatch => "args_mismatch",
            AuthError::UnknownIdentifier => "unknown_identifier",
            AuthError::KsnMismatch => "ksn_mismatch",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::RateLimitExceeded => "rate_limit_exceeded",
            AuthError::DenyListed => "deny_listed",
            AuthError::NotOnAllowList => "not_on_allow_list",
            AuthError::InsufficientRole => "insufficient_role",
            AuthError::AlreadyAtTier => "already_at_tier",
            AuthError::PatternInvalid(_) => "pattern_invalid",
            AuthError::TokenExpiredOrUnknown => "token_expired_or_unknown",
            AuthError::SessionTtlTooLong => "session_ttl_too_long",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::ChallengeNotFound
            | AuthError::ChallengeExpired
            | AuthError::ChallengeAlreadyUsed
            | AuthError::PurposeMismatch
            | AuthError::ArgsMismatch
            | AuthError::UnknownIdentifier
            | AuthError::KsnMismatch
            | AuthError::SignatureInvalid
            | AuthError::TokenExpiredOrUnknown => StatusCode::UNAUTHORIZED,
            AuthError::DenyListed
            | AuthError::NotOnAllowList
            | AuthError::InsufficientRole => StatusCode::FORBIDDEN,
            AuthError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AuthError::AlreadyAtTier => StatusCode::CONFLICT,
            AuthError::PatternInvalid(_) | AuthError::SessionTtlTooLong => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::ChallengeNotFound => write!(f, "Challenge not found"),
            AuthError::ChallengeExpired => write!(f, "Challenge has expired"),
            AuthError::ChallengeAlreadyUsed => write!(f, "Challenge has already been used"),
            AuthError::PurposeMismatch => {
                write!(f, "Challenge was issued for a different purpose")
            }
            AuthError::ArgsMismatch => {
                write!(f, "Operation arguments do not match the challenge binding")
            }
            AuthError::UnknownIdentifier => write!(f, "No key state for identifier"),
            AuthError::KsnMismatch => {
                write!(f, "Proof key sequence number does not match current key state")
            }
            AuthError::SignatureInvalid => write!(f, "Signature threshold not satisfied"),
            AuthError::RateLimitExceeded => write!(f, "Rate limit exceeded"),
            AuthError::DenyListed => write!(f, "Sender is on deny-list"),
            AuthError::NotOnAllowList => write!(f, "Sender not on allow-list"),
            AuthError::InsufficientRole => {
                write!(f, "Insufficient role for this operation")
            }
            AuthError::AlreadyAtTier => {
                write!(f, "Identifier is already at or above the target tier")
            }
            AuthError::PatternInvalid(msg) => write!(f, "Invalid pattern regex: {msg}"),
            AuthError::TokenExpiredOrUnknown => {
                write!(f, "Session token is expired or unknown")
            }
            AuthError::SessionTtlTooLong => {
                write!(f, "Requested session lifetime exceeds the maximum")
            }
            AuthError::Internal(msg) => write!(f, "Internal auth error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<crate::storage::DbError> for AuthError {
    fn from(err: crate::storage::DbError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
