// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Challenge/response authentication for the Relational messenger.
//!
//! ## Auth Flow
//!
//! 1. Client requests a challenge for `(identifier, purpose, args)`
//! 2. Server binds a content hash of the canonicalized args into a
//!    single-use, time-limited payload and hands it back
//! 3. Client signs the canonical payload bytes off-path with its current
//!    keys and submits an [`AuthProof`]
//! 4. [`AuthVerifier`] re-checks everything (expiry, single use, purpose,
//!    args binding, key sequence number, signature threshold) and consumes
//!    the challenge exactly once
//!
//! Streaming clients exchange one proof for a short-lived session token via
//! [`SessionTokenManager`] instead of signing per operation.

pub mod canonical;
pub mod challenge;
pub mod error;
pub mod session;
pub mod signature;
pub mod verifier;

#[cfg(test)]
pub(crate) mod test_support;

pub use challenge::{ChallengeIssuer, ChallengePayload, IssuedChallenge, Purpose};
pub use error::AuthError;
pub use session::{OpenedSession, Scope, SessionTokenManager};
pub use signature::{IndexedSignature, SignatureVerifier};
pub use verifier::{AuthProof, AuthVerifier};
