// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared helpers for auth tests: registering identifiers with real Ed25519
//! keys and producing signed proofs for issued challenges.

use base64ct::{Base64, Encoding};
use ed25519_dalek::{Signer, SigningKey};

use crate::storage::{AuthDatabase, KeyStateRepository, StoredKeyState};

use super::challenge::IssuedChallenge;
use super::signature::IndexedSignature;
use super::verifier::AuthProof;

/// Register a key state for `identifier` built from real signing keys.
pub(crate) fn register_identifier(
    db: &AuthDatabase,
    identifier: &str,
    keys: &[&SigningKey],
    threshold: u32,
) -> StoredKeyState {
    let encoded = keys
        .iter()
        .map(|k| Base64::encode_string(k.verifying_key().as_bytes()))
        .collect();
    KeyStateRepository::new(db)
        .register(identifier, encoded, threshold, None)
        .unwrap()
}

/// Sign an issued challenge with the given `(idx, key)` pairs.
pub(crate) fn sign_challenge(
    issued: &IssuedChallenge,
    signers: &[(u32, &SigningKey)],
    ksn: u64,
) -> AuthProof {
    let payload = issued.payload.signing_bytes();
    AuthProof {
        challenge_id: issued.challenge_id.clone(),
        signatures: signers
            .iter()
            .map(|(idx, key)| IndexedSignature {
                idx: *idx,
                sig: Base64::encode_string(&key.sign(&payload).to_bytes()),
            })
            .collect(),
        ksn,
    }
}
