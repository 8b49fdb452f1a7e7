// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Proof verification.
//!
//! [`AuthVerifier::verify_auth`] runs the ordered checks that turn a
//! submitted proof into an authenticated identifier. The consumed flag is
//! read early for a fast failure, but the authoritative check-and-mark is
//! the atomic [`ChallengeRepository::try_consume`] at the end, after the
//! signature verifies; that is what guarantees exactly one winner among
//! concurrent duplicate submissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::{
    AuthDatabase, ChallengeRepository, ConsumeOutcome, KeyStateRepository,
};

use super::canonical::args_hash;
use super::challenge::{ChallengePayload, Purpose, PAYLOAD_VERSION};
use super::signature::{IndexedSignature, SignatureVerifier};
use super::AuthError;

/// A client's answer to a challenge. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AuthProof {
    /// The challenge being answered.
    pub challenge_id: String,
    /// Ordered indexed signatures over the challenge payload.
    pub signatures: Vec<IndexedSignature>,
    /// Key sequence number the client signed under.
    pub ksn: u64,
}

/// Validates proofs against challenges and key states.
pub struct AuthVerifier<'a> {
    db: &'a AuthDatabase,
}

impl<'a> AuthVerifier<'a> {
    pub fn new(db: &'a AuthDatabase) -> Self {
        Self { db }
    }

    /// Validate `proof` for `expected_purpose` and `args`, consuming its
    /// challenge. Returns the authenticated identifier.
    pub fn verify_auth(
        &self,
        proof: &AuthProof,
        expected_purpose: Purpose,
        args: &serde_json::Value,
    ) -> Result<String, AuthError> {
        self.verify_auth_at(proof, expected_purpose, args, Utc::now())
    }

    pub(crate) fn verify_auth_at(
        &self,
        proof: &AuthProof,
        expected_purpose: Purpose,
        args: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let challenges = ChallengeRepository::new(self.db);

        let challenge = challenges
            .get(&proof.challenge_id)?
            .ok_or(AuthError::ChallengeNotFound)?;

        if now > challenge.expires_at {
            return Err(AuthError::ChallengeExpired);
        }

        // Fast fail; the atomic consume below is authoritative
        if challenge.consumed {
            return Err(AuthError::ChallengeAlreadyUsed);
        }

        if challenge.purpose != expected_purpose {
            return Err(AuthError::PurposeMismatch);
        }

        // Binds authentication to the exact operation parameters
        if args_hash(args) != challenge.args_hash {
            return Err(AuthError::ArgsMismatch);
        }

        // Key state is fetched fresh on every verification; rotation must
        // cut over immediately
        let key_state = KeyStateRepository::new(self.db)
            .get(&challenge.identifier)?
            .ok_or(AuthError::UnknownIdentifier)?;

        if proof.ksn != key_state.ksn {
            return Err(AuthError::KsnMismatch);
        }

        let payload = ChallengePayload {
            ver: PAYLOAD_VERSION,
            identifier: challenge.identifier.clone(),
            purpose: challenge.purpose,
            nonce: challenge.nonce.clone(),
            issued_at: challenge.issued_at.timestamp_millis(),
            args_hash: challenge.args_hash.clone(),
        };
        if !SignatureVerifier::verify(&payload.signing_bytes(), &proof.signatures, &key_state) {
            return Err(AuthError::SignatureInvalid);
        }

        match challenges.try_consume(&proof.challenge_id)? {
            ConsumeOutcome::Consumed => {
                tracing::debug!(
                    challenge_id = %proof.challenge_id,
                    identifier = %challenge.identifier,
                    purpose = %expected_purpose,
                    "proof verified"
                );
                Ok(challenge.identifier)
            }
            ConsumeOutcome::AlreadyUsed => Err(AuthError::ChallengeAlreadyUsed),
            ConsumeOutcome::NotFound => Err(AuthError::ChallengeNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::challenge::ChallengeIssuer;
    use crate::auth::test_support::{register_identifier, sign_challenge};
    use base64ct::{Base64, Encoding};
    use chrono::Duration;
    use ed25519_dalek::SigningKey;
    use serde_json::json;

    fn temp_db() -> (AuthDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = AuthDatabase::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn issue_and_sign(
        db: &AuthDatabase,
        key: &SigningKey,
        identifier: &str,
        purpose: Purpose,
        args: &serde_json::Value,
    ) -> AuthProof {
        let issued = ChallengeIssuer::new(db).issue(identifier, purpose, args).unwrap();
        sign_challenge(&issued, &[(0, key)], 0)
    }

    #[test]
    fn valid_proof_returns_identifier() {
        let (db, _dir) = temp_db();
        let key = SigningKey::from_bytes(&[7; 32]);
        register_identifier(&db, "did:rel:alice", &[&key], 1);

        let args = json!({"to": "did:rel:bob"});
        let proof = issue_and_sign(&db, &key, "did:rel:alice", Purpose::Send, &args);

        let identifier = AuthVerifier::new(&db)
            .verify_auth(&proof, Purpose::Send, &args)
            .unwrap();
        assert_eq!(identifier, "did:rel:alice");
    }

    #[test]
    fn missing_challenge_fails() {
        let (db, _dir) = temp_db();
        let proof = AuthProof {
            challenge_id: "nope".to_string(),
            signatures: vec![],
            ksn: 0,
        };
        let err = AuthVerifier::new(&db)
            .verify_auth(&proof, Purpose::Send, &json!({}))
            .unwrap_err();
        assert_eq!(err, AuthError::ChallengeNotFound);
    }

    #[test]
    fn expired_challenge_fails() {
        let (db, _dir) = temp_db();
        let key = SigningKey::from_bytes(&[7; 32]);
        register_identifier(&db, "did:rel:alice", &[&key], 1);

        let args = json!({});
        let proof = issue_and_sign(&db, &key, "did:rel:alice", Purpose::Send, &args);

        let err = AuthVerifier::new(&db)
            .verify_auth_at(
                &proof,
                Purpose::Send,
                &args,
                Utc::now() + Duration::seconds(300),
            )
            .unwrap_err();
        assert_eq!(err, AuthError::ChallengeExpired);
    }

    #[test]
    fn second_submission_fails_already_used() {
        let (db, _dir) = temp_db();
        let key = SigningKey::from_bytes(&[7; 32]);
        register_identifier(&db, "did:rel:alice", &[&key], 1);

        let args = json!({});
        let proof = issue_and_sign(&db, &key, "did:rel:alice", Purpose::Send, &args);

        let verifier = AuthVerifier::new(&db);
        verifier.verify_auth(&proof, Purpose::Send, &args).unwrap();
        let err = verifier.verify_auth(&proof, Purpose::Send, &args).unwrap_err();
        assert_eq!(err, AuthError::ChallengeAlreadyUsed);
    }

    #[test]
    fn purpose_mismatch_fails() {
        let (db, _dir) = temp_db();
        let key = SigningKey::from_bytes(&[7; 32]);
        register_identifier(&db, "did:rel:alice", &[&key], 1);

        let args = json!({});
        let proof = issue_and_sign(&db, &key, "did:rel:alice", Purpose::Send, &args);

        let err = AuthVerifier::new(&db)
            .verify_auth(&proof, Purpose::OpenSession, &args)
            .unwrap_err();
        assert_eq!(err, AuthError::PurposeMismatch);
    }

    #[test]
    fn args_mismatch_fails() {
        let (db, _dir) = temp_db();
        let key = SigningKey::from_bytes(&[7; 32]);
        register_identifier(&db, "did:rel:alice", &[&key], 1);

        let proof = issue_and_sign(
            &db,
            &key,
            "did:rel:alice",
            Purpose::Send,
            &json!({"to": "did:rel:bob"}),
        );

        let err = AuthVerifier::new(&db)
            .verify_auth(&proof, Purpose::Send, &json!({"to": "did:rel:mallory"}))
            .unwrap_err();
        assert_eq!(err, AuthError::ArgsMismatch);
    }

    #[test]
    fn unknown_identifier_fails() {
        let (db, _dir) = temp_db();
        let key = SigningKey::from_bytes(&[7; 32]);
        // Challenge issued without any registered key state
        let args = json!({});
        let proof = issue_and_sign(&db, &key, "did:rel:ghost", Purpose::Send, &args);

        let err = AuthVerifier::new(&db)
            .verify_auth(&proof, Purpose::Send, &args)
            .unwrap_err();
        assert_eq!(err, AuthError::UnknownIdentifier);
    }

    #[test]
    fn rotation_before_verification_fails_ksn_mismatch() {
        let (db, _dir) = temp_db();
        let key = SigningKey::from_bytes(&[7; 32]);
        register_identifier(&db, "did:rel:alice", &[&key], 1);

        let args = json!({});
        let proof = issue_and_sign(&db, &key, "did:rel:alice", Purpose::Send, &args);

        // Rotate after issuance, before verification
        let new_key = SigningKey::from_bytes(&[8; 32]);
        KeyStateRepository::new(&db)
            .rotate(
                "did:rel:alice",
                vec![Base64::encode_string(new_key.verifying_key().as_bytes())],
                1,
                None,
            )
            .unwrap();

        let err = AuthVerifier::new(&db)
            .verify_auth(&proof, Purpose::Send, &args)
            .unwrap_err();
        assert_eq!(err, AuthError::KsnMismatch);
    }

    #[test]
    fn wrong_signer_fails_signature_invalid() {
        let (db, _dir) = temp_db();
        let key = SigningKey::from_bytes(&[7; 32]);
        let imposter = SigningKey::from_bytes(&[9; 32]);
        register_identifier(&db, "did:rel:alice", &[&key], 1);

        let args = json!({});
        let proof = issue_and_sign(&db, &imposter, "did:rel:alice", Purpose::Send, &args);

        let err = AuthVerifier::new(&db)
            .verify_auth(&proof, Purpose::Send, &args)
            .unwrap_err();
        assert_eq!(err, AuthError::SignatureInvalid);
    }

    #[test]
    fn concurrent_identical_proofs_have_one_winner() {
        let (db, _dir) = temp_db();
        let key = SigningKey::from_bytes(&[7; 32]);
        register_identifier(&db, "did:rel:alice", &[&key], 1);

        let args = json!({"to": "did:rel:bob"});
        let proof = issue_and_sign(&db, &key, "did:rel:alice", Purpose::Send, &args);

        let db = std::sync::Arc::new(db);
        let mut handles = Vec::new();
        for _ in 0..6 {
            let db = db.clone();
            let proof = proof.clone();
            let args = args.clone();
            handles.push(std::thread::spawn(move || {
                AuthVerifier::new(&db).verify_auth(&proof, Purpose::Send, &args)
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "exactly one concurrent submission may win");
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| r.as_ref().unwrap_err() == &AuthError::ChallengeAlreadyUsed));
    }
}
