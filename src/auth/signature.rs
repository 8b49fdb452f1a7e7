// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Threshold signature verification.
//!
//! A proof carries `(idx, sig)` pairs: `idx` selects a key from the
//! identifier's current key state, `sig` is a detached Ed25519 signature
//! over the canonical payload bytes. Duplicate or out-of-range indices are
//! structural faults and reject the whole proof; an undecodable key or
//! signature merely makes that pair invalid. The proof passes when the
//! number of independently valid pairs reaches the threshold.

use std::collections::HashSet;

use base64ct::{Base64, Encoding};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::StoredKeyState;

/// One detached signature, tied to a key index.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct IndexedSignature {
    /// Index into the key state's ordered key list.
    pub idx: u32,
    /// Detached Ed25519 signature over the payload bytes, base64.
    pub sig: String,
}

/// Stateless verifier for indexed threshold signatures.
pub struct SignatureVerifier;

impl SignatureVerifier {
    /// Verify `signatures` over `payload` against `key_state`.
    pub fn verify(
        payload: &[u8],
        signatures: &[IndexedSignature],
        key_state: &StoredKeyState,
    ) -> bool {
        if signatures.is_empty() {
            return false;
        }

        let mut seen = HashSet::new();
        for signature in signatures {
            if signature.idx as usize >= key_state.keys.len() {
                tracing::debug!(idx = signature.idx, "signature index out of range");
                return false;
            }
            if !seen.insert(signature.idx) {
                tracing::debug!(idx = signature.idx, "duplicate signature index");
                return false;
            }
        }

        let threshold = key_state.threshold.max(1) as usize;
        let valid = signatures
            .iter()
            .filter(|s| Self::pair_is_valid(payload, s, key_state))
            .count();
        valid >= threshold
    }

    fn pair_is_valid(
        payload: &[u8],
        signature: &IndexedSignature,
        key_state: &StoredKeyState,
    ) -> bool {
        let Some(encoded_key) = key_state.keys.get(signature.idx as usize) else {
            return false;
        };

        let Ok(key_bytes) = Base64::decode_vec(encoded_key) else {
            return false;
        };
        let Ok(key_array) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&key_array) else {
            return false;
        };

        let Ok(sig_bytes) = Base64::decode_vec(&signature.sig) else {
            return false;
        };
        let Ok(sig) = Signature::from_slice(&sig_bytes) else {
            return false;
        };

        verifying_key.verify(payload, &sig).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ed25519_dalek::{Signer, SigningKey};

    fn signing_key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    fn key_state(keys: &[&SigningKey], threshold: u32) -> StoredKeyState {
        StoredKeyState {
            identifier: "did:rel:alice".to_string(),
            ksn: 0,
            keys: keys
                .iter()
                .map(|k| Base64::encode_string(k.verifying_key().as_bytes()))
                .collect(),
            threshold,
            last_event_ref: None,
            updated_at: Utc::now(),
        }
    }

    fn sign(key: &SigningKey, idx: u32, payload: &[u8]) -> IndexedSignature {
        IndexedSignature {
            idx,
            sig: Base64::encode_string(&key.sign(payload).to_bytes()),
        }
    }

    #[test]
    fn single_key_threshold_one() {
        let key = signing_key(1);
        let state = key_state(&[&key], 1);
        let payload = b"canonical payload";

        let good = sign(&key, 0, payload);
        assert!(SignatureVerifier::verify(payload, &[good], &state));

        let wrong_payload = sign(&key, 0, b"something else");
        assert!(!SignatureVerifier::verify(payload, &[wrong_payload], &state));
    }

    #[test]
    fn threshold_two_of_three() {
        let k0 = signing_key(1);
        let k1 = signing_key(2);
        let k2 = signing_key(3);
        let state = key_state(&[&k0, &k1, &k2], 2);
        let payload = b"canonical payload";

        let sigs = vec![sign(&k0, 0, payload), sign(&k2, 2, payload)];
        assert!(SignatureVerifier::verify(payload, &sigs, &state));

        // One valid signature is below threshold
        assert!(!SignatureVerifier::verify(
            payload,
            &[sign(&k1, 1, payload)],
            &state
        ));
    }

    #[test]
    fn invalid_extra_does_not_break_met_threshold() {
        let k0 = signing_key(1);
        let k1 = signing_key(2);
        let state = key_state(&[&k0, &k1], 1);
        let payload = b"canonical payload";

        let sigs = vec![
            sign(&k0, 0, payload),
            // Signed by the wrong key for this index
            sign(&k0, 1, payload),
        ];
        assert!(SignatureVerifier::verify(payload, &sigs, &state));
    }

    #[test]
    fn duplicate_index_rejects_proof() {
        let key = signing_key(1);
        let state = key_state(&[&key], 1);
        let payload = b"canonical payload";

        let sigs = vec![sign(&key, 0, payload), sign(&key, 0, payload)];
        assert!(!SignatureVerifier::verify(payload, &sigs, &state));
    }

    #[test]
    fn out_of_range_index_rejects_proof() {
        let key = signing_key(1);
        let state = key_state(&[&key], 1);
        let payload = b"canonical payload";

        let sigs = vec![sign(&key, 0, payload), sign(&key, 7, payload)];
        assert!(!SignatureVerifier::verify(payload, &sigs, &state));
    }

    #[test]
    fn empty_signature_list_fails() {
        let key = signing_key(1);
        let state = key_state(&[&key], 1);
        assert!(!SignatureVerifier::verify(b"payload", &[], &state));
    }

    #[test]
    fn undecodable_signature_is_just_an_invalid_pair() {
        let k0 = signing_key(1);
        let k1 = signing_key(2);
        let state = key_state(&[&k0, &k1], 1);
        let payload = b"canonical payload";

        let sigs = vec![
            IndexedSignature {
                idx: 1,
                sig: "not-base64!!".to_string(),
            },
            sign(&k0, 0, payload),
        ];
        assert!(SignatureVerifier::verify(payload, &sigs, &state));
    }
}
