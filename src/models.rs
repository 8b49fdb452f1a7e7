// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures for the REST API. All types derive
//! `Serialize`/`Deserialize` and `ToSchema` for automatic JSON handling and
//! OpenAPI documentation.
//!
//! Every mutating request carries an [`AuthProof`]: the acting identifier is
//! whoever the proof authenticates, never a field the caller asserts.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{AuthProof, Purpose, Scope};
use crate::authz::{AdminRole, MessageType, Tier};

// =============================================================================
// Challenge / Proof
// =============================================================================

/// Request a challenge for one specific operation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChallengeRequest {
    /// The identifier that will sign the challenge.
    pub identifier: String,
    /// The operation being authorized.
    pub purpose: Purpose,
    /// The exact operation arguments; their hash is bound into the payload.
    #[schema(value_type = Object)]
    pub args: serde_json::Value,
}

/// Verify a proof without performing any operation (diagnostics and
/// transport-side pre-checks).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyRequest {
    /// The signed proof.
    pub proof: AuthProof,
    /// Expected purpose.
    pub purpose: Purpose,
    /// The operation arguments to re-hash.
    #[schema(value_type = Object)]
    pub args: serde_json::Value,
}

/// The authenticated identifier a valid proof resolves to.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyResponse {
    pub identifier: String,
}

// =============================================================================
// Sessions
// =============================================================================

/// Exchange a fresh proof for a session token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OpenSessionRequest {
    /// Proof with purpose `open_session`, args binding `{scopes, ttl_ms}`.
    pub proof: AuthProof,
    /// Requested scopes.
    pub scopes: Vec<Scope>,
    /// Requested lifetime in milliseconds, capped at 60000.
    pub ttl_ms: i64,
}

/// Validate a session token for one operation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidateSessionRequest {
    /// The bearer token.
    pub token: String,
    /// The identifier the caller claims to be.
    pub identifier: String,
    /// The scope the operation needs.
    pub scope: Scope,
}

/// Fail-closed validation verdict.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidateSessionResponse {
    pub valid: bool,
}

// =============================================================================
// Send Authorization
// =============================================================================

/// Ask whether a send may proceed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CanSendRequest {
    /// Sending identifier.
    pub from: String,
    /// Receiving identifier.
    pub to: String,
    /// Kind of envelope.
    pub message_type: MessageType,
    /// Count this send against the quota (the transport sets this on the
    /// real send path; probes leave it off).
    #[serde(default)]
    pub increment_rate: bool,
}

// =============================================================================
// Access Lists
// =============================================================================

/// Add an identifier to the authenticated owner's allow- or deny-list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessListAddRequest {
    /// Proof with the matching `manage_*_list` purpose.
    pub proof: AuthProof,
    /// The identifier to list.
    pub other: String,
    /// Free-form note (allow) or reason (deny).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Outcome of an idempotent list add.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessListAddResponse {
    /// Whether the entry already existed.
    pub already_exists: bool,
}

/// Remove an identifier from the authenticated owner's list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessListRemoveRequest {
    /// Proof with the matching `manage_*_list` purpose.
    pub proof: AuthProof,
    /// The identifier to delist.
    pub other: String,
}

/// Clear the authenticated owner's list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessListClearRequest {
    /// Proof with the matching `manage_*_list` purpose.
    pub proof: AuthProof,
}

/// Result of a list clear.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessListClearResponse {
    /// Entries removed; zero when the list was already empty.
    pub removed: usize,
}

// =============================================================================
// Key States
// =============================================================================

/// Register an identifier's initial key state (ksn 0).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterKeysRequest {
    /// The identifier being registered.
    pub identifier: String,
    /// Ordered Ed25519 verification keys, base64.
    pub keys: Vec<String>,
    /// Signing threshold.
    pub threshold: u32,
    /// Reference to the originating key event, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event_ref: Option<String>,
}

/// Replace an identifier's key state wholesale (ksn + 1).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RotateKeysRequest {
    /// The identifier rotating.
    pub identifier: String,
    /// The replacement key set, base64.
    pub keys: Vec<String>,
    /// New signing threshold.
    pub threshold: u32,
    /// Reference to the rotation event, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event_ref: Option<String>,
}

// =============================================================================
// Admin: Tiers & Roles
// =============================================================================

/// Onboard an unknown identifier to `known`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OnboardUserRequest {
    /// Proof by an onboarding admin, purpose `onboard_user`.
    pub proof: AuthProof,
    /// The identifier being onboarded.
    pub subject: String,
}

/// Raise an identifier to `verified`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyUserRequest {
    /// Proof by a super admin, purpose `verify_user`.
    pub proof: AuthProof,
    /// The identifier being verified.
    pub subject: String,
}

/// Assign an explicit (strictly higher) tier.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignTierRequest {
    /// Proof by a super admin, purpose `assign_tier`.
    pub proof: AuthProof,
    /// The identifier whose tier changes.
    pub subject: String,
    /// The target tier.
    pub tier: Tier,
}

/// The resulting tier assignment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TierResponse {
    pub identifier: String,
    pub tier: Tier,
}

/// Grant or revoke an admin role.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleRequest {
    /// Proof by a super admin, purpose `grant_role`/`revoke_role`.
    pub proof: AuthProof,
    /// The identifier whose role changes.
    pub subject: String,
    /// The role to grant or revoke.
    pub role: AdminRole,
}

// =============================================================================
// Admin: Patterns
// =============================================================================

/// Create an authorization pattern.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePatternRequest {
    /// Proof by a super admin, purpose `manage_pattern`.
    pub proof: AuthProof,
    /// Regex matched against recipient identifiers. Must compile.
    pub regex: String,
    /// Evaluation priority; higher runs first.
    pub priority: i32,
    /// Optional expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Delete an authorization pattern.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeletePatternRequest {
    /// Proof by a super admin, purpose `manage_pattern`.
    pub proof: AuthProof,
    /// The pattern to delete.
    pub pattern_id: String,
}

/// Args helpers shared by handlers and clients: the exact objects bound into
/// challenges for each privileged operation.
pub mod proof_args {
    use super::*;

    pub fn access_list_add(list: &str, other: &str) -> serde_json::Value {
        serde_json::json!({"list": list, "action": "add", "other": other})
    }

    pub fn access_list_remove(list: &str, other: &str) -> serde_json::Value {
        serde_json::json!({"list": list, "action": "remove", "other": other})
    }

    pub fn access_list_clear(list: &str) -> serde_json::Value {
        serde_json::json!({"list": list, "action": "clear"})
    }

    pub fn onboard_user(subject: &str) -> serde_json::Value {
        serde_json::json!({"subject": subject})
    }

    pub fn verify_user(subject: &str) -> serde_json::Value {
        serde_json::json!({"subject": subject})
    }

    pub fn assign_tier(subject: &str, tier: Tier) -> serde_json::Value {
        serde_json::json!({"subject": subject, "tier": tier})
    }

    pub fn role_change(subject: &str, role: AdminRole) -> serde_json::Value {
        serde_json::json!({"subject": subject, "role": role})
    }

    pub fn create_pattern(regex: &str, priority: i32) -> serde_json::Value {
        serde_json::json!({"regex": regex, "priority": priority})
    }

    pub fn delete_pattern(pattern_id: &str) -> serde_json::Value {
        serde_json::json!({"pattern_id": pattern_id})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_send_defaults_to_read_only() {
        let request: CanSendRequest = serde_json::from_str(
            r#"{"from":"did:rel:a","to":"did:rel:b","message_type":"direct"}"#,
        )
        .unwrap();
        assert!(!request.increment_rate);
    }

    #[test]
    fn proof_args_are_canonical_inputs() {
        // Same args regardless of construction site
        assert_eq!(
            proof_args::access_list_add("allow", "did:rel:bob"),
            serde_json::json!({"action": "add", "list": "allow", "other": "did:rel:bob"})
        );
    }
}
