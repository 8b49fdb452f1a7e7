// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Administrative operations: tiers, roles, patterns, audit.
//!
//! Every mutation takes a proof; the acting admin is whoever the proof
//! authenticates. Role requirements: `onboard_user` needs an onboarding
//! admin (or better), everything else needs a super admin.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::{AuthError, AuthProof, AuthVerifier, Purpose},
    authz::{AdminRole, PatternEngine, Tier},
    error::RequestError,
    models::{
        proof_args, AssignTierRequest, CreatePatternRequest, DeletePatternRequest,
        OnboardUserRequest, RoleRequest, TierResponse, VerifyUserRequest,
    },
    state::AppState,
    storage::{
        AssignOutcome, AuditEvent, AuditEventType, AuditRepository, AuthPatternRepository,
        RoleRepository, StoredAuthPattern, StoredRole, TierRepository,
    },
};

/// Verify the acting admin's proof and role in one step.
fn authenticate_admin(
    state: &AppState,
    proof: &AuthProof,
    purpose: Purpose,
    args: &serde_json::Value,
    required: AdminRole,
) -> Result<String, AuthError> {
    let actor = AuthVerifier::new(&state.db).verify_auth(proof, purpose, args)?;

    if !RoleRepository::new(&state.db).has_role(&actor, required)? {
        let _ = AuditRepository::new(&state.db).log(
            &AuditEvent::new(AuditEventType::AuthFailure)
                .with_actor(&actor)
                .with_details(serde_json::json!({"purpose": purpose, "required": required}))
                .failed(AuthError::InsufficientRole.error_code()),
        );
        return Err(AuthError::InsufficientRole);
    }
    Ok(actor)
}

fn assign_tier_audited(
    state: &AppState,
    actor: &str,
    subject: &str,
    tier: Tier,
    proof_ref: &str,
) -> Result<TierResponse, AuthError> {
    let outcome = TierRepository::new(&state.db).assign(
        subject,
        tier,
        actor,
        Some(proof_ref.to_string()),
    )?;

    match outcome {
        AssignOutcome::Assigned(record) => {
            let _ = AuditRepository::new(&state.db).log(
                &AuditEvent::new(AuditEventType::TierAssigned)
                    .with_actor(actor)
                    .with_subject(subject)
                    .with_details(serde_json::json!({"tier": record.tier})),
            );
            tracing::info!(subject, %tier, assigned_by = actor, "tier assigned");
            Ok(TierResponse {
                identifier: record.identifier,
                tier: record.tier,
            })
        }
        AssignOutcome::NotAbove(current) => {
            tracing::debug!(subject, %tier, %current, "tier assignment rejected");
            Err(AuthError::AlreadyAtTier)
        }
    }
}

// =============================================================================
// Tiers
// =============================================================================

#[utoipa::path(
    post,
    path = "/v1/admin/onboard",
    request_body = OnboardUserRequest,
    tag = "Admin",
    responses(
        (status = 200, body = TierResponse),
        (status = 403, description = "Actor is not an onboarding admin"),
        (status = 409, description = "Subject already at or above known")
    )
)]
pub async fn onboard_user(
    State(state): State<AppState>,
    Json(request): Json<OnboardUserRequest>,
) -> Result<Json<TierResponse>, AuthError> {
    let args = proof_args::onboard_user(&request.subject);
    let actor = authenticate_admin(
        &state,
        &request.proof,
        Purpose::OnboardUser,
        &args,
        AdminRole::OnboardingAdmin,
    )?;

    let response = assign_tier_audited(
        &state,
        &actor,
        &request.subject,
        Tier::Known,
        &request.proof.challenge_id,
    )?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/v1/admin/verify-user",
    request_body = VerifyUserRequest,
    tag = "Admin",
    responses(
        (status = 200, body = TierResponse),
        (status = 403, description = "Actor is not a super admin"),
        (status = 409, description = "Subject already verified")
    )
)]
pub async fn verify_user(
    State(state): State<AppState>,
    Json(request): Json<VerifyUserRequest>,
) -> Result<Json<TierResponse>, AuthError> {
    let args = proof_args::verify_user(&request.subject);
    let actor = authenticate_admin(
        &state,
        &request.proof,
        Purpose::VerifyUser,
        &args,
        AdminRole::SuperAdmin,
    )?;

    let response = assign_tier_audited(
        &state,
        &actor,
        &request.subject,
        Tier::Verified,
        &request.proof.challenge_id,
    )?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/v1/admin/assign-tier",
    request_body = AssignTierRequest,
    tag = "Admin",
    responses(
        (status = 200, body = TierResponse),
        (status = 403, description = "Actor is not a super admin"),
        (status = 409, description = "Target tier not above current")
    )
)]
pub async fn assign_tier(
    State(state): State<AppState>,
    Json(request): Json<AssignTierRequest>,
) -> Result<Json<TierResponse>, AuthError> {
    let args = proof_args::assign_tier(&request.subject, request.tier);
    let actor = authenticate_admin(
        &state,
        &request.proof,
        Purpose::AssignTier,
        &args,
        AdminRole::SuperAdmin,
    )?;

    let response = assign_tier_audited(
        &state,
        &actor,
        &request.subject,
        request.tier,
        &request.proof.challenge_id,
    )?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/v1/admin/tiers/{identifier}",
    params(("identifier" = String, Path, description = "Identifier to look up")),
    tag = "Admin",
    responses((status = 200, body = TierResponse))
)]
pub async fn get_tier(
    Path(identifier): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TierResponse>, RequestError> {
    let tier = TierRepository::new(&state.db).tier_of(&identifier)?;
    Ok(Json(TierResponse { identifier, tier }))
}

// =============================================================================
// Roles
// =============================================================================

#[utoipa::path(
    post,
    path = "/v1/admin/roles/grant",
    request_body = RoleRequest,
    tag = "Admin",
    responses(
        (status = 200, body = StoredRole),
        (status = 403, description = "Actor is not a super admin")
    )
)]
pub async fn grant_role(
    State(state): State<AppState>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<StoredRole>, AuthError> {
    let args = proof_args::role_change(&request.subject, request.role);
    let actor = authenticate_admin(
        &state,
        &request.proof,
        Purpose::GrantRole,
        &args,
        AdminRole::SuperAdmin,
    )?;

    let grant = RoleRepository::new(&state.db).grant(&request.subject, request.role, &actor)?;
    let _ = AuditRepository::new(&state.db).log(
        &AuditEvent::new(AuditEventType::RoleGranted)
            .with_actor(&actor)
            .with_subject(&request.subject)
            .with_details(serde_json::json!({"role": request.role})),
    );
    tracing::info!(subject = %request.subject, role = %request.role, granted_by = %actor, "role granted");
    Ok(Json(grant))
}

#[utoipa::path(
    post,
    path = "/v1/admin/roles/revoke",
    request_body = RoleRequest,
    tag = "Admin",
    responses(
        (status = 200, body = StoredRole),
        (status = 403, description = "Actor is not a super admin"),
        (status = 404, description = "No active grant to revoke")
    )
)]
pub async fn revoke_role(
    State(state): State<AppState>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<StoredRole>, RequestError> {
    let args = proof_args::role_change(&request.subject, request.role);
    let actor = authenticate_admin(
        &state,
        &request.proof,
        Purpose::RevokeRole,
        &args,
        AdminRole::SuperAdmin,
    )?;

    let revoked = RoleRepository::new(&state.db).revoke(&request.subject, request.role)?;
    let _ = AuditRepository::new(&state.db).log(
        &AuditEvent::new(AuditEventType::RoleRevoked)
            .with_actor(&actor)
            .with_subject(&request.subject)
            .with_details(serde_json::json!({"role": request.role})),
    );
    tracing::info!(subject = %request.subject, role = %request.role, revoked_by = %actor, "role revoked");
    Ok(Json(revoked))
}

// =============================================================================
// Patterns
// =============================================================================

#[utoipa::path(
    post,
    path = "/v1/admin/patterns",
    request_body = CreatePatternRequest,
    tag = "Admin",
    responses(
        (status = 200, body = StoredAuthPattern),
        (status = 422, description = "Regex does not compile")
    )
)]
pub async fn create_pattern(
    State(state): State<AppState>,
    Json(request): Json<CreatePatternRequest>,
) -> Result<Json<StoredAuthPattern>, AuthError> {
    let args = proof_args::create_pattern(&request.regex, request.priority);
    let actor = authenticate_admin(
        &state,
        &request.proof,
        Purpose::ManagePattern,
        &args,
        AdminRole::SuperAdmin,
    )?;

    // Patterns apply to the lowest tier only today
    let pattern = PatternEngine::new(&state.db, &state.regex_cache).create(
        &request.regex,
        Tier::Unknown,
        request.priority,
        request.expires_at,
        &actor,
    )?;

    let _ = AuditRepository::new(&state.db).log(
        &AuditEvent::new(AuditEventType::PatternCreated)
            .with_actor(&actor)
            .with_details(serde_json::json!({"pattern_id": pattern.id, "regex": pattern.regex})),
    );
    Ok(Json(pattern))
}

#[utoipa::path(
    delete,
    path = "/v1/admin/patterns",
    request_body = DeletePatternRequest,
    tag = "Admin",
    responses(
        (status = 200, description = "Pattern deleted"),
        (status = 404, description = "No such pattern")
    )
)]
pub async fn delete_pattern(
    State(state): State<AppState>,
    Json(request): Json<DeletePatternRequest>,
) -> Result<(), RequestError> {
    let args = proof_args::delete_pattern(&request.pattern_id);
    let actor = authenticate_admin(
        &state,
        &request.proof,
        Purpose::ManagePattern,
        &args,
        AdminRole::SuperAdmin,
    )?;

    AuthPatternRepository::new(&state.db).remove(&request.pattern_id)?;
    let _ = AuditRepository::new(&state.db).log(
        &AuditEvent::new(AuditEventType::PatternRemoved)
            .with_actor(&actor)
            .with_details(serde_json::json!({"pattern_id": request.pattern_id})),
    );
    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/admin/patterns",
    tag = "Admin",
    responses((status = 200, body = [StoredAuthPattern]))
)]
pub async fn list_patterns(
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredAuthPattern>>, RequestError> {
    let patterns = AuthPatternRepository::new(&state.db).list_all()?;
    Ok(Json(patterns))
}

// =============================================================================
// Audit
// =============================================================================

#[derive(Deserialize, IntoParams)]
pub struct AuditQuery {
    /// Maximum events to return.
    #[serde(default = "default_audit_limit")]
    pub limit: usize,
    /// Restrict to events involving this identifier.
    pub identifier: Option<String>,
}

fn default_audit_limit() -> usize {
    50
}

#[utoipa::path(
    get,
    path = "/v1/admin/audit",
    params(AuditQuery),
    tag = "Admin",
    responses((status = 200, body = [AuditEvent]))
)]
pub async fn recent_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEvent>>, RequestError> {
    let repo = AuditRepository::new(&state.db);
    let events = match query.identifier {
        Some(identifier) => repo.recent_for(&identifier, query.limit)?,
        None => repo.recent(query.limit)?,
    };
    Ok(Json(events))
}
