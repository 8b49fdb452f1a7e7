// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{AuthProof, ChallengePayload, IndexedSignature, IssuedChallenge, OpenedSession, Purpose, Scope},
    authz::{AdminRole, MessageType, SendDecision, Tier},
    models::{
        AccessListAddRequest, AccessListAddResponse, AccessListClearRequest,
        AccessListClearResponse, AccessListRemoveRequest, AssignTierRequest, CanSendRequest,
        ChallengeRequest, CreatePatternRequest, DeletePatternRequest, OnboardUserRequest,
        OpenSessionRequest, RegisterKeysRequest, RoleRequest, RotateKeysRequest, TierResponse,
        ValidateSessionRequest, ValidateSessionResponse, VerifyRequest, VerifyResponse,
        VerifyUserRequest,
    },
    state::AppState,
    storage::{
        AccessList, AuditEvent, AuditEventType, StoredAuthPattern, StoredKeyState,
        StoredListEntry, StoredRole,
    },
};

pub mod access;
pub mod admin;
pub mod challenges;
pub mod health;
pub mod keys;
pub mod send;
pub mod session;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/challenges", post(challenges::issue_challenge))
        .route("/auth/verify", post(challenges::verify_proof))
        .route("/auth/sessions", post(session::open_session))
        .route("/auth/sessions/validate", post(session::validate_session))
        .route("/authz/can-send", post(send::can_send))
        .route("/access/{list}/add", post(access::add_entry))
        .route("/access/{list}/remove", post(access::remove_entry))
        .route("/access/{list}/clear", post(access::clear_list))
        .route("/access/{list}/{owner}", get(access::list_entries))
        .route("/keys/register", post(keys::register_keys))
        .route("/keys/rotate", post(keys::rotate_keys))
        .route("/keys/{identifier}", get(keys::get_key_state))
        .route("/admin/onboard", post(admin::onboard_user))
        .route("/admin/verify-user", post(admin::verify_user))
        .route("/admin/assign-tier", post(admin::assign_tier))
        .route("/admin/tiers/{identifier}", get(admin::get_tier))
        .route("/admin/roles/grant", post(admin::grant_role))
        .route("/admin/roles/revoke", post(admin::revoke_role))
        .route(
            "/admin/patterns",
            post(admin::create_pattern)
                .get(admin::list_patterns)
                .delete(admin::delete_pattern),
        )
        .route("/admin/audit", get(admin::recent_audit));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        challenges::issue_challenge,
        challenges::verify_proof,
        session::open_session,
        session::validate_session,
        send::can_send,
        access::add_entry,
        access::remove_entry,
        access::clear_list,
        access::list_entries,
        keys::register_keys,
        keys::rotate_keys,
        keys::get_key_state,
        admin::onboard_user,
        admin::verify_user,
        admin::assign_tier,
        admin::get_tier,
        admin::grant_role,
        admin::revoke_role,
        admin::create_pattern,
        admin::delete_pattern,
        admin::list_patterns,
        admin::recent_audit
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            ChallengeRequest,
            IssuedChallenge,
            ChallengePayload,
            Purpose,
            AuthProof,
            IndexedSignature,
            VerifyRequest,
            VerifyResponse,
            OpenSessionRequest,
            OpenedSession,
            Scope,
            ValidateSessionRequest,
            ValidateSessionResponse,
            CanSendRequest,
            SendDecision,
            MessageType,
            Tier,
            AdminRole,
            AccessList,
            StoredListEntry,
            AccessListAddRequest,
            AccessListAddResponse,
            AccessListRemoveRequest,
            AccessListClearRequest,
            AccessListClearResponse,
            RegisterKeysRequest,
            RotateKeysRequest,
            StoredKeyState,
            OnboardUserRequest,
            VerifyUserRequest,
            AssignTierRequest,
            TierResponse,
            RoleRequest,
            StoredRole,
            CreatePatternRequest,
            DeletePatternRequest,
            StoredAuthPattern,
            AuditEvent,
            AuditEventType
        )
    ),
    tags(
        (name = "Health", description = "Service health probes"),
        (name = "Auth", description = "Challenge issuance and proof verification"),
        (name = "Sessions", description = "Session token lifecycle"),
        (name = "Authorization", description = "Send decisions"),
        (name = "Access Lists", description = "Per-recipient allow/deny overrides"),
        (name = "Keys", description = "Key state registration and rotation"),
        (name = "Admin", description = "Tiers, roles, patterns and audit")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (state, _dir) = test_state();
        let app = router(state);
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }
}
