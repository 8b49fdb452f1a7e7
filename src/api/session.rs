// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{
    auth::{AuthError, OpenedSession, SessionTokenManager},
    models::{OpenSessionRequest, ValidateSessionRequest, ValidateSessionResponse},
    state::AppState,
    storage::{AuditEvent, AuditEventType, AuditRepository},
};

#[utoipa::path(
    post,
    path = "/v1/auth/sessions",
    request_body = OpenSessionRequest,
    tag = "Sessions",
    responses(
        (status = 200, body = OpenedSession),
        (status = 401, description = "Proof rejected"),
        (status = 422, description = "Requested lifetime exceeds the cap")
    )
)]
pub async fn open_session(
    State(state): State<AppState>,
    Json(request): Json<OpenSessionRequest>,
) -> Result<Json<OpenedSession>, AuthError> {
    let session = SessionTokenManager::new(&state.db).open_session(
        &request.proof,
        &request.scopes,
        request.ttl_ms,
    )?;

    let _ = AuditRepository::new(&state.db).log(
        &AuditEvent::new(AuditEventType::SessionOpened)
            .with_actor(&session.identifier)
            .with_details(serde_json::json!({
                "scopes": request.scopes,
                "ttl_ms": request.ttl_ms,
            })),
    );

    Ok(Json(session))
}

/// Lightweight per-operation validation for streaming collaborators.
/// Fail-closed: the response is `valid: false` for any reason.
#[utoipa::path(
    post,
    path = "/v1/auth/sessions/validate",
    request_body = ValidateSessionRequest,
    tag = "Sessions",
    responses((status = 200, body = ValidateSessionResponse))
)]
pub async fn validate_session(
    State(state): State<AppState>,
    Json(request): Json<ValidateSessionRequest>,
) -> Json<ValidateSessionResponse> {
    let valid = SessionTokenManager::new(&state.db).validate(
        &request.token,
        &request.identifier,
        request.scope,
    );
    Json(ValidateSessionResponse { valid })
}
