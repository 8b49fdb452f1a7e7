// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{
    auth::{AuthError, AuthVerifier, ChallengeIssuer, IssuedChallenge},
    models::{ChallengeRequest, VerifyRequest, VerifyResponse},
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/v1/auth/challenges",
    request_body = ChallengeRequest,
    tag = "Auth",
    responses((status = 200, body = IssuedChallenge))
)]
pub async fn issue_challenge(
    State(state): State<AppState>,
    Json(request): Json<ChallengeRequest>,
) -> Result<Json<IssuedChallenge>, AuthError> {
    let issued = ChallengeIssuer::new(&state.db).issue(
        &request.identifier,
        request.purpose,
        &request.args,
    )?;
    Ok(Json(issued))
}

#[utoipa::path(
    post,
    path = "/v1/auth/verify",
    request_body = VerifyRequest,
    tag = "Auth",
    responses(
        (status = 200, body = VerifyResponse),
        (status = 401, description = "Proof rejected")
    )
)]
pub async fn verify_proof(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, AuthError> {
    let identifier =
        AuthVerifier::new(&state.db).verify_auth(&request.proof, request.purpose, &request.args)?;
    Ok(Json(VerifyResponse { identifier }))
}
