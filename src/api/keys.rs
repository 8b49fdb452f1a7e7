// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key state registration and rotation.
//!
//! Key material is maintained by the identity layer; this surface is the
//! mechanical record feeding proof verification. Rotation replaces the key
//! set wholesale and bumps the ksn, which immediately invalidates every
//! outstanding challenge proof and session token signed under the old ksn.

use axum::{
    extract::{Path, State},
    Json,
};
use base64ct::{Base64, Encoding};

use crate::{
    error::{ApiError, RequestError},
    models::{RegisterKeysRequest, RotateKeysRequest},
    state::AppState,
    storage::{AuditEvent, AuditEventType, AuditRepository, KeyStateRepository, StoredKeyState},
};

fn validate_key_set(keys: &[String], threshold: u32) -> Result<(), ApiError> {
    if keys.is_empty() {
        return Err(ApiError::bad_request("key set must not be empty"));
    }
    if threshold == 0 || threshold as usize > keys.len() {
        return Err(ApiError::bad_request(
            "threshold must be between 1 and the number of keys",
        ));
    }
    for key in keys {
        let decoded = Base64::decode_vec(key)
            .map_err(|_| ApiError::bad_request("keys must be base64-encoded"))?;
        if decoded.len() != 32 {
            return Err(ApiError::bad_request(
                "keys must be 32-byte Ed25519 verification keys",
            ));
        }
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/keys/register",
    request_body = RegisterKeysRequest,
    tag = "Keys",
    responses(
        (status = 200, body = StoredKeyState),
        (status = 409, description = "Identifier already registered")
    )
)]
pub async fn register_keys(
    State(state): State<AppState>,
    Json(request): Json<RegisterKeysRequest>,
) -> Result<Json<StoredKeyState>, RequestError> {
    validate_key_set(&request.keys, request.threshold)?;

    let key_state = KeyStateRepository::new(&state.db).register(
        &request.identifier,
        request.keys,
        request.threshold,
        request.last_event_ref,
    )?;

    let _ = AuditRepository::new(&state.db).log(
        &AuditEvent::new(AuditEventType::KeyStateRegistered)
            .with_subject(&request.identifier)
            .with_details(serde_json::json!({"threshold": key_state.threshold})),
    );
    tracing::info!(identifier = %request.identifier, "registered key state");

    Ok(Json(key_state))
}

#[utoipa::path(
    post,
    path = "/v1/keys/rotate",
    request_body = RotateKeysRequest,
    tag = "Keys",
    responses(
        (status = 200, body = StoredKeyState),
        (status = 404, description = "Identifier not registered")
    )
)]
pub async fn rotate_keys(
    State(state): State<AppState>,
    Json(request): Json<RotateKeysRequest>,
) -> Result<Json<StoredKeyState>, RequestError> {
    validate_key_set(&request.keys, request.threshold)?;

    let key_state = KeyStateRepository::new(&state.db).rotate(
        &request.identifier,
        request.keys,
        request.threshold,
        request.last_event_ref,
    )?;

    let _ = AuditRepository::new(&state.db).log(
        &AuditEvent::new(AuditEventType::KeyStateRotated)
            .with_subject(&request.identifier)
            .with_details(serde_json::json!({"ksn": key_state.ksn})),
    );
    tracing::info!(identifier = %request.identifier, ksn = key_state.ksn, "rotated key state");

    Ok(Json(key_state))
}

#[utoipa::path(
    get,
    path = "/v1/keys/{identifier}",
    params(("identifier" = String, Path, description = "Identifier to look up")),
    tag = "Keys",
    responses(
        (status = 200, body = StoredKeyState),
        (status = 404, description = "Identifier not registered")
    )
)]
pub async fn get_key_state(
    Path(identifier): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StoredKeyState>, RequestError> {
    let key_state = KeyStateRepository::new(&state.db)
        .get(&identifier)?
        .ok_or_else(|| ApiError::not_found("Identifier not registered"))?;
    Ok(Json(key_state))
}
