// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Allow/deny list management.
//!
//! The owner of the list is never a request field: it is whoever the proof
//! authenticates. The proof args bind the list, the action and the other
//! identifier, so a captured challenge cannot be replayed against a
//! different entry.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    auth::{AuthVerifier, Purpose},
    error::RequestError,
    models::{
        proof_args, AccessListAddRequest, AccessListAddResponse, AccessListClearRequest,
        AccessListClearResponse, AccessListRemoveRequest,
    },
    state::AppState,
    storage::{
        AccessList, AccessListRepository, AuditEvent, AuditEventType, AuditRepository,
        StoredListEntry,
    },
};

fn purpose_for(list: AccessList) -> Purpose {
    match list {
        AccessList::Allow => Purpose::ManageAllowList,
        AccessList::Deny => Purpose::ManageDenyList,
    }
}

fn audit_change(state: &AppState, owner: &str, list: AccessList, action: &str, detail: serde_json::Value) {
    let _ = AuditRepository::new(&state.db).log(
        &AuditEvent::new(AuditEventType::AccessListChanged)
            .with_actor(owner)
            .with_details(serde_json::json!({
                "list": list,
                "action": action,
                "detail": detail,
            })),
    );
}

#[utoipa::path(
    post,
    path = "/v1/access/{list}/add",
    params(("list" = AccessList, Path, description = "allow or deny")),
    request_body = AccessListAddRequest,
    tag = "Access Lists",
    responses((status = 200, body = AccessListAddResponse))
)]
pub async fn add_entry(
    Path(list): Path<AccessList>,
    State(state): State<AppState>,
    Json(request): Json<AccessListAddRequest>,
) -> Result<Json<AccessListAddResponse>, RequestError> {
    let args = proof_args::access_list_add(&list.to_string(), &request.other);
    let owner = AuthVerifier::new(&state.db).verify_auth(&request.proof, purpose_for(list), &args)?;

    let outcome =
        AccessListRepository::new(&state.db).add(list, &owner, &request.other, request.note)?;
    audit_change(
        &state,
        &owner,
        list,
        "add",
        serde_json::json!({"other": request.other}),
    );

    Ok(Json(AccessListAddResponse {
        already_exists: outcome.already_exists(),
    }))
}

#[utoipa::path(
    post,
    path = "/v1/access/{list}/remove",
    params(("list" = AccessList, Path, description = "allow or deny")),
    request_body = AccessListRemoveRequest,
    tag = "Access Lists",
    responses(
        (status = 200, description = "Entry removed"),
        (status = 404, description = "No such entry")
    )
)]
pub async fn remove_entry(
    Path(list): Path<AccessList>,
    State(state): State<AppState>,
    Json(request): Json<AccessListRemoveRequest>,
) -> Result<(), RequestError> {
    let args = proof_args::access_list_remove(&list.to_string(), &request.other);
    let owner = AuthVerifier::new(&state.db).verify_auth(&request.proof, purpose_for(list), &args)?;

    AccessListRepository::new(&state.db).remove(list, &owner, &request.other)?;
    audit_change(
        &state,
        &owner,
        list,
        "remove",
        serde_json::json!({"other": request.other}),
    );
    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/access/{list}/clear",
    params(("list" = AccessList, Path, description = "allow or deny")),
    request_body = AccessListClearRequest,
    tag = "Access Lists",
    responses((status = 200, body = AccessListClearResponse))
)]
pub async fn clear_list(
    Path(list): Path<AccessList>,
    State(state): State<AppState>,
    Json(request): Json<AccessListClearRequest>,
) -> Result<Json<AccessListClearResponse>, RequestError> {
    let args = proof_args::access_list_clear(&list.to_string());
    let owner = AuthVerifier::new(&state.db).verify_auth(&request.proof, purpose_for(list), &args)?;

    let removed = AccessListRepository::new(&state.db).clear(list, &owner)?;
    audit_change(
        &state,
        &owner,
        list,
        "clear",
        serde_json::json!({"removed": removed}),
    );
    Ok(Json(AccessListClearResponse { removed }))
}

#[utoipa::path(
    get,
    path = "/v1/access/{list}/{owner}",
    params(
        ("list" = AccessList, Path, description = "allow or deny"),
        ("owner" = String, Path, description = "List owner identifier")
    ),
    tag = "Access Lists",
    responses((status = 200, body = [StoredListEntry]))
)]
pub async fn list_entries(
    Path((list, owner)): Path<(AccessList, String)>,
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredListEntry>>, RequestError> {
    let entries = AccessListRepository::new(&state.db).list(list, &owner)?;
    Ok(Json(entries))
}
