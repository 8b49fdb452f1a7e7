// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{
    auth::AuthError,
    authz::{AccessControlEngine, AuthorizationEngine, SendDecision},
    models::CanSendRequest,
    state::AppState,
};

/// The combined send decision the transport consumes: tier gate and quota
/// first, then the recipient's allow/deny overrides.
#[utoipa::path(
    post,
    path = "/v1/authz/can-send",
    request_body = CanSendRequest,
    tag = "Authorization",
    responses((status = 200, body = SendDecision))
)]
pub async fn can_send(
    State(state): State<AppState>,
    Json(request): Json<CanSendRequest>,
) -> Result<Json<SendDecision>, AuthError> {
    let decision = AuthorizationEngine::new(&state.db, &state.regex_cache).can_send(
        &request.from,
        &request.to,
        request.message_type,
        request.increment_rate,
    )?;

    if !decision.allowed {
        return Ok(Json(decision));
    }

    // Per-recipient overrides, deny dominant
    match AccessControlEngine::new(&state.db).check_delivery(&request.from, &request.to) {
        Ok(()) => Ok(Json(decision)),
        Err(err @ (AuthError::DenyListed | AuthError::NotOnAllowList)) => {
            Ok(Json(SendDecision {
                allowed: false,
                reason: Some(err.to_string()),
                tier: decision.tier,
            }))
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{AdminRole, MessageType, Tier};
    use crate::state::test_support::test_state;
    use crate::storage::{AccessList, AccessListRepository, RoleRepository, TierRepository};

    async fn decide(state: &AppState, from: &str, to: &str) -> SendDecision {
        let Json(decision) = can_send(
            State(state.clone()),
            Json(CanSendRequest {
                from: from.to_string(),
                to: to.to_string(),
                message_type: MessageType::Direct,
                increment_rate: false,
            }),
        )
        .await
        .expect("decision");
        decision
    }

    #[tokio::test]
    async fn unknown_sender_is_gated() {
        let (state, _dir) = test_state();
        RoleRepository::new(&state.db)
            .grant("did:rel:admin", AdminRole::OnboardingAdmin, "did:rel:root")
            .unwrap();

        assert!(decide(&state, "did:rel:new", "did:rel:admin").await.allowed);

        let denied = decide(&state, "did:rel:new", "did:rel:carol").await;
        assert!(!denied.allowed);
        assert!(denied.reason.unwrap().contains("onboarding admins"));
    }

    #[tokio::test]
    async fn deny_list_overrides_tier_allow() {
        let (state, _dir) = test_state();
        TierRepository::new(&state.db)
            .assign("did:rel:alice", Tier::Known, "did:rel:admin", None)
            .unwrap();
        AccessListRepository::new(&state.db)
            .add(AccessList::Allow, "did:rel:bob", "did:rel:alice", None)
            .unwrap();
        AccessListRepository::new(&state.db)
            .add(AccessList::Deny, "did:rel:bob", "did:rel:alice", None)
            .unwrap();

        let decision = decide(&state, "did:rel:alice", "did:rel:bob").await;
        assert!(!decision.allowed);
        assert_eq!(decision.reason.as_deref(), Some("Sender is on deny-list"));
        assert_eq!(decision.tier, Tier::Known);
    }

    #[tokio::test]
    async fn active_allow_list_excludes_unlisted_sender() {
        let (state, _dir) = test_state();
        let tiers = TierRepository::new(&state.db);
        tiers
            .assign("did:rel:alice", Tier::Known, "did:rel:admin", None)
            .unwrap();
        tiers
            .assign("did:rel:carol", Tier::Known, "did:rel:admin", None)
            .unwrap();
        AccessListRepository::new(&state.db)
            .add(AccessList::Allow, "did:rel:bob", "did:rel:alice", None)
            .unwrap();

        assert!(decide(&state, "did:rel:alice", "did:rel:bob").await.allowed);

        let denied = decide(&state, "did:rel:carol", "did:rel:bob").await;
        assert!(!denied.allowed);
        assert_eq!(denied.reason.as_deref(), Some("Sender not on allow-list"));
    }
}
