// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, net::SocketAddr, path::PathBuf};

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use relational_messenger_auth::api::router;
use relational_messenger_auth::authz::AdminRole;
use relational_messenger_auth::config::{DATA_DIR_ENV, SEED_SUPER_ADMIN_ENV};
use relational_messenger_auth::state::AppState;
use relational_messenger_auth::storage::{AuthDatabase, RoleRepository};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let data_dir = env::var(DATA_DIR_ENV).unwrap_or_else(|_| "/data".to_string());
    let db_path: PathBuf = PathBuf::from(&data_dir).join("auth.redb");

    let db = AuthDatabase::open(&db_path).expect("Failed to open auth database");
    tracing::info!(path = %db_path.display(), "auth database open");

    // Bootstrap: without one super admin no tier or role mutation can ever
    // be authorized
    if let Ok(identifier) = env::var(SEED_SUPER_ADMIN_ENV) {
        RoleRepository::new(&db)
            .grant(&identifier, AdminRole::SuperAdmin, "bootstrap")
            .expect("Failed to seed super admin");
        tracing::info!(identifier = %identifier, "seeded super admin from environment");
    }

    let state = AppState::new(db);
    let app = router(state);

    // Parse bind address
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    tracing::info!(%addr, "Relational Messenger auth core listening (docs at /docs)");

    // Graceful shutdown on ctrl-c
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            signal_token.cancel();
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .expect("HTTP server failed");
}
