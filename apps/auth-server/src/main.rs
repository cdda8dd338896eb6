// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

use std::{net::SocketAddr, sync::Arc};

use tokio::{net::TcpListener, signal};
use tracing::{error, info};

use moveit_auth_server::{
    api::router,
    auth::{AuthService, CasClient, TokenIssuer},
    config::AppConfig,
    logging::init_logging,
    state::AppState,
    storage::UserDatabase,
};

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("FATAL: invalid configuration: {e}");
        std::process::exit(1);
    });

    init_logging(config.log_format);

    let db_path = config.user_db_path();
    let users = Arc::new(UserDatabase::open(&db_path).expect("Failed to open user database"));
    info!(path = %db_path.display(), "User database ready");

    let cas = CasClient::new(&config.cas).expect("Failed to build CAS client");
    info!(cas = %cas.login_url(), timeout_secs = config.cas.timeout.as_secs(), "CAS delegate ready");

    let tokens = TokenIssuer::new(&config.token);
    let state = AppState::new(AuthService::new(cas, Arc::clone(&users), tokens), users);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Failed to parse bind address");

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    info!(%addr, "MoveIt auth server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server failed");

    info!("Server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
