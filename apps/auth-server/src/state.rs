// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

use std::sync::Arc;

use crate::auth::AuthService;
use crate::storage::UserDatabase;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserDatabase>,
}

impl AppState {
    pub fn new(auth: AuthService, users: Arc<UserDatabase>) -> Self {
        Self {
            auth: Arc::new(auth),
            users,
        }
    }
}

/// State backed by a throwaway database and a CAS portal at `cas_url`.
#[cfg(test)]
pub fn test_state(cas_url: &str) -> (AppState, tempfile::TempDir) {
    use std::time::Duration;

    use crate::auth::{CasClient, TokenIssuer};
    use crate::config::{CasConfig, TokenConfig};

    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let users = Arc::new(
        UserDatabase::open(&temp_dir.path().join("users.redb")).expect("Failed to open database"),
    );
    let cas = CasClient::new(&CasConfig {
        base_url: url::Url::parse(cas_url).expect("Invalid CAS URL"),
        timeout: Duration::from_secs(5),
    })
    .expect("Failed to build CAS client");
    let tokens = TokenIssuer::new(&TokenConfig {
        secret: "0123456789abcdef0123456789abcdef".to_string(),
        issuer: "moveit-api".to_string(),
        validity: Duration::from_secs(3600),
        remember_me_validity: Duration::from_secs(30 * 24 * 3600),
    });

    let service = AuthService::new(cas, Arc::clone(&users), tokens);
    (AppState::new(service, users), temp_dir)
}
