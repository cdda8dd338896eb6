// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

//! Axum extractor for authenticated requests.
//!
//! Use the `Auth` extractor in handlers to require a valid session token:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(principal): Auth) -> impl IntoResponse {
//!     // principal.user_id, principal.roles
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AuthError, Principal};
use crate::state::AppState;

/// Extractor for a verified bearer token.
pub struct Auth(pub Principal);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidAuthHeader)?;

        let principal = state.auth.tokens().verify(token)?;
        Ok(Auth(principal))
    }
}
