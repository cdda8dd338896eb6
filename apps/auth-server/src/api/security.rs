// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

//! Authentication endpoints under `/s`.

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::{Auth, AuthError, IssuedToken},
    models::{LoginRequest, PasswordChangeRequest, RegisterRequest},
    state::AppState,
};

/// Log in with campus or local credentials.
///
/// Every failure (bad credentials, SSO outage, storage error) yields the same
/// 401 body.
#[utoipa::path(
    post,
    path = "/s/login",
    tag = "Security",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session token issued", body = IssuedToken),
        (status = 401, description = "Authentication failed")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<IssuedToken>, AuthError> {
    let issued = state.auth.login(request).await?;
    Ok(Json(issued))
}

/// Register a local account and receive a session token.
#[utoipa::path(
    post,
    path = "/s/register",
    tag = "Security",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created, session token issued", body = IssuedToken),
        (status = 400, description = "Invalid registration"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<IssuedToken>, AuthError> {
    let issued = state.auth.register(request).await?;
    Ok(Json(issued))
}

/// Exchange a valid session token for a fresh one.
#[utoipa::path(
    get,
    path = "/s/refresh",
    tag = "Security",
    responses(
        (status = 200, description = "Fresh session token", body = IssuedToken),
        (status = 401, description = "Missing, invalid or expired token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn refresh(
    State(state): State<AppState>,
    Auth(principal): Auth,
) -> Result<Json<IssuedToken>, AuthError> {
    let issued = state.auth.refresh(&principal)?;
    Ok(Json(issued))
}

/// Change the password of a local account.
#[utoipa::path(
    post,
    path = "/s/change-pswd",
    tag = "Security",
    request_body = PasswordChangeRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Password change rejected"),
        (status = 401, description = "Missing, invalid or expired token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Json(request): Json<PasswordChangeRequest>,
) -> Result<StatusCode, AuthError> {
    state.auth.change_password(&principal, request).await?;
    Ok(StatusCode::NO_CONTENT)
}
