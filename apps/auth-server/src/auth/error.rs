// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

//! Authentication errors.
//!
//! Login failures carry one of four distinguishing kinds (`auth_failed`,
//! `session_cookie_missing`, `service_unavailable`, `persistence_failure`).
//! The kind is kept intact everywhere inside the service and written to the
//! logs; [`IntoResponse`] collapses all four into one generic
//! `authentication_failed` body so clients never learn which step failed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Message returned to clients for any failed login.
pub const GENERIC_AUTH_FAILURE: &str = "Authentication failed";

/// Authentication error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Credentials rejected, by CAS or by the local credential store
    AuthFailed,
    /// CAS accepted the credentials but did not hand out its session cookie
    SessionCookieMissing,
    /// CAS unreachable, timing out or answering with errors
    ServiceUnavailable(String),
    /// Local user store failed while provisioning or loading the account
    PersistenceFailure(String),
    /// No authorization header present
    MissingAuthHeader,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// Token is malformed
    MalformedToken,
    /// Token signature is invalid
    InvalidSignature,
    /// Token has expired
    TokenExpired,
    /// Token issuer is invalid
    InvalidIssuer,
    /// Username already registered
    UsernameTaken,
    /// Registration payload rejected
    InvalidRegistration(String),
    /// Password change rejected
    PasswordChangeRejected(String),
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Whether this is one of the four login failure kinds that share a
    /// single client-facing response.
    pub fn is_login_failure(&self) -> bool {
        matches!(
            self,
            AuthError::AuthFailed
                | AuthError::SessionCookieMissing
                | AuthError::ServiceUnavailable(_)
                | AuthError::PersistenceFailure(_)
        )
    }

    /// Internal error code; distinguishes every variant.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::AuthFailed => "auth_failed",
            AuthError::SessionCookieMissing => "session_cookie_missing",
            AuthError::ServiceUnavailable(_) => "service_unavailable",
            AuthError::PersistenceFailure(_) => "persistence_failure",
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::UsernameTaken => "username_taken",
            AuthError::InvalidRegistration(_) => "invalid_registration",
            AuthError::PasswordChangeRejected(_) => "password_change_rejected",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Error code exposed to clients.
    pub fn public_code(&self) -> &'static str {
        if self.is_login_failure() {
            "authentication_failed"
        } else {
            self.error_code()
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::AuthFailed
            | AuthError::SessionCookieMissing
            | AuthError::ServiceUnavailable(_)
            | AuthError::PersistenceFailure(_)
            | AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::MalformedToken
            | AuthError::InvalidSignature
            | AuthError::TokenExpired
            | AuthError::InvalidIssuer => StatusCode::UNAUTHORIZED,
            AuthError::UsernameTaken => StatusCode::CONFLICT,
            AuthError::InvalidRegistration(_) | AuthError::PasswordChangeRejected(_) => {
                StatusCode::BAD_REQUEST
            }
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message exposed to clients.
    pub fn public_message(&self) -> String {
        match self {
            e if e.is_login_failure() => GENERIC_AUTH_FAILURE.to_string(),
            AuthError::InternalError(_) => "Internal authentication error".to_string(),
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::AuthFailed => write!(f, "Credentials were rejected"),
            AuthError::SessionCookieMissing => {
                write!(f, "CAS accepted the credentials but sent no lemonldap cookie")
            }
            AuthError::ServiceUnavailable(msg) => write!(f, "CAS unavailable: {msg}"),
            AuthError::PersistenceFailure(msg) => write!(f, "User store failure: {msg}"),
            AuthError::MissingAuthHeader => write!(f, "Authorization header is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::InvalidIssuer => write!(f, "Token issuer is invalid"),
            AuthError::UsernameTaken => write!(f, "Username is already taken"),
            AuthError::InvalidRegistration(msg) => write!(f, "Invalid registration: {msg}"),
            AuthError::PasswordChangeRejected(msg) => {
                write!(f, "Password change rejected: {msg}")
            }
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.public_message(),
            error_code: self.public_code().to_string(),
        });
        (status, body).into_response()
    }
}
