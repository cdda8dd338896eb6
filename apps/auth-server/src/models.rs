// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

//! # API Data Models
//!
//! Request bodies of the `/s` authentication endpoints. Field names are
//! camelCase on the wire.

use serde::Deserialize;
use utoipa::ToSchema;

/// Credentials submitted to `POST /s/login`.
///
/// `username` is either a campus number (verified against CAS) or the name of
/// a self-registered account.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Select the long-lived token lifetime
    #[serde(default)]
    pub remember_me: bool,
}

/// Self-registration of a local (non-campus) account.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeRequest {
    pub old_password: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_defaults_remember_me() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"username":"12345","password":"pw"}"#).unwrap();
        assert!(!req.remember_me);

        let req: LoginRequest =
            serde_json::from_str(r#"{"username":"12345","password":"pw","rememberMe":true}"#)
                .unwrap();
        assert!(req.remember_me);
    }

    #[test]
    fn register_request_uses_camel_case() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"username":"grace","password":"longpassword","email":"g@h.io","firstName":"Grace","lastName":"Hopper"}"#,
        )
        .unwrap();
        assert_eq!(req.first_name, "Grace");
        assert_eq!(req.last_name, "Hopper");
        assert_eq!(req.description, None);
    }
}
