// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

//! Session token issuance, refresh and verification (HS256).
//!
//! The issuer holds only immutable key material and lifetimes, so a single
//! instance is shared across all request tasks. Every issued token carries a
//! fresh `jti`; two issuance calls never produce the same token.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::claims::{Principal, TokenClaims};
use super::error::AuthError;
use crate::config::TokenConfig;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// A freshly signed token.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    /// Signed JWT
    pub token: String,
    /// Expiry (Unix timestamp, seconds)
    pub expires_at: i64,
}

/// Signs and verifies session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    validity: Duration,
    remember_me_validity: Duration,
}

impl TokenIssuer {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            validity: config.validity,
            remember_me_validity: config.remember_me_validity,
        }
    }

    /// Lifetime selected by the remember-me flag.
    pub fn lifetime(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.remember_me_validity
        } else {
            self.validity
        }
    }

    /// Issue a token for a freshly authenticated principal.
    pub fn issue(&self, principal: &Principal, remember_me: bool) -> Result<IssuedToken, AuthError> {
        let now = Utc::now().timestamp();
        let exp = now + self.lifetime(remember_me).as_secs() as i64;
        self.sign(principal, remember_me, now, exp)
    }

    /// Mint a new token for a principal that already holds a valid token.
    ///
    /// Keeps the remember-me choice of the presented token. The new expiry is
    /// always strictly later than `principal.expires_at`.
    pub fn refresh(&self, principal: &Principal) -> Result<IssuedToken, AuthError> {
        let now = Utc::now().timestamp();
        let computed = now + self.lifetime(principal.remember_me).as_secs() as i64;
        let exp = computed.max(principal.expires_at + 1);
        self.sign(principal, principal.remember_me, now, exp)
    }

    fn sign(
        &self,
        principal: &Principal,
        remember_me: bool,
        iat: i64,
        exp: i64,
    ) -> Result<IssuedToken, AuthError> {
        let claims = TokenClaims {
            sub: principal.user_id.to_string(),
            roles: principal.roles.clone(),
            iat,
            exp,
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
            remember_me,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(format!("token signing failed: {e}")))?;

        Ok(IssuedToken {
            token,
            expires_at: exp,
        })
    }

    /// Verify a bearer token and extract its principal.
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.validate_aud = false;

        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                _ => AuthError::MalformedToken,
            },
        )?;

        Principal::from_claims(token_data.claims).ok_or(AuthError::MalformedToken)
    }
}
