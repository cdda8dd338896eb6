// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

//! # Authentication Service
//!
//! Composes the provider chain behind the `/s` endpoints:
//!
//! ```text
//! login ──► CredentialStrategy ──► Local:  Argon2id verify ─► user row ─────┐
//!                    (mismatch) └► Campus: CasClient ─► IdentityReconciler ─┴─► TokenIssuer
//! register ──► validate ─► hash ─► user + credential (one txn) ─────────────────► TokenIssuer
//! ```
//!
//! A local credential is tried first when one exists for the username; a
//! rejected local password still goes to the campus SSO, so a local account
//! never shadows a campus login of the same name.
//!
//! Every login failure is logged here with a `failure_kind` field before it
//! is handed to the HTTP layer, which reports all of them identically.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::cas::CasClient;
use super::claims::Principal;
use super::error::AuthError;
use super::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use super::reconciler::IdentityReconciler;
use super::token::{IssuedToken, TokenIssuer};
use crate::models::{LoginRequest, PasswordChangeRequest, RegisterRequest};
use crate::storage::{
    LocalCredential, NewLocalUser, RegisterOutcome, StoreError, UserDatabase, UserStore,
};

/// How a submitted username is verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStrategy {
    /// Delegate to the campus SSO, then reconcile the identity.
    Campus,
    /// Check against a self-registered account.
    Local(LocalCredential),
}

pub struct AuthService {
    cas: CasClient,
    users: Arc<UserDatabase>,
    reconciler: IdentityReconciler<UserDatabase>,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(cas: CasClient, users: Arc<UserDatabase>, tokens: TokenIssuer) -> Self {
        Self {
            cas,
            reconciler: IdentityReconciler::new(Arc::clone(&users)),
            users,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Pick the first verification path for `username`.
    pub fn strategy_for(&self, username: &str) -> Result<CredentialStrategy, AuthError> {
        match self.users.find_credential(username).map_err(persistence)? {
            Some(credential) => Ok(CredentialStrategy::Local(credential)),
            None => Ok(CredentialStrategy::Campus),
        }
    }

    /// Verify credentials and issue a session token.
    pub async fn login(&self, request: LoginRequest) -> Result<IssuedToken, AuthError> {
        let username = request.username.trim().to_string();

        let principal = match self.authenticate(&username, request.password).await {
            Ok(principal) => principal,
            Err(e) => {
                log_login_failure(&username, &e);
                return Err(e);
            }
        };

        let issued = self.tokens.issue(&principal, request.remember_me)?;
        info!(
            user_id = principal.user_id,
            remember_me = request.remember_me,
            "Login succeeded"
        );
        Ok(issued)
    }

    async fn authenticate(&self, username: &str, password: String) -> Result<Principal, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::AuthFailed);
        }

        if let CredentialStrategy::Local(credential) = self.strategy_for(username)? {
            if verify_password(password.clone(), credential.password_hash.clone()).await? {
                return self.local_principal(&credential);
            }
            debug!(username, "Local password rejected, trying campus SSO");
        }

        let identity = self.cas.authenticate(username, &password).await?;
        let user = self.reconciler.reconcile(&identity)?;
        Ok(Principal::from_user(&user))
    }

    fn local_principal(&self, credential: &LocalCredential) -> Result<Principal, AuthError> {
        let user = self
            .users
            .find_user(credential.user_id)
            .map_err(persistence)?
            .ok_or_else(|| {
                AuthError::PersistenceFailure(format!(
                    "credential {} points to missing user {}",
                    credential.username, credential.user_id
                ))
            })?;
        Ok(Principal::from_user(&user))
    }

    /// Create a local account and log it in.
    pub async fn register(&self, request: RegisterRequest) -> Result<IssuedToken, AuthError> {
        validate_registration(&request)?;

        let password_hash = hash_password(request.password).await?;
        let profile = NewLocalUser {
            email: request.email.trim().to_string(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            description: request
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        };

        let outcome = self
            .users
            .register_local_user(&request.username, password_hash, profile)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;

        match outcome {
            RegisterOutcome::Registered(user) => {
                info!(user_id = user.id, "Registered local account");
                self.tokens.issue(&Principal::from_user(&user), false)
            }
            RegisterOutcome::UsernameTaken => {
                warn!(username = %request.username.trim(), "Registration with taken username");
                Err(AuthError::UsernameTaken)
            }
        }
    }

    /// Mint a new token for an already authenticated principal.
    ///
    /// Roles are reloaded from the store, so role changes apply from the next
    /// refresh on.
    pub fn refresh(&self, principal: &Principal) -> Result<IssuedToken, AuthError> {
        let user = self
            .users
            .find_user(principal.user_id)
            .map_err(persistence)?
            .ok_or_else(|| {
                warn!(user_id = principal.user_id, "Refresh for unknown user");
                AuthError::AuthFailed
            })?;

        let current = Principal {
            user_id: user.id,
            roles: user.roles,
            remember_me: principal.remember_me,
            expires_at: principal.expires_at,
        };
        self.tokens.refresh(&current)
    }

    /// Replace the password of a local account.
    pub async fn change_password(
        &self,
        principal: &Principal,
        request: PasswordChangeRequest,
    ) -> Result<(), AuthError> {
        if request.new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::PasswordChangeRejected(format!(
                "new password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let credential = self
            .users
            .find_credential_by_user(principal.user_id)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .ok_or_else(|| {
                AuthError::PasswordChangeRejected(
                    "campus accounts change their password through the campus portal".to_string(),
                )
            })?;

        if !verify_password(request.old_password, credential.password_hash).await? {
            warn!(user_id = principal.user_id, "Password change with wrong current password");
            return Err(AuthError::PasswordChangeRejected(
                "current password is incorrect".to_string(),
            ));
        }

        let new_hash = hash_password(request.new_password).await?;
        self.users
            .update_password_hash(principal.user_id, new_hash)
            .map_err(|e| match e {
                StoreError::NotFound(_) => AuthError::PasswordChangeRejected(
                    "account has no local password".to_string(),
                ),
                other => AuthError::InternalError(other.to_string()),
            })?;

        info!(user_id = principal.user_id, "Password changed");
        Ok(())
    }
}

fn validate_registration(request: &RegisterRequest) -> Result<(), AuthError> {
    let username = request.username.trim();
    if username.is_empty() {
        return Err(AuthError::InvalidRegistration("username is required".to_string()));
    }
    // Purely numeric names are campus numbers and must keep reaching CAS.
    if username.chars().all(|c| c.is_ascii_digit()) {
        return Err(AuthError::InvalidRegistration(
            "username must not be a campus number".to_string(),
        ));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::InvalidRegistration(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if !request.email.contains('@') {
        return Err(AuthError::InvalidRegistration("email is invalid".to_string()));
    }
    if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
        return Err(AuthError::InvalidRegistration(
            "first and last name are required".to_string(),
        ));
    }
    Ok(())
}

fn log_login_failure(username: &str, err: &AuthError) {
    match err {
        AuthError::AuthFailed => {
            warn!(failure_kind = err.error_code(), username, "Login rejected");
        }
        _ => {
            error!(failure_kind = err.error_code(), username, error = %err, "Login failed");
        }
    }
}

fn persistence(err: StoreError) -> AuthError {
    AuthError::PersistenceFailure(err.to_string())
}
