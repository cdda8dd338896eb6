// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

//! Maps a verified campus identity onto a local user record.
//!
//! The first successful login for a campus number creates the user with the
//! default role; later logins return the stored record untouched, even when
//! the campus profile changed in between. A row under that number that was
//! not created by a campus login is never handed out.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::cas::ExternalIdentity;
use super::error::AuthError;
use super::roles::Role;
use crate::storage::{AccountOrigin, InsertOutcome, StoreError, StoredUser, UserStore};

pub struct IdentityReconciler<S> {
    store: Arc<S>,
}

impl<S> Clone for IdentityReconciler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: UserStore> IdentityReconciler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Return the local user for `identity`, creating it on first login.
    ///
    /// Safe under concurrent first logins for the same number: exactly one
    /// row is written and every caller gets that row back.
    pub fn reconcile(&self, identity: &ExternalIdentity) -> Result<StoredUser, AuthError> {
        if let Some(user) = self.store.find_user(identity.numero).map_err(persistence)? {
            debug!(user_id = user.id, "Campus user already known");
            return campus_only(user);
        }

        let role = self
            .store
            .find_role(Role::default().name())
            .map_err(persistence)?
            .ok_or_else(|| {
                AuthError::PersistenceFailure(format!(
                    "default role {} missing from role store",
                    Role::default()
                ))
            })?;

        let candidate = StoredUser {
            id: identity.numero,
            origin: AccountOrigin::Campus,
            email: identity.email.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            description: None,
            roles: BTreeSet::from([role]),
            created_at: Utc::now(),
        };

        match self.store.insert_user_if_absent(&candidate).map_err(persistence)? {
            InsertOutcome::Created => {
                info!(user_id = candidate.id, "Created user on first campus login");
                Ok(candidate)
            }
            InsertOutcome::AlreadyExists => {
                debug!(user_id = candidate.id, "Lost creation race, reading stored user");
                let user = self
                    .store
                    .find_user(candidate.id)
                    .map_err(persistence)?
                    .ok_or_else(|| {
                        AuthError::PersistenceFailure(format!(
                            "user {} reported present but not found",
                            candidate.id
                        ))
                    })?;
                campus_only(user)
            }
        }
    }
}

/// Reject rows under a campus number that belong to a local account.
fn campus_only(user: StoredUser) -> Result<StoredUser, AuthError> {
    match user.origin {
        AccountOrigin::Campus => Ok(user),
        AccountOrigin::Local => {
            warn!(user_id = user.id, "Campus number collides with a local account");
            Err(AuthError::PersistenceFailure(format!(
                "user {} is a local account, not a campus identity",
                user.id
            )))
        }
    }
}

fn persistence(err: StoreError) -> AuthError {
    AuthError::PersistenceFailure(err.to_string())
}
