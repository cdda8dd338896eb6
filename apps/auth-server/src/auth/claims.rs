// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

//! Session token claims and the authenticated principal.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::roles::Role;
use crate::storage::{StoredUser, UserId};

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user id)
    pub sub: String,

    /// Roles at issuance time
    pub roles: BTreeSet<Role>,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,

    /// Issuer
    pub iss: String,

    /// Unique token id
    pub jti: String,

    /// Whether the long-lived "remember me" lifetime was selected
    #[serde(default)]
    pub remember_me: bool,
}

/// An authenticated subject: id plus role set.
///
/// Built either from a freshly verified login ([`Principal::from_user`]) or
/// from a verified bearer token ([`Principal::from_claims`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// User id
    pub user_id: UserId,

    /// Roles as of authentication
    pub roles: BTreeSet<Role>,

    /// Remember-me flag of the token this principal came from
    pub remember_me: bool,

    /// Expiry of the token this principal came from (Unix timestamp, 0 for a
    /// fresh login)
    pub expires_at: i64,
}

impl Principal {
    /// Principal for a user that just proved its credentials.
    pub fn from_user(user: &StoredUser) -> Self {
        Self {
            user_id: user.id,
            roles: user.roles.clone(),
            remember_me: false,
            expires_at: 0,
        }
    }

    /// Principal described by verified token claims.
    ///
    /// Returns `None` when the subject is not a user id.
    pub fn from_claims(claims: TokenClaims) -> Option<Self> {
        let user_id = claims.sub.parse().ok()?;
        Some(Self {
            user_id,
            roles: claims.roles,
            remember_me: claims.remember_me,
            expires_at: claims.exp,
        })
    }
}
