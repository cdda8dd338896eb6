// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

//! # User Storage
//!
//! Persistent user records backed by an embedded redb database.
//!
//! ## Guarantees
//!
//! - A user id is written at most once. [`UserStore::insert_user_if_absent`]
//!   checks and inserts inside a single write transaction; redb serializes
//!   write transactions, so two racing first logins for the same id resolve to
//!   one `Created` and one `AlreadyExists`.
//! - Existing user rows are never rewritten by the login path.
//! - Every row records its [`AccountOrigin`]; a campus login only ever maps
//!   to a `Campus` row.
//! - A local account (user row + credential) is written in one transaction.

pub mod user_database;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;

pub use user_database::{
    normalize_username, NewLocalUser, RegisterOutcome, UserDatabase, LOCAL_ID_BASE,
};

/// Identifier of a user; for campus accounts this is the CAS `numero`.
pub type UserId = u64;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Where an account was created.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountOrigin {
    /// Provisioned on first campus login; `id` is the CAS `numero`
    Campus,
    /// Self-registered; `id` was allocated from `LOCAL_ID_BASE` upwards
    Local,
}

/// Persisted user record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    /// Immutable identifier, assigned once at creation
    pub id: UserId,
    pub origin: AccountOrigin,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Never empty
    pub roles: BTreeSet<Role>,
    pub created_at: DateTime<Utc>,
}

/// Username/password pair for self-registered accounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalCredential {
    pub username: String,
    pub user_id: UserId,
    /// Argon2id PHC string
    pub password_hash: String,
    pub updated_at: DateTime<Utc>,
}

/// Result of a conflict-safe insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Created,
    /// A row with the same id was already present; nothing was written.
    AlreadyExists,
}

/// The slice of the user store the identity reconciler depends on.
pub trait UserStore: Send + Sync {
    /// Look up a user by id.
    fn find_user(&self, id: UserId) -> StoreResult<Option<StoredUser>>;

    /// Insert `user` unless a row with the same id exists.
    fn insert_user_if_absent(&self, user: &StoredUser) -> StoreResult<InsertOutcome>;

    /// Look up a role by name.
    fn find_role(&self, name: &str) -> StoreResult<Option<Role>>;
}
