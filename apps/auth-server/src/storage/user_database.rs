// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

//! Embedded user database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user id → serialized StoredUser
//! - `local_credentials`: username → serialized LocalCredential
//! - `credential_owners`: user id → username
//! - `roles`: role name → description
//! - `sequences`: sequence name → next value

use std::collections::BTreeSet;
use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};

use super::{AccountOrigin, InsertOutcome, LocalCredential, StoreError, StoreResult, StoredUser, UserId, UserStore};
use crate::auth::Role;

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: user id → serialized StoredUser (JSON bytes).
const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

/// Local credentials: normalized username → serialized LocalCredential.
const LOCAL_CREDENTIALS: TableDefinition<&str, &[u8]> = TableDefinition::new("local_credentials");

/// Reverse index: user id → normalized username.
const CREDENTIAL_OWNERS: TableDefinition<u64, &str> = TableDefinition::new("credential_owners");

/// Role store: role name → description.
const ROLES: TableDefinition<&str, &str> = TableDefinition::new("roles");

/// Counters: name → next value.
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

const LOCAL_USER_SEQUENCE: &str = "local_user_id";

/// First id handed out to self-registered accounts.
///
/// Campus numbers stay well below this value; ids that are taken anyway are
/// skipped during allocation.
pub const LOCAL_ID_BASE: UserId = 1_000_000_000;

/// Result of registering a local account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered(StoredUser),
    UsernameTaken,
}

/// Profile fields of a self-registered account.
#[derive(Debug, Clone)]
pub struct NewLocalUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub description: Option<String>,
}

/// Normalize a username into its storage key.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Embedded ACID user database.
pub struct UserDatabase {
    db: Database,
}

impl UserDatabase {
    /// Open (or create) the database at the given path and seed the role store.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(LOCAL_CREDENTIALS)?;
            let _ = write_txn.open_table(CREDENTIAL_OWNERS)?;
            let _ = write_txn.open_table(SEQUENCES)?;

            let mut roles = write_txn.open_table(ROLES)?;
            for role in Role::ALL {
                roles.insert(role.name(), role.description())?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Number of stored users.
    pub fn user_count(&self) -> StoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        Ok(table.len()?)
    }

    // =========================================================================
    // Local credentials
    // =========================================================================

    /// Look up the local credential registered under `username`.
    pub fn find_credential(&self, username: &str) -> StoreResult<Option<LocalCredential>> {
        let key = normalize_username(username);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOCAL_CREDENTIALS)?;
        match table.get(key.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Look up the local credential owned by a user, if any.
    pub fn find_credential_by_user(&self, user_id: UserId) -> StoreResult<Option<LocalCredential>> {
        let read_txn = self.db.begin_read()?;
        let owners = read_txn.open_table(CREDENTIAL_OWNERS)?;
        let username = match owners.get(user_id)? {
            Some(v) => v.value().to_string(),
            None => return Ok(None),
        };

        let credentials = read_txn.open_table(LOCAL_CREDENTIALS)?;
        match credentials.get(username.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Create a local account: allocates an id, writes the user row and the
    /// credential in one transaction.
    pub fn register_local_user(
        &self,
        username: &str,
        password_hash: String,
        profile: NewLocalUser,
    ) -> StoreResult<RegisterOutcome> {
        let key = normalize_username(username);
        let now = Utc::now();

        let write_txn = self.db.begin_write()?;
        let user = {
            let mut credentials = write_txn.open_table(LOCAL_CREDENTIALS)?;
            if credentials.get(key.as_str())?.is_some() {
                drop(credentials);
                write_txn.abort()?;
                return Ok(RegisterOutcome::UsernameTaken);
            }

            let mut users = write_txn.open_table(USERS)?;
            let mut sequences = write_txn.open_table(SEQUENCES)?;
            let mut id = sequences
                .get(LOCAL_USER_SEQUENCE)?
                .map(|v| v.value())
                .unwrap_or(LOCAL_ID_BASE);
            while users.get(id)?.is_some() {
                id += 1;
            }

            let user = StoredUser {
                id,
                origin: AccountOrigin::Local,
                email: profile.email,
                first_name: profile.first_name,
                last_name: profile.last_name,
                description: profile.description,
                roles: BTreeSet::from([Role::User]),
                created_at: now,
            };
            let credential = LocalCredential {
                username: key.clone(),
                user_id: id,
                password_hash,
                updated_at: now,
            };

            let user_json = serde_json::to_vec(&user)?;
            let credential_json = serde_json::to_vec(&credential)?;
            users.insert(id, user_json.as_slice())?;
            credentials.insert(key.as_str(), credential_json.as_slice())?;
            sequences.insert(LOCAL_USER_SEQUENCE, id + 1)?;

            let mut owners = write_txn.open_table(CREDENTIAL_OWNERS)?;
            owners.insert(id, key.as_str())?;

            user
        };
        write_txn.commit()?;

        Ok(RegisterOutcome::Registered(user))
    }

    /// Replace the password hash of the credential owned by `user_id`.
    pub fn update_password_hash(&self, user_id: UserId, password_hash: String) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let owners = write_txn.open_table(CREDENTIAL_OWNERS)?;
            let username = owners
                .get(user_id)?
                .map(|v| v.value().to_string())
                .ok_or_else(|| StoreError::NotFound(format!("Credential for user {user_id}")))?;

            let mut credentials = write_txn.open_table(LOCAL_CREDENTIALS)?;

            // Read existing value and deserialize before mutating
            let existing_bytes = {
                let existing = credentials
                    .get(username.as_str())?
                    .ok_or_else(|| StoreError::NotFound(format!("Credential {username}")))?;
                existing.value().to_vec()
            };

            let mut credential: LocalCredential = serde_json::from_slice(&existing_bytes)?;
            credential.password_hash = password_hash;
            credential.updated_at = Utc::now();

            let json = serde_json::to_vec(&credential)?;
            credentials.insert(username.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

impl UserStore for UserDatabase {
    fn find_user(&self, id: UserId) -> StoreResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn insert_user_if_absent(&self, user: &StoredUser) -> StoreResult<InsertOutcome> {
        let json = serde_json::to_vec(user)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USERS)?;
            if table.get(user.id)?.is_some() {
                drop(table);
                write_txn.abort()?;
                return Ok(InsertOutcome::AlreadyExists);
            }
            table.insert(user.id, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(InsertOutcome::Created)
    }

    fn find_role(&self, name: &str) -> StoreResult<Option<Role>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ROLES)?;
        let stored = table.get(name.trim().to_ascii_uppercase().as_str())?.is_some();
        Ok(if stored { Role::from_name(name) } else { None })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (UserDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = UserDatabase::open(&dir.path().join("users.redb")).unwrap();
        (db, dir)
    }

    fn campus_user(id: UserId, email: &str) -> StoredUser {
        StoredUser {
            id,
            origin: AccountOrigin::Campus,
            email: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            description: None,
            roles: BTreeSet::from([Role::User]),
            created_at: Utc::now(),
        }
    }

    fn profile() -> NewLocalUser {
        NewLocalUser {
            email: "grace@example.org".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            description: Some("COBOL".to_string()),
        }
    }

    #[test]
    fn insert_then_find_user() {
        let (db, _dir) = temp_db();
        let user = campus_user(12345, "a@b.fr");

        assert_eq!(db.insert_user_if_absent(&user).unwrap(), InsertOutcome::Created);
        assert_eq!(db.find_user(12345).unwrap(), Some(user));
        assert_eq!(db.find_user(99).unwrap(), None);
        assert_eq!(db.user_count().unwrap(), 1);
    }

    #[test]
    fn second_insert_with_same_id_is_a_noop() {
        let (db, _dir) = temp_db();
        let original = campus_user(12345, "a@b.fr");
        db.insert_user_if_absent(&original).unwrap();

        let outcome = db
            .insert_user_if_absent(&campus_user(12345, "changed@b.fr"))
            .unwrap();
        assert_eq!(outcome, InsertOutcome::AlreadyExists);
        assert_eq!(db.find_user(12345).unwrap().unwrap().email, "a@b.fr");
        assert_eq!(db.user_count().unwrap(), 1);
    }

    #[test]
    fn role_store_is_seeded() {
        let (db, _dir) = temp_db();
        assert_eq!(db.find_role("USER").unwrap(), Some(Role::User));
        assert_eq!(db.find_role("admin").unwrap(), Some(Role::Admin));
        assert_eq!(db.find_role("ROOT").unwrap(), None);
    }

    #[test]
    fn reopening_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("users.redb");
        {
            let db = UserDatabase::open(&path).unwrap();
            db.insert_user_if_absent(&campus_user(7, "x@y.fr")).unwrap();
        }
        let db = UserDatabase::open(&path).unwrap();
        assert!(db.find_user(7).unwrap().is_some());
        assert_eq!(db.find_role("USER").unwrap(), Some(Role::User));
    }

    #[test]
    fn register_local_user_writes_user_and_credential() {
        let (db, _dir) = temp_db();
        let outcome = db
            .register_local_user("  Grace ", "hash-1".to_string(), profile())
            .unwrap();

        let RegisterOutcome::Registered(user) = outcome else {
            panic!("expected registration");
        };
        assert_eq!(user.id, LOCAL_ID_BASE);
        assert_eq!(user.origin, AccountOrigin::Local);
        assert_eq!(user.roles, BTreeSet::from([Role::User]));
        assert_eq!(db.find_user(user.id).unwrap(), Some(user.clone()));

        let credential = db.find_credential("GRACE").unwrap().unwrap();
        assert_eq!(credential.username, "grace");
        assert_eq!(credential.user_id, user.id);
        assert_eq!(credential.password_hash, "hash-1");
        assert_eq!(db.find_credential_by_user(user.id).unwrap(), Some(credential));
    }

    #[test]
    fn register_rejects_taken_username_without_writing() {
        let (db, _dir) = temp_db();
        db.register_local_user("grace", "hash-1".to_string(), profile())
            .unwrap();

        let outcome = db
            .register_local_user("Grace", "hash-2".to_string(), profile())
            .unwrap();
        assert_eq!(outcome, RegisterOutcome::UsernameTaken);
        assert_eq!(db.user_count().unwrap(), 1);
        assert_eq!(db.find_credential("grace").unwrap().unwrap().password_hash, "hash-1");
    }

    #[test]
    fn local_ids_skip_taken_ids() {
        let (db, _dir) = temp_db();
        db.insert_user_if_absent(&campus_user(LOCAL_ID_BASE, "taken@b.fr"))
            .unwrap();

        let RegisterOutcome::Registered(first) = db
            .register_local_user("first", "h".to_string(), profile())
            .unwrap()
        else {
            panic!("expected registration");
        };
        let RegisterOutcome::Registered(second) = db
            .register_local_user("second", "h".to_string(), profile())
            .unwrap()
        else {
            panic!("expected registration");
        };

        assert_eq!(first.id, LOCAL_ID_BASE + 1);
        assert_eq!(second.id, LOCAL_ID_BASE + 2);
    }

    #[test]
    fn update_password_hash_replaces_hash() {
        let (db, _dir) = temp_db();
        let RegisterOutcome::Registered(user) = db
            .register_local_user("grace", "old".to_string(), profile())
            .unwrap()
        else {
            panic!("expected registration");
        };

        db.update_password_hash(user.id, "new".to_string()).unwrap();
        assert_eq!(db.find_credential("grace").unwrap().unwrap().password_hash, "new");
    }

    #[test]
    fn update_password_hash_requires_local_credential() {
        let (db, _dir) = temp_db();
        db.insert_user_if_absent(&campus_user(12345, "a@b.fr")).unwrap();

        let err = db.update_password_hash(12345, "new".to_string()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
