// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

//! Argon2id hashing for local account passwords.
//!
//! Hashing is CPU and memory heavy, so both operations run on tokio's
//! blocking pool instead of a request task.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use super::error::AuthError;

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Hash a password into a PHC string (Argon2id, m=19 MiB, t=2, p=1).
pub async fn hash_password(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::InternalError(format!("password hashing failed: {e}")))
    })
    .await
    .map_err(|e| AuthError::InternalError(format!("hashing task failed: {e}")))?
}

/// Check a password against a stored PHC string.
///
/// An unparseable hash never matches.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || {
        let Ok(parsed) = PasswordHash::new(&hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
    .await
    .map_err(|e| AuthError::InternalError(format!("verification task failed: {e}")))
}
