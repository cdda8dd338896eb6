// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

//! # Authentication Module
//!
//! Campus SSO delegation, local accounts and session tokens for the MoveIt
//! API.
//!
//! ## Auth Flow
//!
//! 1. Client posts `{username, password, rememberMe}` to `/s/login`
//! 2. The server picks a [`CredentialStrategy`]:
//!    - local account: Argon2id check against the stored hash
//!    - otherwise: the campus SSO verifies the credentials ([`CasClient`]) and
//!      the [`IdentityReconciler`] provisions the user on first login
//! 3. The [`TokenIssuer`] signs an HS256 token with the user id, roles and
//!    expiry
//! 4. Later requests send `Authorization: Bearer <token>`; the [`Auth`]
//!    extractor verifies it
//!
//! ## Security
//!
//! - Every login failure produces the same 401 body; the precise kind only
//!   reaches the logs
//! - The CAS session cookie never leaves the delegate
//! - Clock skew tolerance is 60 seconds

pub mod cas;
pub mod claims;
pub mod error;
pub mod extractor;
pub mod password;
pub mod reconciler;
pub mod roles;
pub mod service;
pub mod token;

pub use cas::{CasClient, ExternalIdentity};
pub use claims::{Principal, TokenClaims};
pub use error::AuthError;
pub use extractor::Auth;
pub use reconciler::IdentityReconciler;
pub use roles::Role;
pub use service::{AuthService, CredentialStrategy};
pub use token::{IssuedToken, TokenIssuer};
