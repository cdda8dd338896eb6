// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

//! MoveIt Auth Server - Campus SSO authentication for the MoveIt platform
//!
//! Verifies campus credentials against the CAS portal, provisions a local
//! user record on first login and issues signed, expiring session tokens.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - SSO delegate, identity reconciler, token issuer
//! - `storage` - Embedded user database (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod logging;
pub mod models;
pub mod state;
pub mod storage;
