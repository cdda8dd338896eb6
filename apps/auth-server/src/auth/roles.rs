// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 MoveIt

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Named authorization tags.
///
/// ## Roles
///
/// - `Admin` - Platform moderation
/// - `User` - Any authenticated member of the campus platform
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Regular platform member
    User,
    /// Platform administrator
    Admin,
}

impl Role {
    /// Every role known to the platform, used to seed the role store.
    pub const ALL: [Role; 2] = [Role::User, Role::Admin];

    /// Parse a role from its name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Role> {
        match name.trim().to_ascii_uppercase().as_str() {
            "USER" => Some(Role::User),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Canonical stored name.
    pub fn name(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Role::User => "Campus platform member",
            Role::Admin => "Platform administrator",
        }
    }
}

impl Default for Role {
    /// Every account starts as a plain user.
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_name() {
        for role in Role::ALL {
            assert_eq!(Role::from_name(role.name()), Some(role));
        }
    }

    #[test]
    fn from_name_parses_correctly() {
        assert_eq!(Role::from_name("USER"), Some(Role::User));
        assert_eq!(Role::from_name("admin"), Some(Role::Admin));
        assert_eq!(Role::from_name(" User "), Some(Role::User));
        assert_eq!(Role::from_name("ROLE_USER"), None);
    }

    #[test]
    fn serializes_as_uppercase_name() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""USER""#);
        let parsed: Role = serde_json::from_str(r#""ADMIN""#).unwrap();
        assert_eq!(parsed, Role::Admin);
    }

    #[test]
    fn default_role_is_user() {
        assert_eq!(Role::default(), Role::User);
    }
}
