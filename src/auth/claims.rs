// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the username the token was issued to
    pub sub: String,

    /// Role claims at issue time
    #[serde(default)]
    pub roles: Vec<Role>,

    /// Issued at (Unix seconds)
    pub iat: i64,

    /// Expiration (Unix seconds)
    pub exp: i64,
}

/// Authenticated user information.
///
/// Built by the extractor after the token verifies and its subject resolves
/// to a stored user. This is the type handlers receive.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Stored user id
    pub user_id: u64,

    pub username: String,

    /// Roles as recorded for the user
    pub roles: Vec<Role>,
}

impl AuthenticatedUser {
    /// Check if the user has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.roles.iter().any(|role| role.has_privilege(required))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(roles: Vec<Role>) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: 1,
            username: "alice".to_string(),
            roles,
        }
    }

    #[test]
    fn has_role_checks_privilege() {
        let admin = user(vec![Role::Admin]);
        assert!(admin.has_role(Role::Admin));
        assert!(admin.has_role(Role::User));

        let plain = user(vec![Role::User]);
        assert!(plain.has_role(Role::User));
        assert!(!plain.has_role(Role::Admin));
    }

    #[test]
    fn no_roles_grants_nothing() {
        assert!(!user(Vec::new()).has_role(Role::User));
    }

    #[test]
    fn claims_round_trip_role_names() {
        let claims = TokenClaims {
            sub: "alice".to_string(),
            roles: vec![Role::User],
            iat: 10,
            exp: 20,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["roles"][0], "ROLE_USER");
        let back: TokenClaims = serde_json::from_value(json).unwrap();
        assert_eq!(back, claims);
    }
}
