// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for card storage operations.
//!
//! Every card lookup carries an [`AccessScope`]. A row outside the scope is
//! reported as not found, so a user cannot discover the existence of cards
//! that belong to somebody else.

use crate::auth::AuthenticatedUser;

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_id(&self) -> u64;
}

/// Which rows an operation may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    /// Only rows owned by this user.
    Owner(u64),
    /// Any row. Reserved for administrator operations.
    Any,
}

impl AccessScope {
    /// Scope limited to the rows of an authenticated caller.
    ///
    /// Administrators get an owner scope too; cross-user access goes through
    /// the admin routes, which pass [`AccessScope::Any`] explicitly.
    pub fn for_user(user: &AuthenticatedUser) -> Self {
        Self::Owner(user.user_id)
    }

    pub fn permits<R: OwnedResource>(&self, resource: &R) -> bool {
        match self {
            AccessScope::Owner(owner_id) => resource.owner_id() == *owner_id,
            AccessScope::Any => true,
        }
    }
}
