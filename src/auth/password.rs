// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing via bcrypt.

use std::sync::OnceLock;

use super::service::AuthServiceError;

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Hash a password with bcrypt (cost 10).
pub fn hash_password(password: &str) -> Result<String, AuthServiceError> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AuthServiceError::Password(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthServiceError> {
    bcrypt::verify(password, hash)
        .map_err(|e| AuthServiceError::Password(format!("bcrypt verify: {e}")))
}

/// Burn one bcrypt verification for a username that does not exist.
///
/// Keeps the failed-login path for unknown users as slow as a wrong password.
pub fn verify_against_dummy(password: &str) {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
    let hash = DUMMY_HASH.get_or_init(|| bcrypt::hash("dummy-password-never-matches", BCRYPT_COST).ok());
    if let Some(hash) = hash {
        let _ = bcrypt::verify(password, hash);
    }
}
