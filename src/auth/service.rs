// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential checks, registration and admin bootstrap.

use std::sync::Arc;

use super::password::{hash_password, verify_against_dummy, verify_password};
use super::tokens::{TokenError, TokenService};
use super::Role;
use crate::config::AdminBootstrap;
use crate::storage::{Database, NewUser, StorageError, UniqueKey, UserRepository};

#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    /// Unknown username or wrong password; the two are indistinguishable.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Username is already taken")]
    DuplicateUsername,

    #[error("Email is already in use")]
    DuplicateEmail,

    #[error("{0}")]
    Validation(String),

    #[error("password hashing failed: {0}")]
    Password(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for AuthServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(UniqueKey::Username) => AuthServiceError::DuplicateUsername,
            StorageError::Conflict(UniqueKey::Email) => AuthServiceError::DuplicateEmail,
            other => AuthServiceError::Storage(other),
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    db: Arc<Database>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(db: Arc<Database>, tokens: Arc<TokenService>) -> Self {
        Self { db, tokens }
    }

    /// Check credentials and issue a session token.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<String, AuthServiceError> {
        let Some(user) = UserRepository::new(&self.db).find_by_username(username)? else {
            verify_against_dummy(password);
            tracing::warn!(username, "Login failed");
            return Err(AuthServiceError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash)? {
            tracing::warn!(user_id = user.id, "Login failed");
            return Err(AuthServiceError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user.username, &user.roles)?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok(token)
    }

    /// Register a new account with the `ROLE_USER` role.
    pub fn register(&self, username: &str, password: &str, email: &str) -> Result<(), AuthServiceError> {
        validate_registration(username, password, email)?;
        self.create_user(username, password, email, vec![Role::User])?;
        Ok(())
    }

    /// Create the configured admin unless the username already exists.
    ///
    /// Returns whether an account was created.
    pub fn bootstrap_admin(&self, admin: &AdminBootstrap) -> Result<bool, AuthServiceError> {
        if UserRepository::new(&self.db).exists_by_username(&admin.username)? {
            tracing::info!(username = %admin.username, "Admin account already present");
            return Ok(false);
        }
        validate_registration(&admin.username, &admin.password, &admin.email)?;
        let user_id =
            self.create_user(&admin.username, &admin.password, &admin.email, vec![Role::Admin])?;
        tracing::info!(user_id, username = %admin.username, "Created bootstrap admin");
        Ok(true)
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    fn create_user(
        &self,
        username: &str,
        password: &str,
        email: &str,
        roles: Vec<Role>,
    ) -> Result<u64, AuthServiceError> {
        let repo = UserRepository::new(&self.db);
        // Checked before hashing; the insert re-checks both keys in its transaction.
        if repo.exists_by_username(username)? {
            return Err(AuthServiceError::DuplicateUsername);
        }
        if repo.exists_by_email(email)? {
            return Err(AuthServiceError::DuplicateEmail);
        }

        let user = repo.create(NewUser {
            username: username.to_string(),
            email: email.trim().to_string(),
            password_hash: hash_password(password)?,
            roles,
        })?;
        Ok(user.id)
    }
}

fn validate_registration(username: &str, password: &str, email: &str) -> Result<(), AuthServiceError> {
    if username.trim().is_empty() {
        return Err(AuthServiceError::Validation("Username must not be blank".to_string()));
    }
    if username.trim() != username {
        return Err(AuthServiceError::Validation(
            "Username must not start or end with whitespace".to_string(),
        ));
    }
    if password.is_empty() {
        return Err(AuthServiceError::Validation("Password must not be empty".to_string()));
    }
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(AuthServiceError::Validation("Email address is invalid".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::temp_db;
    use chrono::Duration;

    fn service() -> (AuthService, tempfile::TempDir) {
        let (db, dir) = temp_db();
        let tokens = TokenService::new("dGVzdC1zZWNyZXQta2V5", Duration::minutes(60), false).unwrap();
        (AuthService::new(Arc::new(db), Arc::new(tokens)), dir)
    }

    #[test]
    fn register_then_login_issues_token_for_username() {
        let (auth, _dir) = service();
        auth.register("alice", "s3cret", "alice@example.com").unwrap();

        let token = auth.authenticate("alice", "s3cret").unwrap();
        assert!(auth.tokens().validate(&token, "alice"));
        let claims = auth.tokens().decode(&token).unwrap();
        assert_eq!(claims.roles, vec![Role::User]);
    }

    #[test]
    fn wrong_password_and_unknown_user_look_the_same() {
        let (auth, _dir) = service();
        auth.register("alice", "s3cret", "alice@example.com").unwrap();

        let wrong = auth.authenticate("alice", "nope").unwrap_err();
        let unknown = auth.authenticate("mallory", "nope").unwrap_err();
        assert!(matches!(wrong, AuthServiceError::InvalidCredentials));
        assert!(matches!(unknown, AuthServiceError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[test]
    fn duplicate_username_fails_and_first_user_survives() {
        let (auth, _dir) = service();
        auth.register("alice", "first", "alice@example.com").unwrap();

        let err = auth.register("alice", "second", "other@example.com").unwrap_err();
        assert!(matches!(err, AuthServiceError::DuplicateUsername));

        assert!(auth.authenticate("alice", "first").is_ok());
        assert!(auth.authenticate("alice", "second").is_err());
    }

    #[test]
    fn duplicate_email_is_case_insensitive() {
        let (auth, _dir) = service();
        auth.register("alice", "pw", "alice@example.com").unwrap();
        let err = auth.register("bob", "pw", "ALICE@example.com").unwrap_err();
        assert!(matches!(err, AuthServiceError::DuplicateEmail));
    }

    #[test]
    fn registration_input_is_validated() {
        let (auth, _dir) = service();
        for (username, password, email) in [
            ("", "pw", "a@example.com"),
            (" alice", "pw", "a@example.com"),
            ("alice", "", "a@example.com"),
            ("alice", "pw", "not-an-email"),
            ("alice", "pw", "@example.com"),
        ] {
            assert!(matches!(
                auth.register(username, password, email),
                Err(AuthServiceError::Validation(_))
            ));
        }
    }

    #[test]
    fn bootstrap_admin_is_idempotent() {
        let (auth, _dir) = service();
        let admin = AdminBootstrap {
            username: "root".to_string(),
            password: "rootpw".to_string(),
            email: "root@example.com".to_string(),
        };

        assert!(auth.bootstrap_admin(&admin).unwrap());
        assert!(!auth.bootstrap_admin(&admin).unwrap());

        let token = auth.authenticate("root", "rootpw").unwrap();
        let claims = auth.tokens().decode(&token).unwrap();
        assert_eq!(claims.roles, vec![Role::Admin]);
    }
}
