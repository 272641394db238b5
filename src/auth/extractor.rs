// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AuthError, AuthenticatedUser, Role};
use crate::state::AppState;
use crate::storage::UserRepository;

/// Extractor for authenticated users.
///
/// Reads `Authorization: Bearer <token>`, verifies the token, loads the user
/// named by its subject and checks the token against that user. Roles come
/// from the stored user, not from the token.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_cards(
///     Auth(user): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<CardPage>, ApiError> {
///     // user.user_id scopes every card lookup
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // A previous extractor on this request already authenticated
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        // Extract Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        // Extract Bearer token
        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidAuthHeader)?;

        let user = authenticate_token(state, token)?;
        parts.extensions.insert(user.clone());

        Ok(Auth(user))
    }
}

/// Resolve a bearer token to the stored user it was issued to.
fn authenticate_token(state: &AppState, token: &str) -> Result<AuthenticatedUser, AuthError> {
    let claims = state.tokens.decode(token)?;

    let user = UserRepository::new(&state.db)
        .find_by_username(&claims.sub)
        .map_err(|e| AuthError::InternalError(e.to_string()))?
        .ok_or(AuthError::UnknownSubject)?;

    if !state.tokens.validate(token, &user.username) {
        return Err(AuthError::UnknownSubject);
    }

    Ok(AuthenticatedUser {
        user_id: user.id,
        username: user.username,
        roles: user.roles,
    })
}

/// Extractor that requires admin role.
pub struct AdminOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.has_role(Role::Admin) {
            tracing::warn!(user_id = user.user_id, "Admin route denied");
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(AdminOnly(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;
    use crate::storage::NewUser;
    use axum::http::Request;
    use chrono::{Duration, Utc};

    fn parts_with_token(token: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn seed(state: &AppState, username: &str, roles: Vec<Role>) -> u64 {
        UserRepository::new(&state.db)
            .create(NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash: "unused".to_string(),
                roles,
            })
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let (state, _dir) = test_state();
        let mut parts = parts_with_token(None);

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_rejects_non_bearer_scheme() {
        let (state, _dir) = test_state();
        let mut parts = Request::builder()
            .uri("/test")
            .header("Authorization", "Basic YWxpY2U6cHc=")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_resolves_stored_user() {
        let (state, _dir) = test_state();
        let id = seed(&state, "alice", vec![Role::User]);
        let token = state.tokens.issue("alice", &[Role::User]).unwrap();
        let mut parts = parts_with_token(Some(&token));

        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.user_id, id);
        assert_eq!(user.username, "alice");
        assert_eq!(parts.extensions.get::<AuthenticatedUser>().unwrap().user_id, id);
    }

    #[tokio::test]
    async fn token_for_deleted_user_is_rejected() {
        let (state, _dir) = test_state();
        let token = state.tokens.issue("ghost", &[Role::User]).unwrap();
        let mut parts = parts_with_token(Some(&token));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::UnknownSubject)));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let (state, _dir) = test_state();
        seed(&state, "alice", vec![Role::User]);
        let token = state
            .tokens
            .issue_at("alice", &[Role::User], Utc::now() - Duration::days(1))
            .unwrap();
        let mut parts = parts_with_token(Some(&token));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn roles_come_from_the_stored_user() {
        let (state, _dir) = test_state();
        seed(&state, "alice", vec![Role::User]);
        // Token claims admin, but the stored user is not one.
        let token = state.tokens.issue("alice", &[Role::Admin]).unwrap();
        let mut parts = parts_with_token(Some(&token));

        let result = AdminOnly::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));
    }

    #[tokio::test]
    async fn admin_only_accepts_admin() {
        let (state, _dir) = test_state();
        seed(&state, "root", vec![Role::Admin]);
        let token = state.tokens.issue("root", &[Role::Admin]).unwrap();
        let mut parts = parts_with_token(Some(&token));

        let AdminOnly(user) = AdminOnly::from_request_parts(&mut parts, &state).await.unwrap();
        assert!(user.has_role(Role::Admin));
    }

    #[tokio::test]
    async fn auth_extractor_prefers_extensions() {
        let (state, _dir) = test_state();
        let mut parts = parts_with_token(None);
        parts.extensions.insert(AuthenticatedUser {
            user_id: 99,
            username: "cached".to_string(),
            roles: vec![Role::User],
        });

        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.user_id, 99);
    }
}
