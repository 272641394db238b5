// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login and registration endpoints. Both are public.
//!
//! Password hashing and the database write run on the blocking pool so a
//! burst of logins does not stall the async workers.

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::ApiError,
    models::{LoginRequest, RegisterRequest, TokenResponse},
    state::AppState,
};

/// Exchange credentials for a bearer token.
///
/// Unknown usernames and wrong passwords produce the same 401.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let auth = state.auth.clone();
    let token = tokio::task::spawn_blocking(move || auth.authenticate(&request.username, &request.password))
        .await
        .map_err(ApiError::internal)??;

    Ok(Json(TokenResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.ttl().num_seconds(),
    }))
}

/// Register a new user account.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered"),
        (status = 400, description = "Invalid registration data"),
        (status = 409, description = "Username or email already in use")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<StatusCode, ApiError> {
    let auth = state.auth.clone();
    let username = request.username.clone();
    tokio::task::spawn_blocking(move || auth.register(&request.username, &request.password, &request.email))
        .await
        .map_err(ApiError::internal)??;
    tracing::info!(%username, "User registered");
    Ok(StatusCode::OK)
}
