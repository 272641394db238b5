// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only API endpoints.
//!
//! These endpoints require the Admin role and provide:
//! - Card management across every owner
//! - User listing, lookup and deletion

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::AdminOnly,
    error::ApiError,
    models::{AdminCreateCardQuery, CardPage, CardResponse, CreateCardRequest, PageQuery, UserResponse},
    state::AppState,
    storage::{AccessScope, UserRepository},
};

// ============================================================================
// Cards
// ============================================================================

/// List every card in the system.
#[utoipa::path(
    get,
    path = "/api/admin/cards",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Page of cards", body = CardPage),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn list_cards(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CardPage>, ApiError> {
    Ok(Json(state.cards.list_all(query.into())?))
}

#[utoipa::path(
    get,
    path = "/api/admin/cards/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = u64, Path, description = "Card id")),
    responses(
        (status = 200, description = "Card", body = CardResponse),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Card not found")
    )
)]
pub async fn get_card(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Path(card_id): Path<u64>,
) -> Result<Json<CardResponse>, ApiError> {
    Ok(Json(state.cards.get(card_id, AccessScope::Any)?))
}

/// Create a card on behalf of a user.
#[utoipa::path(
    post,
    path = "/api/admin/cards",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(AdminCreateCardQuery),
    request_body = CreateCardRequest,
    responses(
        (status = 201, description = "Card created", body = CardResponse),
        (status = 400, description = "Invalid card data"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Card number already registered")
    )
)]
pub async fn create_card(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Query(query): Query<AdminCreateCardQuery>,
    Json(request): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<CardResponse>), ApiError> {
    let card = state.cards.create(query.user_id, &request)?;
    tracing::info!(admin_id = admin.user_id, card_id = card.id, user_id = query.user_id, "Admin created card");
    Ok((StatusCode::CREATED, Json(card)))
}

#[utoipa::path(
    put,
    path = "/api/admin/cards/{id}/block",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = u64, Path, description = "Card id")),
    responses(
        (status = 200, description = "Card blocked", body = CardResponse),
        (status = 400, description = "Card is already blocked"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Card not found")
    )
)]
pub async fn block_card(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Path(card_id): Path<u64>,
) -> Result<Json<CardResponse>, ApiError> {
    Ok(Json(state.cards.block(card_id, AccessScope::Any)?))
}

/// Activate any card. Same rules as the owner route: active or expired cards are rejected.
#[utoipa::path(
    put,
    path = "/api/admin/cards/{id}/activate",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = u64, Path, description = "Card id")),
    responses(
        (status = 200, description = "Card activated", body = CardResponse),
        (status = 400, description = "Card is already active or expired"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Card not found")
    )
)]
pub async fn activate_card(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Path(card_id): Path<u64>,
) -> Result<Json<CardResponse>, ApiError> {
    Ok(Json(state.cards.activate(card_id, AccessScope::Any)?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/cards/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = u64, Path, description = "Card id")),
    responses(
        (status = 204, description = "Card deleted"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "Card not found")
    )
)]
pub async fn delete_card(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Path(card_id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.cards.delete(card_id, AccessScope::Any)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Users
// ============================================================================

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 403, description = "Not authorized (admin required)")
    )
)]
pub async fn list_users(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = UserRepository::new(&state.db).list_all()?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = UserRepository::new(&state.db).get(user_id)?;
    Ok(Json(user.into()))
}

/// Delete a user together with all of their cards.
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let removed_cards = UserRepository::new(&state.db).delete(user_id)?;
    tracing::info!(admin_id = admin.user_id, user_id, removed_cards, "Admin deleted user");
    Ok(StatusCode::NO_CONTENT)
}
