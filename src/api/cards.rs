// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Card endpoints for the authenticated owner.
//!
//! Every lookup is scoped to the caller. Cards owned by someone else are
//! reported exactly like cards that do not exist.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{CardPage, CardResponse, CreateCardRequest, PageQuery, TopUpRequest, TransferRequest},
    state::AppState,
    storage::AccessScope,
};

/// List the caller's cards, one page at a time.
#[utoipa::path(
    get,
    path = "/api/cards",
    tag = "Cards",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Page of cards", body = CardPage),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_cards(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CardPage>, ApiError> {
    Ok(Json(state.cards.list_for_owner(user.user_id, query.into())?))
}

/// List every card the caller owns.
#[utoipa::path(
    get,
    path = "/api/cards/all",
    tag = "Cards",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All cards of the caller", body = Vec<CardResponse>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_all_cards(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<CardResponse>>, ApiError> {
    Ok(Json(state.cards.list_all_for_owner(user.user_id)?))
}

#[utoipa::path(
    get,
    path = "/api/cards/{id}",
    tag = "Cards",
    security(("bearer_auth" = [])),
    params(("id" = u64, Path, description = "Card id")),
    responses(
        (status = 200, description = "Card", body = CardResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Card not found")
    )
)]
pub async fn get_card(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(card_id): Path<u64>,
) -> Result<Json<CardResponse>, ApiError> {
    Ok(Json(state.cards.get(card_id, AccessScope::for_user(&user))?))
}

/// Create a card owned by the caller. New cards are active with a zero balance.
#[utoipa::path(
    post,
    path = "/api/cards",
    tag = "Cards",
    security(("bearer_auth" = [])),
    request_body = CreateCardRequest,
    responses(
        (status = 201, description = "Card created", body = CardResponse),
        (status = 400, description = "Invalid card data"),
        (status = 401, description = "Not authenticated"),
        (status = 409, description = "Card number already registered")
    )
)]
pub async fn create_card(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<CardResponse>), ApiError> {
    let card = state.cards.create(user.user_id, &request)?;
    Ok((StatusCode::CREATED, Json(card)))
}

#[utoipa::path(
    put,
    path = "/api/cards/{id}/block",
    tag = "Cards",
    security(("bearer_auth" = [])),
    params(("id" = u64, Path, description = "Card id")),
    responses(
        (status = 200, description = "Card blocked", body = CardResponse),
        (status = 400, description = "Card is already blocked"),
        (status = 404, description = "Card not found")
    )
)]
pub async fn block_card(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(card_id): Path<u64>,
) -> Result<Json<CardResponse>, ApiError> {
    Ok(Json(state.cards.block(card_id, AccessScope::for_user(&user))?))
}

#[utoipa::path(
    put,
    path = "/api/cards/{id}/activate",
    tag = "Cards",
    security(("bearer_auth" = [])),
    params(("id" = u64, Path, description = "Card id")),
    responses(
        (status = 200, description = "Card activated", body = CardResponse),
        (status = 400, description = "Card is already active or expired"),
        (status = 404, description = "Card not found")
    )
)]
pub async fn activate_card(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(card_id): Path<u64>,
) -> Result<Json<CardResponse>, ApiError> {
    Ok(Json(state.cards.activate(card_id, AccessScope::for_user(&user))?))
}

#[utoipa::path(
    delete,
    path = "/api/cards/{id}",
    tag = "Cards",
    security(("bearer_auth" = [])),
    params(("id" = u64, Path, description = "Card id")),
    responses(
        (status = 204, description = "Card deleted"),
        (status = 404, description = "Card not found")
    )
)]
pub async fn delete_card(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(card_id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.cards.delete(card_id, AccessScope::for_user(&user))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move funds between two of the caller's active cards.
#[utoipa::path(
    post,
    path = "/api/cards/transfer",
    tag = "Cards",
    security(("bearer_auth" = [])),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer completed"),
        (status = 400, description = "Invalid amount or same source and destination"),
        (status = 404, description = "Card not found"),
        (status = 409, description = "A card is not active"),
        (status = 422, description = "Insufficient funds")
    )
)]
pub async fn transfer(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<StatusCode, ApiError> {
    state.cards.transfer(
        user.user_id,
        request.from_card_id,
        request.to_card_id,
        request.amount,
    )?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/cards/top-up",
    tag = "Cards",
    security(("bearer_auth" = [])),
    request_body = TopUpRequest,
    responses(
        (status = 200, description = "Card topped up", body = CardResponse),
        (status = 400, description = "Invalid amount"),
        (status = 404, description = "Card not found"),
        (status = 409, description = "Card is not active")
    )
)]
pub async fn top_up(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<TopUpRequest>,
) -> Result<Json<CardResponse>, ApiError> {
    Ok(Json(state.cards.top_up(user.user_id, request.card_id, request.amount)?))
}
