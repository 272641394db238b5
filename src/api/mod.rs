// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::Role,
    models::{
        CardPage, CardResponse, CreateCardRequest, LoginRequest, RegisterRequest, TokenResponse,
        TopUpRequest, TransferRequest, UserResponse,
    },
    state::AppState,
    storage::CardStatus,
};

pub mod admin;
pub mod auth;
pub mod cards;
pub mod health;
pub mod users;

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/users/me", get(users::get_current_user))
        .route("/cards", get(cards::list_cards).post(cards::create_card))
        .route("/cards/all", get(cards::list_all_cards))
        .route("/cards/transfer", post(cards::transfer))
        .route("/cards/top-up", post(cards::top_up))
        .route("/cards/{id}", get(cards::get_card).delete(cards::delete_card))
        .route("/cards/{id}/block", put(cards::block_card))
        .route("/cards/{id}/activate", put(cards::activate_card))
        .route("/admin/cards", get(admin::list_cards).post(admin::create_card))
        .route(
            "/admin/cards/{id}",
            get(admin::get_card).delete(admin::delete_card),
        )
        .route("/admin/cards/{id}/block", put(admin::block_card))
        .route("/admin/cards/{id}/activate", put(admin::activate_card))
        .route("/admin/users", get(admin::list_users))
        .route(
            "/admin/users/{id}",
            get(admin::get_user).delete(admin::delete_user),
        );

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::register,
        users::get_current_user,
        cards::list_cards,
        cards::list_all_cards,
        cards::get_card,
        cards::create_card,
        cards::block_card,
        cards::activate_card,
        cards::delete_card,
        cards::transfer,
        cards::top_up,
        admin::list_cards,
        admin::get_card,
        admin::create_card,
        admin::block_card,
        admin::activate_card,
        admin::delete_card,
        admin::list_users,
        admin::get_user,
        admin::delete_user,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            LoginRequest,
            RegisterRequest,
            TokenResponse,
            CreateCardRequest,
            CardResponse,
            CardPage,
            CardStatus,
            TopUpRequest,
            TransferRequest,
            UserResponse,
            Role,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and registration"),
        (name = "Users", description = "Current user profile"),
        (name = "Cards", description = "Card management for the card owner"),
        (name = "Admin", description = "Card and user administration"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
