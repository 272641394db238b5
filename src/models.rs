// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. All types derive
//! `ToSchema` for the OpenAPI document. Field names are camelCase on the
//! wire; balances and amounts travel as decimal strings.
//!
//! ## Model Categories
//!
//! - **Auth**: login, registration, issued tokens
//! - **Cards**: creation, masked card views, fund movements
//! - **Users**: profiles without credentials
//! - **Paging**: page query and page envelope

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::Role;
use crate::storage::{CardStatus, StoredUser};

// =============================================================================
// Auth Models
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Issued session token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// Signed bearer token
    pub token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: i64,
}

// =============================================================================
// Card Models
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardRequest {
    /// 16-digit card number
    #[schema(example = "4111111111111111")]
    pub card_number: String,
    /// Name printed on the card
    pub card_holder: String,
    /// Expiry in `MM/YY` form
    #[schema(example = "12/30")]
    pub expiry_date: String,
}

/// Card as returned to any caller. The number is always masked.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardResponse {
    pub id: u64,
    #[schema(example = "**** **** **** 1111")]
    pub card_number: String,
    pub card_holder: String,
    pub expiry_date: String,
    pub status: CardStatus,
    #[schema(value_type = String, example = "100.00")]
    pub balance: Decimal,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopUpRequest {
    pub card_id: u64,
    #[schema(value_type = String, example = "50.00")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from_card_id: u64,
    pub to_card_id: u64,
    #[schema(value_type = String, example = "25.00")]
    pub amount: Decimal,
}

/// Query for `POST /api/admin/cards`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AdminCreateCardQuery {
    /// Owner of the new card
    pub user_id: u64,
}

// =============================================================================
// User Models
// =============================================================================

/// User profile. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
}

impl From<StoredUser> for UserResponse {
    fn from(user: StoredUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            roles: user.roles,
            created_at: user.created_at,
        }
    }
}

// =============================================================================
// Paging
// =============================================================================

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Zero-based page index (default: 0)
    #[param(default = 0)]
    pub page: Option<usize>,
    /// Page size (default: 20, max: 100)
    #[param(default = 20)]
    pub size: Option<usize>,
}

/// A resolved, bounded page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl From<PageQuery> for PageRequest {
    fn from(query: PageQuery) -> Self {
        let size = query
            .size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        Self {
            page: query.page.unwrap_or(0),
            size,
        }
    }
}

/// One page of cards.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardPage {
    pub content: Vec<CardResponse>,
    pub page: usize,
    pub size: usize,
    pub total_elements: usize,
    pub total_pages: usize,
}

impl CardPage {
    pub fn new(content: Vec<CardResponse>, request: PageRequest, total_elements: usize) -> Self {
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages: total_elements.div_ceil(request.size),
        }
    }
}
