// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bank Cards Server - virtual card management service
//!
//! Users register, log in with a bearer token, and manage their own cards:
//! create, block, activate, top up and transfer between them. Administrators
//! manage every card and user.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Passwords, session tokens, request extractors
//! - `cards` - Card lifecycle, balances, card-number encryption and masking
//! - `storage` - Embedded redb database and repositories

pub mod api;
pub mod auth;
pub mod cards;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
