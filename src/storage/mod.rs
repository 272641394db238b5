// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Users and cards persist in a single embedded redb database. Card numbers
//! reach this layer already encrypted; nothing here sees a plaintext number.
//!
//! ## Layout
//!
//! - [`database`]: table definitions, error type, transaction helpers
//! - [`ownership`]: owner scoping applied to every card lookup
//! - [`repository`]: typed access per entity

pub mod database;
pub mod ownership;
pub mod repository;

pub use database::{Database, StorageError, StorageResult, UniqueKey};
pub use ownership::{AccessScope, OwnedResource};
pub use repository::{
    CardRepository, CardSlice, CardStatus, NewCard, NewUser, StoredCard, StoredUser,
    UserRepository,
};
