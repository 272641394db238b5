// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the database.
//!
//! Each repository borrows the [`Database`](crate::storage::Database) and
//! opens its own transactions.

pub mod cards;
pub mod users;

pub use cards::{CardRepository, CardSlice, CardStatus, NewCard, StoredCard};
pub use users::{email_key, NewUser, StoredUser, UserRepository};
