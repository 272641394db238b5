// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Card engine error taxonomy.

use crate::storage::{StorageError, UniqueKey};

use super::cipher::CipherError;

pub const ALREADY_BLOCKED: &str = "Card is already blocked";
pub const ALREADY_ACTIVE: &str = "Card is already active";
pub const EXPIRED: &str = "Card is expired";
pub const NON_POSITIVE_AMOUNT: &str = "Amount must be positive";
pub const INVALID_EXPIRY: &str = "Invalid expiry date format";
pub const SAME_CARD_TRANSFER: &str = "Cannot transfer to the same card";
pub const BALANCE_OVERFLOW: &str = "Balance overflow";

#[derive(Debug, thiserror::Error)]
pub enum CardError {
    /// Card or user absent, or outside the caller's scope.
    #[error("{0} not found")]
    NotFound(String),

    #[error("Card with this number already exists")]
    AlreadyExists,

    #[error("{0}")]
    NotActive(String),

    #[error("Insufficient funds")]
    InsufficientFunds,

    /// Precondition failure: state rule, amount or input validation.
    #[error("{0}")]
    Operation(String),

    #[error("Card data encryption failed: {0}")]
    Encryption(#[from] CipherError),

    #[error("Storage failure: {0}")]
    Storage(StorageError),
}

impl CardError {
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation(message.into())
    }
}

impl From<StorageError> for CardError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => CardError::NotFound(what),
            StorageError::Conflict(UniqueKey::CardNumber) => CardError::AlreadyExists,
            StorageError::DuplicateRow(_) => CardError::operation(SAME_CARD_TRANSFER),
            other => CardError::Storage(other),
        }
    }
}
