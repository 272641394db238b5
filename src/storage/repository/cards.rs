// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Card repository.
//!
//! Card rows hold the encrypted card number only. Lookups take an
//! [`AccessScope`]; a row outside the scope is reported as not found.
//!
//! Mutations run as closures inside a single write transaction: the row is
//! read, handed to the closure, and written back only when the closure
//! succeeds. A failing closure aborts the transaction, leaving every row
//! untouched.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, WriteTransaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::database::{
    next_id, read_row, Database, CARDS, CARD_NUMBER_INDEX, OWNER_CARDS, USERS,
};
use crate::storage::{AccessScope, OwnedResource, StorageError, StorageResult, UniqueKey};

/// Card lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardStatus {
    /// Card may receive and send funds
    Active,
    /// Card is frozen; no fund movement
    Blocked,
}

/// Card record as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCard {
    pub id: u64,
    pub owner_id: u64,
    /// Deterministic ciphertext of the 16-digit card number
    pub card_number: String,
    pub card_holder: String,
    /// Expiry in `MM/YY` form
    pub expiry_date: String,
    pub status: CardStatus,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnedResource for StoredCard {
    fn owner_id(&self) -> u64 {
        self.owner_id
    }
}

/// Fields required to insert a card.
#[derive(Debug, Clone)]
pub struct NewCard {
    pub owner_id: u64,
    pub card_number: String,
    pub card_holder: String,
    pub expiry_date: String,
}

/// A window into a larger ordered result.
#[derive(Debug, Clone)]
pub struct CardSlice {
    pub cards: Vec<StoredCard>,
    pub total: usize,
}

pub struct CardRepository<'a> {
    db: &'a Database,
}

impl<'a> CardRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a new card with a zero balance and `ACTIVE` status.
    ///
    /// # Errors
    /// - `StorageError::NotFound` if the owner does not exist
    /// - `StorageError::Conflict(UniqueKey::CardNumber)` if the number is taken
    pub fn create(&self, new_card: NewCard) -> StorageResult<StoredCard> {
        let write_txn = self.db.begin_write()?;
        let card = {
            let users = write_txn.open_table(USERS)?;
            if users.get(new_card.owner_id)?.is_none() {
                return Err(StorageError::NotFound(format!("User {}", new_card.owner_id)));
            }

            let mut numbers = write_txn.open_table(CARD_NUMBER_INDEX)?;
            if numbers.get(new_card.card_number.as_str())?.is_some() {
                return Err(StorageError::Conflict(UniqueKey::CardNumber));
            }

            let id = next_id(&write_txn, "cards")?;
            let now = Utc::now();
            let card = StoredCard {
                id,
                owner_id: new_card.owner_id,
                card_number: new_card.card_number,
                card_holder: new_card.card_holder,
                expiry_date: new_card.expiry_date,
                status: CardStatus::Active,
                balance: Decimal::ZERO,
                created_at: now,
                updated_at: now,
            };

            write_card(&write_txn, &card)?;
            numbers.insert(card.card_number.as_str(), id)?;
            let mut owner_cards = write_txn.open_table(OWNER_CARDS)?;
            owner_cards.insert((card.owner_id, id), ())?;
            card
        };
        write_txn.commit()?;

        Ok(card)
    }

    /// Get a card by ID within a scope.
    pub fn get(&self, id: u64, scope: AccessScope) -> StorageResult<StoredCard> {
        let read_txn = self.db.begin_read()?;
        let cards = read_txn.open_table(CARDS)?;
        match read_row::<StoredCard, _>(&cards, id)? {
            Some(card) if scope.permits(&card) => Ok(card),
            _ => Err(card_not_found(id)),
        }
    }

    pub fn exists_by_number(&self, card_number: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let numbers = read_txn.open_table(CARD_NUMBER_INDEX)?;
        Ok(numbers.get(card_number)?.is_some())
    }

    /// Cards of one owner in id order, skipping `offset` and returning at most `limit`.
    pub fn list_by_owner(&self, owner_id: u64, offset: usize, limit: usize) -> StorageResult<CardSlice> {
        let read_txn = self.db.begin_read()?;
        let owner_cards = read_txn.open_table(OWNER_CARDS)?;
        let cards = read_txn.open_table(CARDS)?;

        let mut total = 0;
        let mut result: Vec<StoredCard> = Vec::new();
        for entry in owner_cards.range((owner_id, 0u64)..=(owner_id, u64::MAX))? {
            let (key, _) = entry?;
            if total >= offset && result.len() < limit {
                let card_id = key.value().1;
                if let Some(card) = read_row(&cards, card_id)? {
                    result.push(card);
                }
            }
            total += 1;
        }

        Ok(CardSlice { cards: result, total })
    }

    /// All cards in id order (admin view).
    pub fn list_all(&self, offset: usize, limit: usize) -> StorageResult<CardSlice> {
        let read_txn = self.db.begin_read()?;
        let cards = read_txn.open_table(CARDS)?;

        let mut total = 0;
        let mut result: Vec<StoredCard> = Vec::new();
        for entry in cards.iter()? {
            let (_, value) = entry?;
            if total >= offset && result.len() < limit {
                result.push(serde_json::from_slice(value.value())?);
            }
            total += 1;
        }

        Ok(CardSlice { cards: result, total })
    }

    /// Read-modify-write of a single card.
    ///
    /// The closure sees the current row. On `Ok` the modified row is
    /// persisted and returned alongside the closure's value; on `Err` nothing
    /// is written.
    pub fn update<T, E, F>(&self, id: u64, scope: AccessScope, f: F) -> Result<(T, StoredCard), E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut StoredCard) -> Result<T, E>,
    {
        let write_txn = self.db.begin_write()?;
        let mut card = load_scoped(&write_txn, id, scope)?;

        let value = match f(&mut card) {
            Ok(value) => value,
            Err(err) => {
                write_txn.abort().map_err(StorageError::from)?;
                return Err(err);
            }
        };

        card.updated_at = Utc::now();
        write_card(&write_txn, &card)?;
        write_txn.commit().map_err(StorageError::from)?;

        Ok((value, card))
    }

    /// Read-modify-write of two distinct cards in one transaction.
    ///
    /// Both rows are written or neither is.
    pub fn update_pair<T, E, F>(
        &self,
        first_id: u64,
        second_id: u64,
        scope: AccessScope,
        f: F,
    ) -> Result<(T, StoredCard, StoredCard), E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut StoredCard, &mut StoredCard) -> Result<T, E>,
    {
        if first_id == second_id {
            return Err(StorageError::DuplicateRow(first_id).into());
        }

        let write_txn = self.db.begin_write()?;
        let mut first = load_scoped(&write_txn, first_id, scope)?;
        let mut second = load_scoped(&write_txn, second_id, scope)?;

        let value = match f(&mut first, &mut second) {
            Ok(value) => value,
            Err(err) => {
                write_txn.abort().map_err(StorageError::from)?;
                return Err(err);
            }
        };

        let now = Utc::now();
        first.updated_at = now;
        second.updated_at = now;
        write_card(&write_txn, &first)?;
        write_card(&write_txn, &second)?;
        write_txn.commit().map_err(StorageError::from)?;

        Ok((value, first, second))
    }

    /// Delete a card within a scope.
    pub fn delete(&self, id: u64, scope: AccessScope) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let card = load_scoped(&write_txn, id, scope)?;
            let mut cards = write_txn.open_table(CARDS)?;
            cards.remove(id)?;
            let mut numbers = write_txn.open_table(CARD_NUMBER_INDEX)?;
            numbers.remove(card.card_number.as_str())?;
            let mut owner_cards = write_txn.open_table(OWNER_CARDS)?;
            owner_cards.remove((card.owner_id, id))?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

fn card_not_found(id: u64) -> StorageError {
    StorageError::NotFound(format!("Card {id}"))
}

fn load_scoped(write_txn: &WriteTransaction, id: u64, scope: AccessScope) -> StorageResult<StoredCard> {
    let cards = write_txn.open_table(CARDS)?;
    match read_row::<StoredCard, _>(&cards, id)? {
        Some(card) if scope.permits(&card) => Ok(card),
        _ => Err(card_not_found(id)),
    }
}

fn write_card(write_txn: &WriteTransaction, card: &StoredCard) -> StorageResult<()> {
    let json = serde_json::to_vec(card)?;
    let mut cards = write_txn.open_table(CARDS)?;
    cards.insert(card.id, json.as_slice())?;
    Ok(())
}
