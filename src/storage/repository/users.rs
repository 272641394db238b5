// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User repository.
//!
//! Usernames are unique as given. Emails are unique after NFKC normalisation
//! and lowercasing, so `Alice@Example.com` and `alice@example.com` collide.
//! Deleting a user removes every card the user owns in the same transaction.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::auth::Role;
use crate::storage::database::{
    next_id, read_row, Database, CARDS, CARD_NUMBER_INDEX, EMAIL_INDEX, OWNER_CARDS,
    USERNAME_INDEX, USERS,
};
use crate::storage::{StorageError, StorageResult, UniqueKey};

use super::cards::StoredCard;

/// User record as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: u64,
    pub username: String,
    pub email: String,
    /// bcrypt hash; the plaintext password is never stored.
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

/// Key used by the email uniqueness index.
pub fn email_key(email: &str) -> String {
    email.trim().nfkc().collect::<String>().to_lowercase()
}

pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a user, enforcing username then email uniqueness.
    ///
    /// # Errors
    /// `StorageError::Conflict` naming the first unique key already taken.
    pub fn create(&self, new_user: NewUser) -> StorageResult<StoredUser> {
        let write_txn = self.db.begin_write()?;
        let user = {
            let mut usernames = write_txn.open_table(USERNAME_INDEX)?;
            if usernames.get(new_user.username.as_str())?.is_some() {
                return Err(StorageError::Conflict(UniqueKey::Username));
            }

            let key = email_key(&new_user.email);
            let mut emails = write_txn.open_table(EMAIL_INDEX)?;
            if emails.get(key.as_str())?.is_some() {
                return Err(StorageError::Conflict(UniqueKey::Email));
            }

            let id = next_id(&write_txn, "users")?;
            let user = StoredUser {
                id,
                username: new_user.username,
                email: new_user.email,
                password_hash: new_user.password_hash,
                roles: new_user.roles,
                created_at: Utc::now(),
            };

            let json = serde_json::to_vec(&user)?;
            let mut users = write_txn.open_table(USERS)?;
            users.insert(id, json.as_slice())?;
            usernames.insert(user.username.as_str(), id)?;
            emails.insert(key.as_str(), id)?;
            user
        };
        write_txn.commit()?;

        tracing::info!(user_id = user.id, username = %user.username, "Created user");
        Ok(user)
    }

    /// Get a user by ID.
    pub fn get(&self, id: u64) -> StorageResult<StoredUser> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;
        read_row(&users, id)?.ok_or_else(|| StorageError::NotFound(format!("User {id}")))
    }

    pub fn find_by_username(&self, username: &str) -> StorageResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let usernames = read_txn.open_table(USERNAME_INDEX)?;
        let Some(id) = usernames.get(username)?.map(|v| v.value()) else {
            return Ok(None);
        };
        let users = read_txn.open_table(USERS)?;
        read_row(&users, id)
    }

    pub fn exists_by_username(&self, username: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let usernames = read_txn.open_table(USERNAME_INDEX)?;
        Ok(usernames.get(username)?.is_some())
    }

    pub fn exists_by_email(&self, email: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let emails = read_txn.open_table(EMAIL_INDEX)?;
        Ok(emails.get(email_key(email).as_str())?.is_some())
    }

    /// List all users in id order (admin view).
    pub fn list_all(&self) -> StorageResult<Vec<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;
        let mut result: Vec<StoredUser> = Vec::new();
        for entry in users.iter()? {
            let (_, value) = entry?;
            result.push(serde_json::from_slice(value.value())?);
        }
        Ok(result)
    }

    /// Delete a user together with all cards they own.
    ///
    /// Returns the number of cards removed.
    pub fn delete(&self, id: u64) -> StorageResult<usize> {
        let write_txn = self.db.begin_write()?;
        let removed_cards = {
            let mut users = write_txn.open_table(USERS)?;
            let user: StoredUser =
                read_row(&users, id)?.ok_or_else(|| StorageError::NotFound(format!("User {id}")))?;

            let mut owner_cards = write_txn.open_table(OWNER_CARDS)?;
            let mut card_ids = Vec::new();
            for entry in owner_cards.range((id, 0u64)..=(id, u64::MAX))? {
                let (key, _) = entry?;
                card_ids.push(key.value().1);
            }

            let mut cards = write_txn.open_table(CARDS)?;
            let mut numbers = write_txn.open_table(CARD_NUMBER_INDEX)?;
            for card_id in &card_ids {
                if let Some(card) = read_row::<StoredCard, _>(&cards, *card_id)? {
                    numbers.remove(card.card_number.as_str())?;
                }
                cards.remove(*card_id)?;
                owner_cards.remove((id, *card_id))?;
            }

            let mut usernames = write_txn.open_table(USERNAME_INDEX)?;
            usernames.remove(user.username.as_str())?;
            let mut emails = write_txn.open_table(EMAIL_INDEX)?;
            emails.remove(email_key(&user.email).as_str())?;
            users.remove(id)?;

            card_ids.len()
        };
        write_txn.commit()?;

        tracing::info!(user_id = id, removed_cards, "Deleted user");
        Ok(removed_cards)
    }
}
