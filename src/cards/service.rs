// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Card engine: lifecycle rules and fund movements.
//!
//! ## State Machine
//!
//! ```text
//!          block                 activate (not expired)
//! ACTIVE ---------> BLOCKED ---------------------------> ACTIVE
//! ```
//!
//! Expiry is derived from the `MM/YY` expiry date and never stored. Balance
//! changes happen only through top-up and transfer, and only on active cards.
//!
//! Every check that depends on a card's current state runs inside the
//! repository's write transaction, so concurrent requests on the same card are
//! serialized and a failed check leaves every row untouched.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use super::cipher::CardCipher;
use super::error::{
    CardError, ALREADY_ACTIVE, ALREADY_BLOCKED, BALANCE_OVERFLOW, EXPIRED, INVALID_EXPIRY,
    NON_POSITIVE_AMOUNT, SAME_CARD_TRANSFER,
};
use super::expiry::{self, ExpiryDate};
use super::masking::mask;
use crate::models::{CardPage, CardResponse, CreateCardRequest, PageRequest};
use crate::storage::{
    AccessScope, CardRepository, CardStatus, Database, NewCard, StoredCard,
};

const CARD_NUMBER_LEN: usize = 16;

/// Card operations shared by the user and admin routes.
#[derive(Clone)]
pub struct CardService {
    db: Arc<Database>,
    cipher: Arc<CardCipher>,
}

impl CardService {
    pub fn new(db: Arc<Database>, cipher: Arc<CardCipher>) -> Self {
        Self { db, cipher }
    }

    fn repo(&self) -> CardRepository<'_> {
        CardRepository::new(&self.db)
    }

    /// Create a card owned by `owner_id`.
    ///
    /// # Errors
    /// - `CardError::Operation` on invalid number, holder or expiry
    /// - `CardError::AlreadyExists` if the number is already registered
    /// - `CardError::NotFound` if the owner does not exist
    pub fn create(&self, owner_id: u64, request: &CreateCardRequest) -> Result<CardResponse, CardError> {
        let card_number = request.card_number.trim();
        let card_holder = request.card_holder.trim();
        let expiry_date = request.expiry_date.trim();
        validate_new_card(card_number, card_holder, expiry_date)?;

        let encrypted = self.cipher.encrypt(card_number)?;
        if self.repo().exists_by_number(&encrypted)? {
            tracing::warn!(user_id = owner_id, "Card number already registered");
            return Err(CardError::AlreadyExists);
        }

        let card = self.repo().create(NewCard {
            owner_id,
            card_number: encrypted,
            card_holder: card_holder.to_string(),
            expiry_date: expiry_date.to_string(),
        })?;

        tracing::info!(card_id = card.id, user_id = owner_id, "Card created");
        self.present(&card)
    }

    pub fn get(&self, card_id: u64, scope: AccessScope) -> Result<CardResponse, CardError> {
        let card = self.repo().get(card_id, scope)?;
        self.present(&card)
    }

    /// One page of an owner's cards in id order.
    pub fn list_for_owner(&self, owner_id: u64, page: PageRequest) -> Result<CardPage, CardError> {
        let slice = self.repo().list_by_owner(owner_id, page.offset(), page.size)?;
        Ok(CardPage::new(self.present_all(&slice.cards)?, page, slice.total))
    }

    /// Every card of an owner, unpaged.
    pub fn list_all_for_owner(&self, owner_id: u64) -> Result<Vec<CardResponse>, CardError> {
        let slice = self.repo().list_by_owner(owner_id, 0, usize::MAX)?;
        self.present_all(&slice.cards)
    }

    /// One page of every card in the system (admin view).
    pub fn list_all(&self, page: PageRequest) -> Result<CardPage, CardError> {
        let slice = self.repo().list_all(page.offset(), page.size)?;
        Ok(CardPage::new(self.present_all(&slice.cards)?, page, slice.total))
    }

    pub fn block(&self, card_id: u64, scope: AccessScope) -> Result<CardResponse, CardError> {
        let ((), card) = self.repo().update(card_id, scope, |card| {
            if card.status == CardStatus::Blocked {
                return Err(CardError::operation(ALREADY_BLOCKED));
            }
            card.status = CardStatus::Blocked;
            Ok(())
        }).inspect_err(|e| log_rejection(card_id, "block", e))?;

        tracing::info!(card_id, owner_id = card.owner_id, "Card blocked");
        self.present(&card)
    }

    pub fn activate(&self, card_id: u64, scope: AccessScope) -> Result<CardResponse, CardError> {
        self.activate_on(card_id, scope, Utc::now().date_naive())
    }

    pub(crate) fn activate_on(
        &self,
        card_id: u64,
        scope: AccessScope,
        today: NaiveDate,
    ) -> Result<CardResponse, CardError> {
        let ((), card) = self.repo().update(card_id, scope, |card| {
            if card.status == CardStatus::Active {
                return Err(CardError::operation(ALREADY_ACTIVE));
            }
            if expiry::is_expired(&card.expiry_date, today)? {
                return Err(CardError::operation(EXPIRED));
            }
            card.status = CardStatus::Active;
            Ok(())
        }).inspect_err(|e| log_rejection(card_id, "activate", e))?;

        tracing::info!(card_id, owner_id = card.owner_id, "Card activated");
        self.present(&card)
    }

    /// Add funds to one of the caller's active cards.
    pub fn top_up(&self, owner_id: u64, card_id: u64, amount: Decimal) -> Result<CardResponse, CardError> {
        ensure_positive(amount)?;

        let ((), card) = self.repo().update(card_id, AccessScope::Owner(owner_id), |card| {
            if card.status != CardStatus::Active {
                return Err(CardError::NotActive("Cannot top up an inactive card".to_string()));
            }
            card.balance = card
                .balance
                .checked_add(amount)
                .ok_or_else(|| CardError::operation(BALANCE_OVERFLOW))?;
            Ok(())
        }).inspect_err(|e| log_rejection(card_id, "top_up", e))?;

        tracing::info!(card_id, user_id = owner_id, %amount, "Card topped up");
        self.present(&card)
    }

    /// Move funds between two of the caller's active cards.
    ///
    /// Both balances are written in one transaction; their sum is unchanged.
    pub fn transfer(&self, owner_id: u64, from_id: u64, to_id: u64, amount: Decimal) -> Result<(), CardError> {
        ensure_positive(amount)?;
        if from_id == to_id {
            return Err(CardError::operation(SAME_CARD_TRANSFER));
        }

        self.repo()
            .update_pair(from_id, to_id, AccessScope::Owner(owner_id), |from, to| {
                if from.status != CardStatus::Active || to.status != CardStatus::Active {
                    return Err(CardError::NotActive("One or both cards are not active".to_string()));
                }
                if from.balance < amount {
                    return Err(CardError::InsufficientFunds);
                }
                let credited = to
                    .balance
                    .checked_add(amount)
                    .ok_or_else(|| CardError::operation(BALANCE_OVERFLOW))?;
                from.balance -= amount;
                to.balance = credited;
                Ok(())
            })
            .inspect_err(|e| log_rejection(from_id, "transfer", e))?;

        tracing::info!(from_card_id = from_id, to_card_id = to_id, user_id = owner_id, %amount, "Transfer completed");
        Ok(())
    }

    pub fn delete(&self, card_id: u64, scope: AccessScope) -> Result<(), CardError> {
        self.repo().delete(card_id, scope)?;
        tracing::info!(card_id, "Card deleted");
        Ok(())
    }

    /// Masked view of a stored card. Only the last four digits leave this module.
    fn present(&self, card: &StoredCard) -> Result<CardResponse, CardError> {
        let plaintext = self.cipher.decrypt(&card.card_number).inspect_err(|e| {
            tracing::error!(card_id = card.id, error = %e, "Card number could not be decrypted");
        })?;
        Ok(CardResponse {
            id: card.id,
            card_number: mask(&plaintext),
            card_holder: card.card_holder.clone(),
            expiry_date: card.expiry_date.clone(),
            status: card.status,
            balance: card.balance,
        })
    }

    fn present_all(&self, cards: &[StoredCard]) -> Result<Vec<CardResponse>, CardError> {
        cards.iter().map(|card| self.present(card)).collect()
    }
}

fn ensure_positive(amount: Decimal) -> Result<(), CardError> {
    if amount <= Decimal::ZERO {
        return Err(CardError::operation(NON_POSITIVE_AMOUNT));
    }
    Ok(())
}

fn validate_new_card(card_number: &str, card_holder: &str, expiry_date: &str) -> Result<(), CardError> {
    if card_number.len() != CARD_NUMBER_LEN || !card_number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CardError::operation("Card number must be exactly 16 digits"));
    }
    if card_holder.is_empty() {
        return Err(CardError::operation("Card holder must not be blank"));
    }
    if !expiry::is_well_formed(expiry_date) {
        return Err(CardError::operation(INVALID_EXPIRY));
    }
    ExpiryDate::parse(expiry_date)?;
    Ok(())
}

fn log_rejection(card_id: u64, operation: &'static str, err: &CardError) {
    match err {
        CardError::Storage(e) => tracing::error!(card_id, operation, error = %e, "Card operation failed"),
        CardError::Encryption(e) => tracing::error!(card_id, operation, error = %e, "Card operation failed"),
        other => tracing::warn!(card_id, operation, reason = %other, "Card operation rejected"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::storage::database::temp_db;
    use crate::storage::{NewUser, UserRepository};

    struct Fixture {
        service: CardService,
        db: Arc<Database>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let (db, dir) = temp_db();
        let db = Arc::new(db);
        let cipher = Arc::new(CardCipher::new("engine-test-secret", "engine-test-salt").unwrap());
        Fixture {
            service: CardService::new(db.clone(), cipher),
            db,
            _dir: dir,
        }
    }

    impl Fixture {
        fn user(&self, username: &str) -> u64 {
            UserRepository::new(&self.db)
                .create(NewUser {
                    username: username.to_string(),
                    email: format!("{username}@example.com"),
                    password_hash: "hash".to_string(),
                    roles: vec![Role::User],
                })
                .unwrap()
                .id
        }

        fn card(&self, owner_id: u64, number: &str, expiry: &str) -> u64 {
            self.service
                .create(
                    owner_id,
                    &CreateCardRequest {
                        card_number: number.to_string(),
                        card_holder: "ALICE SMITH".to_string(),
                        expiry_date: expiry.to_string(),
                    },
                )
                .unwrap()
                .id
        }

        fn funded_card(&self, owner_id: u64, number: &str, balance: Decimal) -> u64 {
            let id = self.card(owner_id, number, "12/99");
            if balance > Decimal::ZERO {
                self.service.top_up(owner_id, id, balance).unwrap();
            }
            id
        }

        fn balance(&self, card_id: u64) -> Decimal {
            self.service.get(card_id, AccessScope::Any).unwrap().balance
        }
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn create_returns_masked_active_card_with_zero_balance() {
        let f = fixture();
        let alice = f.user("alice");
        let card = f
            .service
            .create(
                alice,
                &CreateCardRequest {
                    card_number: "4111111111111234".to_string(),
                    card_holder: "Alice Smith".to_string(),
                    expiry_date: "12/30".to_string(),
                },
            )
            .unwrap();

        assert_eq!(card.card_number, "**** **** **** 1234");
        assert_eq!(card.status, CardStatus::Active);
        assert_eq!(card.balance, Decimal::ZERO);

        let stored = CardRepository::new(&f.db).get(card.id, AccessScope::Any).unwrap();
        assert_ne!(stored.card_number, "4111111111111234");
        assert!(!stored.card_number.contains("1234"));
    }

    #[test]
    fn duplicate_card_number_is_rejected_across_owners() {
        let f = fixture();
        let alice = f.user("alice");
        let bob = f.user("bob");
        f.card(alice, "4111111111111111", "12/30");

        let result = f.service.create(
            bob,
            &CreateCardRequest {
                card_number: "4111111111111111".to_string(),
                card_holder: "BOB".to_string(),
                expiry_date: "01/31".to_string(),
            },
        );
        assert!(matches!(result, Err(CardError::AlreadyExists)));
    }

    #[test]
    fn create_validates_input() {
        let f = fixture();
        let alice = f.user("alice");
        for (number, holder, expiry) in [
            ("411111111111111", "A", "12/30"),
            ("41111111111111112", "A", "12/30"),
            ("4111-1111-1111-1", "A", "12/30"),
            ("4111111111111111", "   ", "12/30"),
            ("4111111111111111", "A", "13/30"),
            ("4111111111111111", "A", "1/30"),
        ] {
            let result = f.service.create(
                alice,
                &CreateCardRequest {
                    card_number: number.to_string(),
                    card_holder: holder.to_string(),
                    expiry_date: expiry.to_string(),
                },
            );
            assert!(
                matches!(result, Err(CardError::Operation(_))),
                "{number}/{holder}/{expiry} should be rejected"
            );
        }
    }

    #[test]
    fn create_for_missing_owner_is_not_found() {
        let f = fixture();
        let result = f.service.create(
            42,
            &CreateCardRequest {
                card_number: "4111111111111111".to_string(),
                card_holder: "GHOST".to_string(),
                expiry_date: "12/30".to_string(),
            },
        );
        assert!(matches!(result, Err(CardError::NotFound(_))));
    }

    #[test]
    fn block_twice_fails_the_second_time() {
        let f = fixture();
        let alice = f.user("alice");
        let id = f.card(alice, "4111111111111111", "12/30");

        let blocked = f.service.block(id, AccessScope::Owner(alice)).unwrap();
        assert_eq!(blocked.status, CardStatus::Blocked);

        let again = f.service.block(id, AccessScope::Owner(alice));
        assert!(matches!(again, Err(CardError::Operation(msg)) if msg == ALREADY_BLOCKED));
    }

    #[test]
    fn activate_twice_fails_the_second_time() {
        let f = fixture();
        let alice = f.user("alice");
        let id = f.card(alice, "4111111111111111", "12/99");
        f.service.block(id, AccessScope::Owner(alice)).unwrap();

        let active = f.service.activate(id, AccessScope::Owner(alice)).unwrap();
        assert_eq!(active.status, CardStatus::Active);

        let again = f.service.activate(id, AccessScope::Owner(alice));
        assert!(matches!(again, Err(CardError::Operation(msg)) if msg == ALREADY_ACTIVE));
    }

    #[test]
    fn admin_activate_follows_the_same_rules() {
        let f = fixture();
        let alice = f.user("alice");
        let id = f.card(alice, "4111111111111111", "12/99");

        let result = f.service.activate(id, AccessScope::Any);
        assert!(matches!(result, Err(CardError::Operation(msg)) if msg == ALREADY_ACTIVE));
    }

    #[test]
    fn activation_respects_expiry_month() {
        let f = fixture();
        let alice = f.user("alice");
        let id = f.card(alice, "4111111111111111", "03/30");
        f.service.block(id, AccessScope::Owner(alice)).unwrap();

        let expired = f.service.activate_on(id, AccessScope::Owner(alice), date(2030, 4, 1));
        assert!(matches!(expired, Err(CardError::Operation(msg)) if msg == EXPIRED));

        let last_day = f
            .service
            .activate_on(id, AccessScope::Owner(alice), date(2030, 3, 31))
            .unwrap();
        assert_eq!(last_day.status, CardStatus::Active);
    }

    #[test]
    fn top_up_requires_active_card() {
        let f = fixture();
        let alice = f.user("alice");
        let id = f.card(alice, "4111111111111111", "12/99");

        let card = f.service.top_up(alice, id, dec("100.50")).unwrap();
        assert_eq!(card.balance, dec("100.50"));

        f.service.block(id, AccessScope::Owner(alice)).unwrap();
        let result = f.service.top_up(alice, id, dec("1"));
        assert!(matches!(result, Err(CardError::NotActive(_))));
        assert_eq!(f.balance(id), dec("100.50"));
    }

    #[test]
    fn non_positive_amounts_fail_regardless_of_state() {
        let f = fixture();
        let alice = f.user("alice");
        let a = f.funded_card(alice, "4111111111111111", dec("10"));
        let b = f.card(alice, "4111111111111112", "12/99");
        f.service.block(b, AccessScope::Owner(alice)).unwrap();

        for amount in [dec("0"), dec("-5"), dec("-0.01")] {
            for card in [a, b, 999] {
                assert!(matches!(
                    f.service.top_up(alice, card, amount),
                    Err(CardError::Operation(msg)) if msg == NON_POSITIVE_AMOUNT
                ));
            }
            assert!(matches!(
                f.service.transfer(alice, a, b, amount),
                Err(CardError::Operation(msg)) if msg == NON_POSITIVE_AMOUNT
            ));
        }
        assert_eq!(f.balance(a), dec("10"));
    }

    #[test]
    fn transfer_conserves_total_balance() {
        let f = fixture();
        let alice = f.user("alice");
        let a = f.funded_card(alice, "4111111111111111", dec("100"));
        let b = f.funded_card(alice, "4111111111111112", dec("5.25"));

        let before = f.balance(a) + f.balance(b);
        f.service.transfer(alice, a, b, dec("30.75")).unwrap();

        assert_eq!(f.balance(a), dec("69.25"));
        assert_eq!(f.balance(b), dec("36.00"));
        assert_eq!(f.balance(a) + f.balance(b), before);
    }

    #[test]
    fn concurrent_transfers_keep_every_update() {
        let f = fixture();
        let alice = f.user("alice");
        let a = f.funded_card(alice, "4111111111111111", dec("100"));
        let b = f.funded_card(alice, "4111111111111112", dec("100"));

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let service = &f.service;
                let (from, to, rounds) = if worker % 2 == 0 { (a, b, 10) } else { (b, a, 5) };
                scope.spawn(move || {
                    for _ in 0..rounds {
                        service.transfer(alice, from, to, Decimal::ONE).unwrap();
                    }
                });
            }
        });

        // 4 workers move 10 each from a to b, 4 move 5 each back.
        assert_eq!(f.balance(a), dec("80"));
        assert_eq!(f.balance(b), dec("120"));
        assert_eq!(f.balance(a) + f.balance(b), dec("200"));
    }

    #[test]
    fn concurrent_top_ups_are_all_applied() {
        let f = fixture();
        let alice = f.user("alice");
        let card = f.card(alice, "4111111111111111", "12/99");

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let service = &f.service;
                scope.spawn(move || {
                    for _ in 0..5 {
                        service.top_up(alice, card, dec("0.10")).unwrap();
                    }
                });
            }
        });

        assert_eq!(f.balance(card), dec("4.00"));
    }

    #[test]
    fn transfer_of_entire_balance_succeeds() {
        let f = fixture();
        let alice = f.user("alice");
        let a = f.funded_card(alice, "4111111111111111", dec("40"));
        let b = f.card(alice, "4111111111111112", "12/99");

        f.service.transfer(alice, a, b, dec("40")).unwrap();
        assert_eq!(f.balance(a), Decimal::ZERO);
        assert_eq!(f.balance(b), dec("40"));
    }

    #[test]
    fn transfer_beyond_balance_is_insufficient_funds() {
        let f = fixture();
        let alice = f.user("alice");
        let a = f.funded_card(alice, "4111111111111111", dec("40"));
        let b = f.card(alice, "4111111111111112", "12/99");

        let result = f.service.transfer(alice, a, b, dec("40.01"));
        assert!(matches!(result, Err(CardError::InsufficientFunds)));
        assert_eq!(f.balance(a), dec("40"));
        assert_eq!(f.balance(b), Decimal::ZERO);
    }

    #[test]
    fn transfer_involving_blocked_card_changes_nothing() {
        let f = fixture();
        let alice = f.user("alice");
        let a = f.funded_card(alice, "4111111111111111", dec("40"));
        let b = f.card(alice, "4111111111111112", "12/99");
        f.service.block(b, AccessScope::Owner(alice)).unwrap();

        assert!(matches!(
            f.service.transfer(alice, a, b, dec("10")),
            Err(CardError::NotActive(_))
        ));
        assert!(matches!(
            f.service.transfer(alice, b, a, dec("10")),
            Err(CardError::NotActive(_))
        ));
        assert_eq!(f.balance(a), dec("40"));
    }

    #[test]
    fn transfer_to_same_card_is_rejected() {
        let f = fixture();
        let alice = f.user("alice");
        let a = f.funded_card(alice, "4111111111111111", dec("40"));

        let result = f.service.transfer(alice, a, a, dec("1"));
        assert!(matches!(result, Err(CardError::Operation(msg)) if msg == SAME_CARD_TRANSFER));
    }

    #[test]
    fn foreign_cards_are_not_found() {
        let f = fixture();
        let alice = f.user("alice");
        let bob = f.user("bob");
        let alice_card = f.funded_card(alice, "4111111111111111", dec("10"));
        let bob_card = f.card(bob, "4111111111111112", "12/99");

        let bob_scope = AccessScope::Owner(bob);
        assert!(matches!(f.service.get(alice_card, bob_scope), Err(CardError::NotFound(_))));
        assert!(matches!(f.service.block(alice_card, bob_scope), Err(CardError::NotFound(_))));
        assert!(matches!(f.service.delete(alice_card, bob_scope), Err(CardError::NotFound(_))));
        assert!(matches!(
            f.service.top_up(bob, alice_card, dec("1")),
            Err(CardError::NotFound(_))
        ));
        assert!(matches!(
            f.service.transfer(bob, alice_card, bob_card, dec("1")),
            Err(CardError::NotFound(_))
        ));

        // Same error text whether the card is foreign or missing.
        let foreign = f.service.get(alice_card, bob_scope).unwrap_err().to_string();
        let missing = f.service.get(9999, bob_scope).unwrap_err().to_string();
        assert_eq!(foreign.replace(&alice_card.to_string(), "N"), missing.replace("9999", "N"));

        assert_eq!(f.balance(alice_card), dec("10"));
    }

    #[test]
    fn listing_pages_owner_cards_only() {
        let f = fixture();
        let alice = f.user("alice");
        let bob = f.user("bob");
        for i in 0..3 {
            f.card(alice, &format!("411111111111110{i}"), "12/99");
        }
        f.card(bob, "5500000000000004", "12/99");

        let page = f
            .service
            .list_for_owner(alice, PageRequest { page: 1, size: 2 })
            .unwrap();
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].card_number, "**** **** **** 1102");

        assert_eq!(f.service.list_all_for_owner(alice).unwrap().len(), 3);
        assert_eq!(f.service.list_all(PageRequest::default()).unwrap().total_elements, 4);
    }

    #[test]
    fn delete_frees_the_card_number() {
        let f = fixture();
        let alice = f.user("alice");
        let id = f.card(alice, "4111111111111111", "12/99");

        f.service.delete(id, AccessScope::Owner(alice)).unwrap();
        assert!(matches!(f.service.get(id, AccessScope::Any), Err(CardError::NotFound(_))));
        f.card(alice, "4111111111111111", "12/99");
    }
}
