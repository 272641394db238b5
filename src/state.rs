// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AuthService, TokenService};
use crate::cards::{CardCipher, CardService};
use crate::storage::Database;

/// Dependencies shared by every handler, assembled once at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub tokens: Arc<TokenService>,
    pub auth: AuthService,
    pub cards: CardService,
}

impl AppState {
    pub fn new(db: Database, tokens: TokenService, cipher: CardCipher) -> Self {
        let db = Arc::new(db);
        let tokens = Arc::new(tokens);
        Self {
            auth: AuthService::new(db.clone(), tokens.clone()),
            cards: CardService::new(db.clone(), Arc::new(cipher)),
            db,
            tokens,
        }
    }
}

/// State over a throwaway database. Keep the directory alive for the test.
#[cfg(test)]
pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
    let (db, dir) = crate::storage::database::temp_db();
    let tokens = TokenService::new("dGVzdC1zZWNyZXQta2V5", chrono::Duration::minutes(60), false)
        .expect("test token service");
    let cipher = CardCipher::new("test-secret", "test-salt").expect("test cipher");
    (AppState::new(db, tokens, cipher), dir)
}
