// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Cards Module
//!
//! Card lifecycle and fund movements.
//!
//! ## Components
//!
//! - [`cipher`]: deterministic encryption of card numbers at rest
//! - [`masking`]: the only representation of a number that leaves the server
//! - [`expiry`]: `MM/YY` parsing and the expiry predicate
//! - [`service`]: block, activate, top-up and transfer rules
//! - [`error`]: card error taxonomy

pub mod cipher;
pub mod error;
pub mod expiry;
pub mod masking;
pub mod service;

pub use cipher::{CardCipher, CipherError};
pub use error::CardError;
pub use masking::mask;
pub use service::CardService;
