// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Username/password login issuing HS256 session tokens.
//!
//! ## Auth Flow
//!
//! 1. Client posts credentials to `/api/auth/login`
//! 2. Server verifies the bcrypt hash and returns a signed token
//!    (`sub` = username, `roles`, `iat`, `exp`)
//! 3. Client sends `Authorization: Bearer <token>`
//! 4. The [`Auth`] extractor:
//!    - Verifies signature and expiry (no leeway)
//!    - Loads the user named by `sub`
//!    - Yields an [`AuthenticatedUser`] with the stored roles
//!
//! ## Security
//!
//! - All card, user and admin endpoints require authentication
//! - Admin endpoints additionally require `ROLE_ADMIN` ([`AdminOnly`])
//! - Unknown usernames and wrong passwords produce the same error
//! - Tokens cannot be revoked; they stop working at `exp`

pub mod claims;
pub mod error;
pub mod extractor;
pub mod password;
pub mod roles;
pub mod service;
pub mod tokens;

pub use claims::{AuthenticatedUser, TokenClaims};
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth};
pub use roles::Role;
pub use service::{AuthService, AuthServiceError};
pub use tokens::{TokenError, TokenService};
