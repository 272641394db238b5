// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token issuing and verification (HS256).
//!
//! Tokens are stateless: there is no refresh and no revocation, expiry is the
//! only way a token stops working. Verification uses zero leeway and treats
//! `now >= exp` as expired.

use std::fmt;

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::{AuthError, Role, TokenClaims};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("JWT secret is empty")]
    EmptySecret,

    #[error("JWT secret is not base64; set JWT_ALLOW_INSECURE_SECRET=true to use it as raw text")]
    InsecureSecret,

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("token expiry is out of range")]
    ExpiryOutOfRange,
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Build the service from the configured secret.
    ///
    /// Base64 secrets are decoded and used as key bytes. Anything else is
    /// used verbatim only when `allow_insecure` is set.
    pub fn new(secret: &str, ttl: Duration, allow_insecure: bool) -> Result<Self, TokenError> {
        let key = signing_key_bytes(secret, allow_insecure)?;
        Ok(Self {
            encoding: EncodingKey::from_secret(&key),
            decoding: DecodingKey::from_secret(&key),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject` valid for the configured TTL.
    pub fn issue(&self, subject: &str, roles: &[Role]) -> Result<String, TokenError> {
        self.issue_at(subject, roles, Utc::now())
    }

    pub(crate) fn issue_at(
        &self,
        subject: &str,
        roles: &[Role],
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or(TokenError::ExpiryOutOfRange)?;
        let claims = TokenClaims {
            sub: subject.to_string(),
            roles: roles.to_vec(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature and expiry, returning the claims.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<TokenClaims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            })?
            .claims;

        if Utc::now().timestamp() >= claims.exp {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }

    /// True only if the token verifies, has not expired and names `expected_subject`.
    pub fn validate(&self, token: &str, expected_subject: &str) -> bool {
        match self.decode(token) {
            Ok(claims) => claims.sub == expected_subject,
            Err(err) => {
                tracing::debug!(error = %err, "Token rejected");
                false
            }
        }
    }
}

fn signing_key_bytes(secret: &str, allow_insecure: bool) -> Result<Vec<u8>, TokenError> {
    let cleaned: String = secret.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(TokenError::EmptySecret);
    }

    match Base64::decode_vec(&cleaned) {
        Ok(bytes) if !bytes.is_empty() => Ok(bytes),
        _ if allow_insecure => {
            tracing::warn!("JWT secret is not base64; using raw secret bytes as signing key");
            Ok(secret.as_bytes().to_vec())
        }
        _ => Err(TokenError::InsecureSecret),
    }
}
