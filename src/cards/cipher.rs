// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Deterministic AES-256-GCM encryption for card numbers.
//!
//! The same card number always encrypts to the same ciphertext under a given
//! key, which lets the card store enforce number uniqueness by comparing
//! ciphertexts. The nonce is synthetic: the first 12 bytes of
//! `HMAC-SHA256(nonce_key, plaintext)`. Output is base64 of
//! `nonce || ciphertext || tag`.
//!
//! Deterministic encryption leaks equality: anyone holding the table can tell
//! two rows carry the same number without decrypting either.
//!
//! Both keys come from `HMAC-SHA256(salt, label || secret)` with distinct
//! labels, so the encryption key and nonce key are independent.

use std::fmt;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Nonce size for AES-256-GCM (12 bytes).
const NONCE_SIZE: usize = 12;
/// AES-256 key size (32 bytes).
const KEY_SIZE: usize = 32;
/// GCM tag size (16 bytes).
const TAG_SIZE: usize = 16;

const ENCRYPTION_LABEL: &[u8] = b"card-number/enc";
const NONCE_LABEL: &[u8] = b"card-number/siv";

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("key derivation failed")]
    KeyDerivation,

    #[error("encryption failed")]
    Encrypt,

    #[error("malformed ciphertext: {0}")]
    Malformed(String),

    #[error("decryption failed")]
    Decrypt,
}

pub struct CardCipher {
    cipher: Aes256Gcm,
    nonce_key: [u8; KEY_SIZE],
}

impl fmt::Debug for CardCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardCipher").finish_non_exhaustive()
    }
}

impl CardCipher {
    /// Build a cipher from the configured secret and salt.
    pub fn new(secret: &str, salt: &str) -> Result<Self, CipherError> {
        let enc_key = derive_key(salt.as_bytes(), ENCRYPTION_LABEL, secret.as_bytes())?;
        let nonce_key = derive_key(salt.as_bytes(), NONCE_LABEL, secret.as_bytes())?;
        let cipher = Aes256Gcm::new_from_slice(&enc_key).map_err(|_| CipherError::KeyDerivation)?;
        Ok(Self { cipher, nonce_key })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let nonce_bytes = self.synthetic_nonce(plaintext.as_bytes())?;
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CipherError::Encrypt)?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);
        Ok(Base64::encode_string(&combined))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CipherError> {
        let combined =
            Base64::decode_vec(encoded).map_err(|e| CipherError::Malformed(e.to_string()))?;
        if combined.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CipherError::Malformed("ciphertext too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CipherError::Decrypt)?;

        // A valid tag under a nonce we would never have chosen means the
        // ciphertext was not produced by `encrypt`.
        if self.synthetic_nonce(&plaintext)?.as_slice() != nonce_bytes {
            return Err(CipherError::Decrypt);
        }

        String::from_utf8(plaintext).map_err(|_| CipherError::Decrypt)
    }

    fn synthetic_nonce(&self, plaintext: &[u8]) -> Result<[u8; NONCE_SIZE], CipherError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.nonce_key)
            .map_err(|_| CipherError::KeyDerivation)?;
        mac.update(plaintext);
        let digest = mac.finalize().into_bytes();
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&digest[..NONCE_SIZE]);
        Ok(nonce)
    }
}

fn derive_key(salt: &[u8], label: &[u8], secret: &[u8]) -> Result<[u8; KEY_SIZE], CipherError> {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(salt).map_err(|_| CipherError::KeyDerivation)?;
    mac.update(label);
    mac.update(secret);
    let digest = mac.finalize().into_bytes();
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&digest);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> CardCipher {
        CardCipher::new("test-encryption-secret", "test-salt").unwrap()
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let c = cipher();
        let encrypted = c.encrypt("4111111111111111").unwrap();
        assert_ne!(encrypted, "4111111111111111");
        assert_eq!(c.decrypt(&encrypted).unwrap(), "4111111111111111");
    }

    #[test]
    fn encryption_is_deterministic() {
        let c = cipher();
        let first = c.encrypt("4111111111111111").unwrap();
        let second = c.encrypt("4111111111111111").unwrap();
        assert_eq!(first, second);

        let other = c.encrypt("4111111111111112").unwrap();
        assert_ne!(first, other);
    }

    #[test]
    fn determinism_holds_across_instances_with_same_keys() {
        let a = cipher().encrypt("5500000000000004").unwrap();
        let b = cipher().encrypt("5500000000000004").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn wrong_key_fails() {
        let encrypted = cipher().encrypt("4111111111111111").unwrap();
        let other = CardCipher::new("other-secret", "test-salt").unwrap();
        assert!(matches!(other.decrypt(&encrypted), Err(CipherError::Decrypt)));

        let other_salt = CardCipher::new("test-encryption-secret", "other-salt").unwrap();
        assert!(other_salt.decrypt(&encrypted).is_err());
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let c = cipher();
        let encrypted = c.encrypt("4111111111111111").unwrap();
        let mut bytes = Base64::decode_vec(&encrypted).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = Base64::encode_string(&bytes);
        assert!(matches!(c.decrypt(&tampered), Err(CipherError::Decrypt)));
    }

    #[test]
    fn malformed_input_is_rejected() {
        let c = cipher();
        assert!(matches!(c.decrypt("not base64!"), Err(CipherError::Malformed(_))));
        assert!(matches!(c.decrypt("AAAA"), Err(CipherError::Malformed(_))));
    }

    #[test]
    fn empty_plaintext() {
        let c = cipher();
        let encrypted = c.encrypt("").unwrap();
        assert_eq!(c.decrypt(&encrypted).unwrap(), "");
    }

    #[test]
    fn debug_does_not_leak_keys() {
        assert_eq!(format!("{:?}", cipher()), "CardCipher { .. }");
    }
}
