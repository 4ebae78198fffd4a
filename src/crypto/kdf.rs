//! # Key Derivation
//!
//! Derives the token encryption key from the application secret and the
//! per-device seed.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    TOKEN KEY DERIVATION                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   app secret (constant)        seed (32 random bytes, per device)       │
//! │          │                                  │                           │
//! │          └──────────────┬───────────────────┘                           │
//! │                         ▼                                               │
//! │   PBKDF2-HMAC-SHA256(                                                   │
//! │     password   = app_secret || seed,                                    │
//! │     salt       = "clientstore-token-key-v1",                            │
//! │     iterations = 100 000 (configurable),                                │
//! │     length     = 32 bytes                                               │
//! │   )                                                                     │
//! │                         │                                               │
//! │                         ▼                                               │
//! │                 AES-256-GCM key (never persisted)                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The seed carries the entropy, so the salt is a fixed domain string.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::encryption::{EncryptionKey, KEY_SIZE};
use crate::error::{Error, Result};

/// PBKDF2 iteration count used unless configured otherwise.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Domain separation strings
pub mod domain {
    /// PBKDF2 salt for the token key
    pub const TOKEN_KEY_SALT: &[u8] = b"clientstore-token-key-v1";

    /// AES-GCM associated data for the stored token
    pub const TOKEN_AAD: &[u8] = b"clientstore-auth-token-v1";
}

/// Derive the token key from `app_secret` and `seed`.
pub fn derive_token_key(app_secret: &[u8], seed: &[u8], iterations: u32) -> Result<EncryptionKey> {
    if iterations == 0 {
        return Err(Error::KeyDerivationFailed("iteration count must be positive".into()));
    }
    if seed.is_empty() {
        return Err(Error::KeyDerivationFailed("seed is empty".into()));
    }

    let mut password = Zeroizing::new(Vec::with_capacity(app_secret.len() + seed.len()));
    password.extend_from_slice(app_secret);
    password.extend_from_slice(seed);

    let key = pbkdf2_sha256(&password, domain::TOKEN_KEY_SALT, iterations);
    Ok(EncryptionKey::from_bytes(*key))
}

fn pbkdf2_sha256(password: &[u8], salt: &[u8], iterations: u32) -> Zeroizing<[u8; KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key[..]);
    key
}
