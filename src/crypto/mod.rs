//! # Cryptography Module
//!
//! At-rest protection for the session token.
//!
//! ## Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    TOKEN PROTECTION                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────────┐    │
//! │  │   random     │   │     kdf      │   │       encryption         │    │
//! │  │              │   │              │   │                          │    │
//! │  │ entropy      │   │ PBKDF2-HMAC- │   │ AES-256-GCM              │    │
//! │  │ probe, seeds │──►│ SHA256 over  │──►│ nonce || ct || tag       │    │
//! │  │ and nonces   │   │ secret||seed │   │                          │    │
//! │  └──────────────┘   └──────────────┘   └──────────────────────────┘    │
//! │                              │                                          │
//! │                              ▼                                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │  token: TokenCipher (seed lifecycle, encrypt/decrypt)           │    │
//! │  │         TokenVault  (save/load/logout of the stored token)      │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose |
//! |-----------|---------|
//! | PBKDF2-HMAC-SHA256 | Token key from app secret and device seed |
//! | AES-256-GCM | Token encryption with integrity |
//! | OS CSPRNG | Seeds and nonces |
//!
//! Derived keys are zeroized when dropped and never leave this module.

pub mod encryption;
pub mod kdf;
pub mod random;
pub mod token;

pub use encryption::{EncryptionKey, Nonce, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use kdf::DEFAULT_ITERATIONS;
pub use random::{os_entropy, EntropySource, OsEntropy, SharedEntropy};
pub use token::{TokenCipher, TokenVault, SEED_SIZE, TOKEN_KEY};
