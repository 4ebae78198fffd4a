//! # Token Encryption
//!
//! Encrypts the single session token kept in the store.
//!
//! ## Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     SEED AND KEY LIFECYCLE                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   encrypt / decrypt                                                     │
//! │        │                                                                │
//! │        ├── probe entropy ───────────── fails → CryptoUnavailable        │
//! │        │                                                                │
//! │        ├── seed in plain store? ── no → 32 random bytes, store as hex   │
//! │        │                                                                │
//! │        ├── key = PBKDF2(app_secret || seed)      (per call, zeroized)   │
//! │        │                                                                │
//! │        └── AES-256-GCM seal / open, base64url(nonce || ciphertext)      │
//! │                                                                         │
//! │   clear_seed ── delete seed; every older ciphertext becomes unreadable │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Key derivation is deliberately slow, so encryption and decryption run on
//! the blocking pool.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use zeroize::Zeroizing;

use super::encryption::{self, EncryptionKey};
use super::kdf::{self, domain};
use super::random::{self, os_entropy, SharedEntropy};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::storage::kv::KeyValueStore;
use crate::storage::namespace::{namespaced_key, Partition};
use crate::storage::plain_store::{keys, PlainStore};

/// Seed length in bytes.
pub const SEED_SIZE: usize = 32;

/// Logical key of the stored token in the data partition.
pub const TOKEN_KEY: &str = "auth_token";

// ============================================================================
// CIPHER
// ============================================================================

/// Seed management plus token encryption.
///
/// Cloning is cheap and clones share the seed area.
#[derive(Clone)]
pub struct TokenCipher {
    inner: Arc<CipherInner>,
}

struct CipherInner {
    seeds: Arc<PlainStore>,
    entropy: SharedEntropy,
    app_secret: Zeroizing<String>,
    iterations: u32,
    seed_lock: Mutex<()>,
}

impl TokenCipher {
    /// Cipher over `seeds` using the OS random source.
    pub fn new(seeds: Arc<PlainStore>, app_secret: impl Into<String>, iterations: u32) -> Self {
        Self::with_entropy(seeds, app_secret, iterations, os_entropy())
    }

    pub fn with_entropy(
        seeds: Arc<PlainStore>,
        app_secret: impl Into<String>,
        iterations: u32,
        entropy: SharedEntropy,
    ) -> Self {
        Self {
            inner: Arc::new(CipherInner {
                seeds,
                entropy,
                app_secret: Zeroizing::new(app_secret.into()),
                iterations,
                seed_lock: Mutex::new(()),
            }),
        }
    }

    /// Cipher using the configured seed directory (or memory), secret and
    /// iteration count.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let seeds = match &config.seed_dir {
            Some(dir) => PlainStore::in_directory(dir)?,
            None => PlainStore::in_memory(),
        };
        Ok(Self::new(
            Arc::new(seeds),
            config.app_secret.clone(),
            config.kdf_iterations,
        ))
    }

    /// The seed, created and persisted on first use.
    pub fn get_or_create_seed(&self) -> Result<Zeroizing<Vec<u8>>> {
        self.inner.ensure_available()?;
        self.inner.get_or_create_seed()
    }

    /// Whether a seed is currently stored.
    pub fn has_seed(&self) -> Result<bool> {
        self.inner.seeds.exists(keys::TOKEN_SEED)
    }

    /// Encrypt `plaintext` into URL-safe text.
    ///
    /// Every call uses a fresh nonce, so equal inputs give different output.
    pub async fn encrypt(&self, plaintext: &str) -> Result<String> {
        let inner = Arc::clone(&self.inner);
        let plaintext = Zeroizing::new(plaintext.to_string());
        tokio::task::spawn_blocking(move || inner.encrypt_blocking(&plaintext))
            .await
            .map_err(|e| Error::Internal(format!("Encryption task failed: {}", e)))?
    }

    /// Decrypt text produced by [`encrypt`](Self::encrypt).
    ///
    /// A different seed or secret, tampering or malformed input is
    /// [`Error::DecryptionFailed`].
    pub async fn decrypt(&self, text: &str) -> Result<String> {
        let inner = Arc::clone(&self.inner);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || inner.decrypt_blocking(&text))
            .await
            .map_err(|e| Error::Internal(format!("Decryption task failed: {}", e)))?
    }

    /// Delete the seed. The next use creates a new one.
    pub fn clear_seed(&self) -> Result<()> {
        let _guard = self.inner.seed_lock.lock();
        if self.inner.seeds.delete(keys::TOKEN_SEED)? {
            tracing::info!("Token seed cleared");
        }
        Ok(())
    }
}

impl CipherInner {
    fn ensure_available(&self) -> Result<()> {
        random::probe(self.entropy.as_ref())
    }

    fn get_or_create_seed(&self) -> Result<Zeroizing<Vec<u8>>> {
        let _guard = self.seed_lock.lock();

        if let Some(stored) = self.seeds.retrieve(keys::TOKEN_SEED)? {
            match decode_seed(&stored) {
                Some(seed) => return Ok(seed),
                None => tracing::warn!("Stored token seed is malformed, replacing it"),
            }
        }

        let seed = Zeroizing::new(random::random_bytes::<SEED_SIZE>(self.entropy.as_ref())?);
        let encoded = Zeroizing::new(hex::encode(*seed));
        self.seeds.store(keys::TOKEN_SEED, encoded.as_bytes())?;
        tracing::info!("Generated new token seed");
        Ok(Zeroizing::new(seed.to_vec()))
    }

    fn derive_key(&self, app_secret: &str, seed: &[u8]) -> Result<EncryptionKey> {
        kdf::derive_token_key(app_secret.as_bytes(), seed, self.iterations)
    }

    fn encrypt_blocking(&self, plaintext: &str) -> Result<String> {
        self.ensure_available()?;
        let seed = self.get_or_create_seed()?;
        let key = self.derive_key(&self.app_secret, &seed)?;

        let sealed = encryption::seal(
            &key,
            plaintext.as_bytes(),
            domain::TOKEN_AAD,
            self.entropy.as_ref(),
        )?;
        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    fn decrypt_blocking(&self, text: &str) -> Result<String> {
        self.ensure_available()?;
        let sealed = URL_SAFE_NO_PAD
            .decode(text.trim())
            .map_err(|e| Error::DecryptionFailed(format!("Invalid token encoding: {}", e)))?;

        let seed = self.get_or_create_seed()?;
        let key = self.derive_key(&self.app_secret, &seed)?;

        let plaintext = Zeroizing::new(encryption::open(&key, &sealed, domain::TOKEN_AAD)?);
        String::from_utf8(plaintext.to_vec())
            .map_err(|_| Error::DecryptionFailed("Token is not valid UTF-8".into()))
    }
}

fn decode_seed(stored: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
    let seed = Zeroizing::new(hex::decode(stored).ok()?);
    (seed.len() == SEED_SIZE).then_some(seed)
}

// ============================================================================
// VAULT
// ============================================================================

/// Encrypted session token stored under `data_auth_token`.
#[derive(Clone)]
pub struct TokenVault {
    store: KeyValueStore,
    cipher: TokenCipher,
}

impl TokenVault {
    pub fn new(store: KeyValueStore, cipher: TokenCipher) -> Self {
        Self { store, cipher }
    }

    pub fn cipher(&self) -> &TokenCipher {
        &self.cipher
    }

    fn key() -> String {
        namespaced_key(Partition::Data, TOKEN_KEY)
    }

    /// Encrypt and persist `token` (login or refresh).
    pub async fn save_token(&self, token: &str) -> Result<()> {
        let ciphertext = self.cipher.encrypt(token).await?;
        self.store.put(&Self::key(), &ciphertext).await?;
        tracing::debug!("Session token saved");
        Ok(())
    }

    /// The stored token, if one exists and can still be decrypted.
    ///
    /// An undecryptable token is removed and reported as `Ok(None)`.
    pub async fn load_token(&self) -> Result<Option<String>> {
        let key = Self::key();
        let ciphertext: String = match self.store.get(&key).await? {
            Some(c) => c,
            None => return Ok(None),
        };

        match self.cipher.decrypt(&ciphertext).await {
            Ok(token) => Ok(Some(token)),
            Err(e) if e.invalidates_session() => {
                tracing::warn!("Discarding stored session token: {}", e);
                self.store.delete(&key).await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete the token and the seed.
    pub async fn logout(&self) -> Result<()> {
        self.store.delete(&Self::key()).await?;
        self.cipher.clear_seed()?;
        tracing::info!("Session cleared");
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
