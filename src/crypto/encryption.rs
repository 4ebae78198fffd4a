//! # Encryption Module
//!
//! AES-256-GCM for the stored session token.
//!
//! ## Sealed Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SEALED TOKEN                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   ┌──────────────┬──────────────────────────────┬──────────────────┐   │
//! │   │ nonce (12 B) │ ciphertext (len(plaintext))  │ auth tag (16 B)  │   │
//! │   └──────────────┴──────────────────────────────┴──────────────────┘   │
//! │                                                                         │
//! │   AES-256-GCM(                                                          │
//! │     key   = derived token key,                                          │
//! │     nonce = 12 random bytes, fresh per call,                            │
//! │     aad   = "clientstore-auth-token-v1"                                 │
//! │   )                                                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Properties
//!
//! | Property | Guarantee |
//! |----------|-----------|
//! | Confidentiality | Only a holder of the derived key can read the token |
//! | Integrity | Any modification is detected |
//! | Binding | AAD ties the ciphertext to its purpose |

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce as AesNonce,
};
use zeroize::ZeroizeOnDrop;

use super::random::{self, EntropySource};
use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of the encryption key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// A nonce (number used once) for AES-GCM encryption
///
/// **Never reuse a nonce with the same key.** Random 96-bit nonces are safe
/// for up to 2^32 messages per key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a random nonce from `source`
    pub fn random(source: &dyn EntropySource) -> Result<Self> {
        Ok(Self(random::random_bytes(source)?))
    }

    /// Create from existing bytes
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// An AES-256-GCM key. Zeroized when dropped; raw bytes stay in the crate.
#[derive(ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    pub(crate) fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    #[cfg(test)]
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

/// Encrypt with a fresh random nonce.
///
/// Returns `(nonce, ciphertext_with_tag)`.
pub fn encrypt(
    key: &EncryptionKey,
    plaintext: &[u8],
    aad: &[u8],
    source: &dyn EntropySource,
) -> Result<(Nonce, Vec<u8>)> {
    let nonce = Nonce::random(source)?;
    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?;

    let payload = Payload {
        msg: plaintext,
        aad,
    };

    let ciphertext = cipher
        .encrypt(AesNonce::from_slice(&nonce.0), payload)
        .map_err(|e| Error::EncryptionFailed(format!("Encryption failed: {}", e)))?;

    Ok((nonce, ciphertext))
}

/// Decrypt and authenticate.
///
/// Returns `DecryptionFailed` if the ciphertext, nonce, key or AAD differ
/// from what was used to encrypt.
pub fn decrypt(
    key: &EncryptionKey,
    nonce: &Nonce,
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|e| Error::DecryptionFailed(format!("Invalid key: {}", e)))?;

    let payload = Payload {
        msg: ciphertext,
        aad,
    };

    cipher
        .decrypt(AesNonce::from_slice(&nonce.0), payload)
        .map_err(|_| Error::DecryptionFailed("authentication tag mismatch".into()))
}

/// Encrypt and prepend the nonce: `nonce || ciphertext_with_tag`.
pub fn seal(
    key: &EncryptionKey,
    plaintext: &[u8],
    aad: &[u8],
    source: &dyn EntropySource,
) -> Result<Vec<u8>> {
    let (nonce, ciphertext) = encrypt(key, plaintext, aad, source)?;
    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(nonce.as_bytes());
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Inverse of [`seal`].
pub fn open(key: &EncryptionKey, sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(Error::DecryptionFailed(format!(
            "sealed data is {} bytes, need at least {}",
            sealed.len(),
            NONCE_SIZE + TAG_SIZE
        )));
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    nonce_bytes.copy_from_slice(nonce);
    decrypt(key, &Nonce::from_bytes(nonce_bytes), ciphertext, aad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::random::{FailingEntropy, OsEntropy};

    fn key(byte: u8) -> EncryptionKey {
        EncryptionKey::from_bytes([byte; KEY_SIZE])
    }

    #[test]
    fn test_encrypt_decrypt_basic() {
        let key = key(42);
        let (nonce, ciphertext) = encrypt(&key, b"session-token", b"aad", &OsEntropy).unwrap();

        assert_eq!(ciphertext.len(), b"session-token".len() + TAG_SIZE);
        let plaintext = decrypt(&key, &nonce, &ciphertext, b"aad").unwrap();
        assert_eq!(plaintext, b"session-token");
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let key = key(1);
        let (nonce, ciphertext) = encrypt(&key, b"", b"", &OsEntropy).unwrap();
        assert_eq!(ciphertext.len(), TAG_SIZE);
        assert!(decrypt(&key, &nonce, &ciphertext, b"").unwrap().is_empty());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = key(7);
        let (nonce, mut ciphertext) = encrypt(&key, b"secret", b"aad", &OsEntropy).unwrap();
        ciphertext[0] ^= 0x01;

        let result = decrypt(&key, &nonce, &ciphertext, b"aad");
        assert!(matches!(result, Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn test_wrong_aad_fails() {
        let key = key(7);
        let (nonce, ciphertext) = encrypt(&key, b"secret", b"aad-1", &OsEntropy).unwrap();
        assert!(decrypt(&key, &nonce, &ciphertext, b"aad-2").is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = seal(&key(1), b"secret", b"aad", &OsEntropy).unwrap();
        assert!(matches!(open(&key(2), &sealed, b"aad"), Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn test_different_nonces_produce_different_ciphertext() {
        let key = key(3);
        let a = seal(&key, b"same", b"", &OsEntropy).unwrap();
        let b = seal(&key, b"same", b"", &OsEntropy).unwrap();
        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_seal_open_round_trip() {
        let key = key(9);
        let sealed = seal(&key, "Zürich 東京".as_bytes(), b"aad", &OsEntropy).unwrap();
        assert_eq!(open(&key, &sealed, b"aad").unwrap(), "Zürich 東京".as_bytes());
    }

    #[test]
    fn test_open_rejects_short_input() {
        let result = open(&key(0), &[0u8; NONCE_SIZE + TAG_SIZE - 1], b"");
        assert!(matches!(result, Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn test_encrypt_without_entropy_fails() {
        let result = encrypt(&key(0), b"x", b"", &FailingEntropy);
        assert!(matches!(result, Err(Error::CryptoUnavailable(_))));
    }

    #[test]
    fn test_key_debug_is_redacted() {
        assert_eq!(format!("{:?}", key(5)), "EncryptionKey(<redacted>)");
    }
}
