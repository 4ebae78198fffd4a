//! # Error Handling
//!
//! Error types for the persistence core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Connection Errors                                                 │
//! │  │   ├── ConnectionFailed      - Store could not be opened/upgraded    │
//! │  │   └── ConnectionClosed      - Cached handle was invalidated         │
//! │  │                                                                      │
//! │  ├── Transaction Errors                                                │
//! │  │   └── Transaction           - A get/put/delete/scan failed          │
//! │  │                                                                      │
//! │  ├── Data Errors                                                       │
//! │  │   ├── Serialization         - Value could not be (de)serialized     │
//! │  │   └── DraftCorrupted        - A single draft failed to decode       │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── CryptoUnavailable     - No usable entropy source              │
//! │  │   ├── KeyDerivationFailed   - PBKDF2 could not produce a key        │
//! │  │   ├── EncryptionFailed      - AES-GCM encryption failed             │
//! │  │   ├── DecryptionFailed      - Wrong key, tampered or malformed      │
//! │  │   └── SeedStore             - Seed area read/write failed           │
//! │  │                                                                      │
//! │  └── Internal Errors                                                   │
//! │      ├── InvalidConfig         - Configuration rejected                │
//! │      └── Internal              - Should not happen                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A missing record is never an error: lookups return `Ok(None)`.

use std::fmt;

use thiserror::Error;

/// Result type alias for persistence operations
pub type Result<T> = std::result::Result<T, Error>;

/// The storage operation that a [`Error::Transaction`] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Read a single record
    Get,
    /// Write (replace) a single record
    Put,
    /// Remove a single record
    Delete,
    /// Enumerate records
    Scan,
    /// Remove every record matching a prefix
    Clear,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Get => "get",
            Operation::Put => "put",
            Operation::Delete => "delete",
            Operation::Scan => "scan",
            Operation::Clear => "clear",
        };
        f.write_str(name)
    }
}

/// Main error type
///
/// Errors are grouped by layer so callers can decide between retrying,
/// falling back (e.g. re-authenticating) or surfacing the failure.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Connection Errors (100-199)
    // ========================================================================

    /// The embedded store failed to open (locked, denied, disk full, ...)
    #[error("Failed to open store: {0}")]
    ConnectionFailed(String),

    /// The handle was closed or invalidated while in use
    #[error("Store connection is closed.")]
    ConnectionClosed,

    // ========================================================================
    // Transaction Errors (200-299)
    // ========================================================================

    /// A single storage operation failed
    #[error("Transaction failed during {operation} of '{key}': {message}")]
    Transaction {
        /// Which operation was running
        operation: Operation,
        /// The physical key (or prefix) involved
        key: String,
        /// Lower-level cause
        message: String,
    },

    // ========================================================================
    // Data Errors (300-399)
    // ========================================================================

    /// Serialization or strict deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A targeted draft read found undecodable data
    #[error("Draft '{id}' is corrupted: {reason}")]
    DraftCorrupted {
        /// Draft identifier (without namespace prefix)
        id: String,
        /// Why decoding failed
        reason: String,
    },

    // ========================================================================
    // Crypto Errors (400-499)
    // ========================================================================

    /// No cryptographic primitives available in this environment
    #[error("Cryptography is unavailable: {0}")]
    CryptoUnavailable(String),

    /// Key derivation failed
    #[error("Failed to derive key: {0}")]
    KeyDerivationFailed(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed (wrong key, tampered or malformed ciphertext)
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// The unencrypted seed area could not be read or written
    #[error("Seed storage error: {0}")]
    SeedStore(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Configuration was rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Numeric error code, grouped by category:
    /// - 100-199: Connection
    /// - 200-299: Transaction
    /// - 300-399: Data
    /// - 400-499: Crypto
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            Error::ConnectionFailed(_) => 100,
            Error::ConnectionClosed => 101,

            Error::Transaction { .. } => 200,

            Error::Serialization(_) => 300,
            Error::DraftCorrupted { .. } => 301,

            Error::CryptoUnavailable(_) => 400,
            Error::KeyDerivationFailed(_) => 401,
            Error::EncryptionFailed(_) => 402,
            Error::DecryptionFailed(_) => 403,
            Error::SeedStore(_) => 404,

            Error::InvalidConfig(_) => 900,
            Error::Internal(_) => 901,
        }
    }

    /// Check if retrying the same call can succeed
    ///
    /// Nothing is retried automatically; this only informs the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ConnectionFailed(_) | Error::ConnectionClosed | Error::Transaction { .. }
        )
    }

    /// Check if this error means a stored session can no longer be used
    ///
    /// Callers treat these as "no valid session" and re-authenticate.
    pub fn invalidates_session(&self) -> bool {
        matches!(self, Error::DecryptionFailed(_) | Error::KeyDerivationFailed(_))
    }

    pub(crate) fn transaction(operation: Operation, key: &str, err: impl fmt::Display) -> Self {
        Error::Transaction {
            operation,
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::SeedStore(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::ConnectionFailed("locked".into()).code(), 100);
        assert_eq!(Error::transaction(Operation::Put, "k", "boom").code(), 200);
        assert_eq!(Error::Serialization("bad".into()).code(), 300);
        assert_eq!(Error::CryptoUnavailable("no rng".into()).code(), 400);
        assert_eq!(Error::Internal("test".into()).code(), 901);
    }

    #[test]
    fn test_transaction_error_names_operation_and_key() {
        let err = Error::transaction(Operation::Delete, "drafts_d1", "disk I/O error");
        let msg = err.to_string();
        assert!(msg.contains("delete"));
        assert!(msg.contains("drafts_d1"));
        assert!(msg.contains("disk I/O error"));
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::ConnectionClosed.is_recoverable());
        assert!(Error::transaction(Operation::Get, "k", "busy").is_recoverable());
        assert!(!Error::DecryptionFailed("tag".into()).is_recoverable());
        assert!(!Error::Serialization("x".into()).is_recoverable());
    }

    #[test]
    fn test_session_invalidating_errors() {
        assert!(Error::DecryptionFailed("tag mismatch".into()).invalidates_session());
        assert!(!Error::ConnectionClosed.invalidates_session());
    }
}
