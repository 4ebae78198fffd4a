//! # Plain Storage
//!
//! Small unencrypted key area for device-local secrets that must exist
//! before anything can be decrypted, such as the token seed.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PLAIN STORAGE                                    │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  • store(key, value)   - Write bytes (replaces)                         │
//! │  • retrieve(key)       - Read bytes (zeroized on drop)                  │
//! │  • delete(key)         - Remove                                         │
//! │  • exists(key)         - Check presence                                 │
//! │                                                                         │
//! │  Backends:                                                              │
//! │                                                                         │
//! │  ┌───────────────────┐   ┌─────────────────────────────────────────┐    │
//! │  │     Memory        │   │  Directory                              │    │
//! │  │  process lifetime │   │  one file per key, written via          │    │
//! │  │                   │   │  <file>.tmp + rename                    │    │
//! │  └───────────────────┘   └─────────────────────────────────────────┘    │
//! │                                                                         │
//! │  Kept apart from the SQLite store: the token key is derived from what   │
//! │  lives here, so it cannot itself be stored encrypted.                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Key names for plain storage
pub mod keys {
    /// Hex-encoded random seed for token key derivation
    pub const TOKEN_SEED: &str = "clientstore.token.seed";
}

enum Backend {
    Memory(RwLock<HashMap<String, Vec<u8>>>),
    Directory(PathBuf),
}

/// Unencrypted key-value area.
pub struct PlainStore {
    backend: Backend,
}

impl PlainStore {
    /// Store that forgets everything when dropped.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(RwLock::new(HashMap::new())),
        }
    }

    /// Store backed by files in `dir`, created if missing.
    pub fn in_directory(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            Error::SeedStore(format!("Failed to create {}: {}", dir.display(), e))
        })?;
        Ok(Self {
            backend: Backend::Directory(dir),
        })
    }

    /// Write `value` under `key`, replacing any previous value.
    pub fn store(&self, key: &str, value: &[u8]) -> Result<()> {
        match &self.backend {
            Backend::Memory(map) => {
                map.write().insert(key.to_string(), value.to_vec());
                Ok(())
            }
            Backend::Directory(dir) => write_atomic(&file_path(dir, key), value),
        }
    }

    /// Read the value under `key`.
    pub fn retrieve(&self, key: &str) -> Result<Option<Zeroizing<Vec<u8>>>> {
        match &self.backend {
            Backend::Memory(map) => Ok(map.read().get(key).cloned().map(Zeroizing::new)),
            Backend::Directory(dir) => match fs::read(file_path(dir, key)) {
                Ok(data) => Ok(Some(Zeroizing::new(data))),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            },
        }
    }

    /// Remove `key`. Returns whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool> {
        match &self.backend {
            Backend::Memory(map) => Ok(map.write().remove(key).is_some()),
            Backend::Directory(dir) => match fs::remove_file(file_path(dir, key)) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e.into()),
            },
        }
    }

    /// Check if a key exists
    pub fn exists(&self, key: &str) -> Result<bool> {
        match &self.backend {
            Backend::Memory(map) => Ok(map.read().contains_key(key)),
            Backend::Directory(dir) => Ok(file_path(dir, key).is_file()),
        }
    }
}

impl Default for PlainStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// File for `key`; anything outside `[A-Za-z0-9._-]` becomes `_`, and the
/// names `.`, `..` and the empty name are never produced.
fn file_path(dir: &Path, key: &str) -> PathBuf {
    let mut name: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.chars().all(|c| c == '.') {
        name = "_".repeat(name.len().max(1));
    }
    dir.join(name)
}

/// Sibling temp file for `path`. `~` never survives sanitizing, so the temp
/// name cannot collide with another key's file.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push("~tmp");
    path.with_file_name(name)
}

fn write_atomic(path: &Path, value: &[u8]) -> Result<()> {
    let tmp = temp_path(path);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(value)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
