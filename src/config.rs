//! Store configuration.
//!
//! Built from defaults, explicitly, or from environment variables.

use std::env;
use std::path::PathBuf;

use crate::crypto::kdf::DEFAULT_ITERATIONS;
use crate::error::{Error, Result};

/// Object store used when none is configured.
pub const DEFAULT_OBJECT_STORE: &str = "keyval";

/// Application-wide constant mixed into token key derivation.
///
/// Deployments should override it; the seed is what makes keys per-device.
pub const DEFAULT_APP_SECRET: &str = "clientstore-default-app-secret";

/// Configuration for the persistence core.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database file. `None` opens an in-memory database that lives as
    /// long as its connection.
    pub database_path: Option<PathBuf>,
    /// Object store holding every partition.
    pub object_store: String,
    /// Additional object stores to create during schema upgrade.
    pub extra_object_stores: Vec<String>,
    /// Directory for the unencrypted seed area. `None` keeps the seed in
    /// memory only.
    pub seed_dir: Option<PathBuf>,
    /// Application constant for key derivation.
    pub app_secret: String,
    /// PBKDF2 iteration count.
    pub kdf_iterations: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            object_store: DEFAULT_OBJECT_STORE.to_string(),
            extra_object_stores: Vec::new(),
            seed_dir: None,
            app_secret: DEFAULT_APP_SECRET.to_string(),
            kdf_iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `CLIENTSTORE_DB_PATH` | `database_path` |
    /// | `CLIENTSTORE_OBJECT_STORE` | `object_store` |
    /// | `CLIENTSTORE_SEED_DIR` | `seed_dir` |
    /// | `CLIENTSTORE_APP_SECRET` | `app_secret` |
    /// | `CLIENTSTORE_KDF_ITERATIONS` | `kdf_iterations` |
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let kdf_iterations = match env::var("CLIENTSTORE_KDF_ITERATIONS") {
            Ok(raw) => raw.parse::<u32>().map_err(|e| {
                Error::InvalidConfig(format!("CLIENTSTORE_KDF_ITERATIONS '{}': {}", raw, e))
            })?,
            Err(_) => defaults.kdf_iterations,
        };

        let config = Self {
            database_path: env::var("CLIENTSTORE_DB_PATH").ok().map(PathBuf::from),
            object_store: env::var("CLIENTSTORE_OBJECT_STORE").unwrap_or(defaults.object_store),
            extra_object_stores: defaults.extra_object_stores,
            seed_dir: env::var("CLIENTSTORE_SEED_DIR").ok().map(PathBuf::from),
            app_secret: env::var("CLIENTSTORE_APP_SECRET").unwrap_or(defaults.app_secret),
            kdf_iterations,
        };
        config.validate()?;
        Ok(config)
    }

    /// In-memory configuration for tests and previews.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Builder: database file.
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Builder: seed directory.
    pub fn with_seed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.seed_dir = Some(dir.into());
        self
    }

    /// Builder: app secret.
    pub fn with_app_secret(mut self, secret: impl Into<String>) -> Self {
        self.app_secret = secret.into();
        self
    }

    /// Builder: PBKDF2 iterations.
    pub fn with_kdf_iterations(mut self, iterations: u32) -> Self {
        self.kdf_iterations = iterations;
        self
    }

    /// Every object store the schema upgrade must create.
    pub fn object_stores(&self) -> Vec<String> {
        let mut stores = vec![self.object_store.clone()];
        for extra in &self.extra_object_stores {
            if !stores.contains(extra) {
                stores.push(extra.clone());
            }
        }
        stores
    }

    /// Reject configurations that cannot work.
    pub fn validate(&self) -> Result<()> {
        for name in self.object_stores() {
            if !is_valid_store_name(&name) {
                return Err(Error::InvalidConfig(format!(
                    "object store name '{}' must be non-empty ASCII alphanumerics or '_'",
                    name
                )));
            }
        }
        if self.app_secret.is_empty() {
            return Err(Error::InvalidConfig("app secret must not be empty".into()));
        }
        if self.kdf_iterations == 0 {
            return Err(Error::InvalidConfig("kdf iterations must be at least 1".into()));
        }
        Ok(())
    }
}

/// Object store names become SQLite table names, so keep them plain.
pub(crate) fn is_valid_store_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
