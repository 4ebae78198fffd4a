//! # Clientstore Core
//!
//! Durable local persistence for a data-entry client: generic key-value
//! data, cached reference datasets, multi-step form drafts and an encrypted
//! session token, all kept on the device across restarts.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       CLIENTSTORE MODULES                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────────┐                                                   │
//! │  │    AutoSave      │  in-memory form state, deferred coalesced flushes │
//! │  └────────┬─────────┘                                                   │
//! │           ▼                                                             │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌──────────────┐   │
//! │  │   Drafts    │  │    Cache    │  │    Data     │  │    Crypto    │   │
//! │  │             │  │             │  │             │  │              │   │
//! │  │ - createdAt │  │ - no TTL    │  │ - any JSON  │  │ - PBKDF2     │   │
//! │  │ - listing   │  │ - clear     │  │ - token ◄───┼──┤ - AES-GCM    │   │
//! │  └──────┬──────┘  └──────┬──────┘  └──────┬──────┘  │ - seed area  │   │
//! │         └────────────────┴────────────────┘         └──────────────┘   │
//! │                          │                                              │
//! │  ┌───────────────────────▼─────────────────────────────────────────┐    │
//! │  │  Storage: namespacing → codec → key-value store → connection    │    │
//! │  │           (one SQLite file, one shared handle)                  │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`config`] - Store configuration (defaults and environment)
//! - [`storage`] - Connection, namespacing, codec and partitions
//! - [`autosave`] - Auto-save coordinator for form drafts
//! - [`crypto`] - Token key derivation and encryption
//! - [`time`] - Clocks
//!
//! ## Quick Start
//!
//! ```ignore
//! use clientstore_core::{ClientStore, StoreConfig};
//!
//! let store = ClientStore::new(StoreConfig::from_env()?)?;
//! store.store_data("last_tab", "identity").await?;
//! let drafts = store.get_all_drafts().await?;
//! let token = store.load_token().await?; // None → re-authenticate
//! ```
//!
//! The crate logs through `tracing` and installs no subscriber.

#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod autosave;
pub mod config;
pub mod crypto;
pub mod error;
pub mod storage;
pub mod time;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use autosave::{
    generate_draft_id, AutoSaveBuilder, AutoSaveCoordinator, AutoSaveStats, FormSink, LoadedForm,
    StoreSink,
};
pub use config::StoreConfig;
pub use crypto::{TokenCipher, TokenVault};
pub use error::{Error, Operation, Result};
pub use storage::{
    CachePartition, ConnectionManager, DisplayNamePolicy, Draft, DraftListing, DraftMetadata,
    DraftPartition, KeyValueStore, NamePrecedence, Partition,
};
pub use time::{Clock, ManualClock, SharedClock, SystemClock};

// ============================================================================
// CLIENT STORE
// ============================================================================

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use storage::namespace::namespaced_key;

/// Everything the client persists, behind one configuration.
///
/// Cloning is cheap; clones share the connection, seed area and locks.
///
/// ## Lifecycle
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                        CLIENT STORE LIFECYCLE                           │
/// ├─────────────────────────────────────────────────────────────────────────┤
/// │                                                                         │
/// │  1. new(config)   validate config, nothing touches disk yet             │
/// │  2. first call    open SQLite, create/upgrade schema (shared by all)   │
/// │  3. start-up      load_token() → Some(token) or None (log in again)    │
/// │  4. editing       auto_save(..) coordinators flush drafts in background │
/// │  5. logout()      token and seed removed, old ciphertext unreadable    │
/// │  6. close()       handle dropped; any later call reopens               │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Clone)]
pub struct ClientStore {
    config: Arc<StoreConfig>,
    kv: KeyValueStore,
    cache: CachePartition,
    drafts: DraftPartition,
    vault: TokenVault,
}

impl ClientStore {
    /// Build from `config` using the system clock.
    pub fn new(config: StoreConfig) -> Result<Self> {
        Self::with_clock(config, time::system_clock())
    }

    /// Build from `config` with an explicit clock.
    pub fn with_clock(config: StoreConfig, clock: SharedClock) -> Result<Self> {
        let manager = ConnectionManager::new(&config)?;
        let kv = KeyValueStore::new(manager, clock);
        let cipher = TokenCipher::from_config(&config)?;

        tracing::debug!(
            database = ?config.database_path,
            object_store = %config.object_store,
            "Client store configured"
        );

        Ok(Self {
            cache: CachePartition::new(kv.clone()),
            drafts: DraftPartition::new(kv.clone()),
            vault: TokenVault::new(kv.clone(), cipher),
            kv,
            config: Arc::new(config),
        })
    }

    /// Everything in memory; nothing survives the process.
    pub fn in_memory() -> Result<Self> {
        Self::new(StoreConfig::in_memory())
    }

    /// Configuration from `CLIENTSTORE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(StoreConfig::from_env()?)
    }

    /// Replace the policy used to name new drafts.
    pub fn with_display_name_policy(mut self, policy: DisplayNamePolicy) -> Self {
        self.drafts = DraftPartition::with_policy(self.kv.clone(), policy);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Open the store now instead of on first use.
    pub async fn open(&self) -> Result<()> {
        self.kv.manager().open().await.map(|_| ())
    }

    /// Drop the shared handle. Later calls reopen.
    pub async fn close(&self) {
        self.kv.manager().close().await;
    }

    pub fn connection_manager(&self) -> &ConnectionManager {
        self.kv.manager()
    }

    /// Raw access to physical keys.
    pub fn kv(&self) -> &KeyValueStore {
        &self.kv
    }

    pub fn cache(&self) -> &CachePartition {
        &self.cache
    }

    pub fn drafts(&self) -> &DraftPartition {
        &self.drafts
    }

    pub fn tokens(&self) -> &TokenVault {
        &self.vault
    }

    // ------------------------------------------------------------------------
    // Generic data (data_<key>)
    // ------------------------------------------------------------------------

    /// Store `value` under `key` in the data partition.
    pub async fn store_data<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.kv
            .put(&namespaced_key(Partition::Data, key), value)
            .await
    }

    /// Value under `key` in the data partition.
    pub async fn get_data<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.kv.get(&namespaced_key(Partition::Data, key)).await
    }

    /// Remove `key` from the data partition.
    pub async fn remove_data(&self, key: &str) -> Result<()> {
        self.kv
            .delete(&namespaced_key(Partition::Data, key))
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Cache
    // ------------------------------------------------------------------------

    pub async fn store_cache<T: Serialize + ?Sized>(&self, key: &str, data: &T) -> Result<()> {
        self.cache.store_cache(key, data).await
    }

    pub async fn get_cache<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.cache.get_cache(key).await
    }

    pub async fn remove_cache(&self, key: &str) -> Result<()> {
        self.cache.remove_cache(key).await
    }

    // ------------------------------------------------------------------------
    // Drafts
    // ------------------------------------------------------------------------

    /// See [`DraftPartition::store_draft`].
    pub async fn store_draft<T: Serialize + ?Sized>(
        &self,
        id: &str,
        payload: &T,
        display_name: Option<&str>,
        category: Option<&str>,
    ) -> Result<DraftMetadata> {
        self.drafts
            .store_draft(id, payload, display_name, category)
            .await
    }

    pub async fn get_draft<T: DeserializeOwned>(&self, id: &str) -> Result<Option<Draft<T>>> {
        self.drafts.get_draft(id).await
    }

    pub async fn get_all_drafts(&self) -> Result<DraftListing> {
        self.drafts.get_all_drafts().await
    }

    pub async fn delete_draft(&self, id: &str) -> Result<()> {
        self.drafts.delete_draft(id).await
    }

    /// Mint a new draft id.
    pub fn generate_draft_id() -> String {
        autosave::generate_draft_id()
    }

    /// Auto-save coordinator that saves through this store's drafts.
    pub fn auto_save<T>(&self, initial: T) -> AutoSaveBuilder<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let sink: Arc<dyn FormSink<T>> = Arc::new(StoreSink::drafts(self.drafts.clone()));
        AutoSaveCoordinator::builder(initial, sink)
    }

    // ------------------------------------------------------------------------
    // Token
    // ------------------------------------------------------------------------

    pub async fn encrypt(&self, plaintext: &str) -> Result<String> {
        self.vault.cipher().encrypt(plaintext).await
    }

    pub async fn decrypt(&self, ciphertext: &str) -> Result<String> {
        self.vault.cipher().decrypt(ciphertext).await
    }

    pub fn clear_seed(&self) -> Result<()> {
        self.vault.cipher().clear_seed()
    }

    pub async fn save_token(&self, token: &str) -> Result<()> {
        self.vault.save_token(token).await
    }

    /// The stored session token, or `None` when the user must log in again.
    pub async fn load_token(&self) -> Result<Option<String>> {
        self.vault.load_token().await
    }

    pub async fn logout(&self) -> Result<()> {
        self.vault.logout().await
    }
}

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of Clientstore Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns build information for debugging
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        schema_version: storage::SCHEMA_VERSION,
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
    }
}

/// Build information for debugging
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Crate version
    pub version: &'static str,
    /// Database schema version this build writes
    pub schema_version: i32,
    /// Build profile (debug/release)
    pub profile: &'static str,
}

// ============================================================================
// TESTS
// ============================================================================
