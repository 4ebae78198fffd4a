//! Cache partition: reference and lookup data under `cache_<key>`.
//!
//! Entries never expire. Staleness is the caller's concern; drop entries
//! explicitly with [`CachePartition::remove_cache`] or [`CachePartition::clear`].

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::kv::KeyValueStore;
use super::namespace::{namespaced_key, Partition};
use crate::error::Result;

/// Namespaced view of the cache partition.
#[derive(Clone)]
pub struct CachePartition {
    store: KeyValueStore,
}

impl CachePartition {
    pub fn new(store: KeyValueStore) -> Self {
        Self { store }
    }

    /// Store (or overwrite) `data` under `key`.
    pub async fn store_cache<T: Serialize + ?Sized>(&self, key: &str, data: &T) -> Result<()> {
        self.store
            .put(&namespaced_key(Partition::Cache, key), data)
            .await
    }

    /// Cached value under `key`, if any.
    pub async fn get_cache<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.store.get(&namespaced_key(Partition::Cache, key)).await
    }

    /// Drop the entry under `key`. Missing keys are fine.
    pub async fn remove_cache(&self, key: &str) -> Result<()> {
        self.store
            .delete(&namespaced_key(Partition::Cache, key))
            .await?;
        Ok(())
    }

    /// Drop every cache entry, returning how many were removed.
    pub async fn clear(&self) -> Result<usize> {
        let removed = self.store.clear_prefix(&Partition::Cache.prefix()).await?;
        tracing::info!(removed, "Cache partition cleared");
        Ok(removed)
    }
}
