//! # Generic Key-Value Store
//!
//! put/get/delete over physical keys in the manager's object store. Every
//! call opens (or reuses) the shared connection and runs in its own
//! transaction.

use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::codec::{self, EncodedValue, Encoding};
use super::connection::ConnectionManager;
use crate::error::{Error, Operation, Result};
use crate::time::SharedClock;

/// A stored record as read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Physical (namespaced) key
    pub key: String,
    /// Stored text
    pub value: String,
    /// How `value` is encoded
    pub encoding: Encoding,
    /// Milliseconds since the epoch of the last write
    pub updated_at: i64,
}

impl RawRecord {
    /// Decode into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        codec::decode(self.encoding, &self.value)
    }

    /// Decode into an untyped JSON value.
    pub fn decode_value(&self) -> Result<Value> {
        codec::decode_value(self.encoding, &self.value)
    }
}

type RecordRow = (String, String, String, i64);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_record((key, value, encoding, updated_at): RecordRow) -> RawRecord {
    let encoding = encoding.parse().unwrap_or_else(|_| {
        tracing::debug!(key = %key, tag = %encoding, "Unknown encoding tag, decoding heuristically");
        Encoding::Legacy
    });
    RawRecord {
        key,
        value,
        encoding,
        updated_at,
    }
}

/// Transactional key-value access to one object store.
#[derive(Clone)]
pub struct KeyValueStore {
    manager: ConnectionManager,
    clock: SharedClock,
}

impl KeyValueStore {
    /// Build on a connection manager.
    pub fn new(manager: ConnectionManager, clock: SharedClock) -> Self {
        Self { manager, clock }
    }

    /// The underlying connection manager.
    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// Current time according to the store's clock.
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Write `value` under `key`, replacing any previous record.
    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let encoded = codec::encode(value)?;
        self.put_encoded(key, encoded, self.clock.now_millis()).await
    }

    pub(crate) async fn put_encoded(
        &self,
        key: &str,
        encoded: EncodedValue,
        updated_at: i64,
    ) -> Result<()> {
        let conn = self.manager.open().await?;
        let owned_key = key.to_string();
        conn.transact(Operation::Put, key, move |tx, table| {
            tx.execute(
                &format!(
                    "INSERT OR REPLACE INTO \"{}\" (key, value, encoding, updated_at) VALUES (?, ?, ?, ?)",
                    table
                ),
                params![owned_key, encoded.text, encoded.encoding.as_str(), updated_at],
            )
        })
        .await?;
        tracing::debug!(key = %key, "put");
        Ok(())
    }

    /// Read and decode the value under `key`.
    ///
    /// A missing key is `Ok(None)`. A value that cannot be decoded into `T`
    /// is a [`Error::Serialization`] naming the key.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key).await? {
            Some(record) => record
                .decode()
                .map(Some)
                .map_err(|e| Error::Serialization(format!("value at '{}': {}", key, e))),
            None => Ok(None),
        }
    }

    /// Read the stored record without decoding it.
    pub async fn get_raw(&self, key: &str) -> Result<Option<RawRecord>> {
        let conn = self.manager.open().await?;
        let owned_key = key.to_string();
        let row = conn
            .transact(Operation::Get, key, move |tx, table| {
                tx.query_row(
                    &format!(
                        "SELECT key, value, encoding, updated_at FROM \"{}\" WHERE key = ?",
                        table
                    ),
                    params![owned_key],
                    read_row,
                )
                .optional()
            })
            .await?;
        Ok(row.map(into_record))
    }

    /// Whether a record exists under `key`.
    pub async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get_raw(key).await?.is_some())
    }

    /// Remove the record under `key`. Returns whether one existed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.manager.open().await?;
        let owned_key = key.to_string();
        let removed = conn
            .transact(Operation::Delete, key, move |tx, table| {
                tx.execute(
                    &format!("DELETE FROM \"{}\" WHERE key = ?", table),
                    params![owned_key],
                )
            })
            .await?;
        tracing::debug!(key = %key, removed, "delete");
        Ok(removed > 0)
    }

    /// Every record in the object store, ordered by key.
    pub async fn scan(&self) -> Result<Vec<RawRecord>> {
        self.scan_prefix("").await
    }

    /// Records whose key starts with `prefix`, ordered by key.
    pub async fn scan_prefix(&self, prefix: &str) -> Result<Vec<RawRecord>> {
        let conn = self.manager.open().await?;
        let owned_prefix = prefix.to_string();
        let rows = conn
            .transact(Operation::Scan, prefix, move |tx, table| {
                let mut stmt = tx.prepare(&format!(
                    "SELECT key, value, encoding, updated_at FROM \"{}\" \
                     WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
                    table
                ))?;
                let rows = stmt
                    .query_map(params![owned_prefix], read_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows.into_iter().map(into_record).collect())
    }

    /// Remove every record whose key starts with `prefix`.
    pub async fn clear_prefix(&self, prefix: &str) -> Result<usize> {
        let conn = self.manager.open().await?;
        let owned_prefix = prefix.to_string();
        let removed = conn
            .transact(Operation::Clear, prefix, move |tx, table| {
                tx.execute(
                    &format!(
                        "DELETE FROM \"{}\" WHERE substr(key, 1, length(?1)) = ?1",
                        table
                    ),
                    params![owned_prefix],
                )
            })
            .await?;
        tracing::debug!(prefix = %prefix, removed, "clear");
        Ok(removed)
    }
}
