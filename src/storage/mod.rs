//! # Storage Module
//!
//! Durable local persistence for application data, cached reference data
//! and form drafts.
//!
//! ## Storage Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         STORAGE SYSTEM                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐     │
//! │   │CachePartition│  │DraftPartition│  │ data_* (facade, tokens)  │     │
//! │   │  cache_<k>   │  │  drafts_<id> │  │   data_<k>               │     │
//! │   └──────┬───────┘  └──────┬───────┘  └────────────┬─────────────┘     │
//! │          └─────────────────┼───────────────────────┘                   │
//! │                            ▼                                            │
//! │   ┌─────────────────────────────────────────────────────────────────┐  │
//! │   │  KeyValueStore: put / get / delete / scan, one tx per call     │  │
//! │   │  codec: raw | json | legacy                                    │  │
//! │   └─────────────────────────┬───────────────────────────────────────┘  │
//! │                             ▼                                           │
//! │   ┌─────────────────────────────────────────────────────────────────┐  │
//! │   │  ConnectionManager: one memoized SQLite handle, per-key locks  │  │
//! │   │  table store_<object store>: key | value | encoding | updated  │  │
//! │   └─────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │   ┌─────────────────────────────────────────────────────────────────┐  │
//! │   │  PlainStore: unencrypted seed area, outside SQLite             │  │
//! │   └─────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod codec;
pub mod connection;
pub mod drafts;
pub mod kv;
pub mod namespace;
pub mod plain_store;
pub mod schema;

pub use cache::CachePartition;
pub use codec::{EncodedValue, Encoding};
pub use connection::{Connection, ConnectionManager, KeyLocks};
pub use drafts::{
    DisplayNamePolicy, Draft, DraftListing, DraftMetadata, DraftPartition, NamePrecedence,
};
pub use kv::{KeyValueStore, RawRecord};
pub use namespace::{belongs_to, namespaced_key, strip_namespace, Partition};
pub use plain_store::PlainStore;
pub use schema::SCHEMA_VERSION;
