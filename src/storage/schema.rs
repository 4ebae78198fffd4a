//! # Database Schema
//!
//! SQL schema definitions for the persistence store.
//!
//! ## Schema Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         DATABASE SCHEMA                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐    ┌─────────────────┐      ┌─────────────────┐    │
//! │  │ schema_version  │    │  object_stores  │      │  store_<name>   │    │
//! │  ├─────────────────┤    ├─────────────────┤      ├─────────────────┤    │
//! │  │ version         │    │ name            │─────►│ key             │    │
//! │  └─────────────────┘    │ created_at      │      │ value           │    │
//! │                         └─────────────────┘      │ encoding        │    │
//! │                                                  │ updated_at      │    │
//! │                                                  └─────────────────┘    │
//! │                                                                         │
//! │  One `store_<name>` table per object store. Partitions (drafts, cache, │
//! │  data) are key prefixes inside a store, not separate tables.           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Upgrades are additive: object stores are created when missing and never
//! dropped.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL to create the bookkeeping tables
pub const CREATE_TABLES: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Registry of object stores created so far
CREATE TABLE IF NOT EXISTS object_stores (
    name TEXT PRIMARY KEY NOT NULL,
    -- Unix timestamp (milliseconds) of creation
    created_at INTEGER NOT NULL
);
"#;

/// Table name backing an object store.
///
/// Callers validate `name` first (see `config::is_valid_store_name`).
pub fn table_name(store: &str) -> String {
    format!("store_{}", store)
}

/// SQL to create one object store table
pub fn create_object_store(store: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS "{table}" (
    -- Namespaced key ("<partition>_<id>")
    key TEXT PRIMARY KEY NOT NULL,
    -- Raw string or JSON text, see `encoding`
    value TEXT NOT NULL,
    -- 'raw' | 'json' | 'legacy'
    encoding TEXT NOT NULL DEFAULT 'json',
    -- Unix timestamp (milliseconds) of the last write
    updated_at INTEGER NOT NULL
);
"#,
        table = table_name(store)
    )
}

/// Migration from v1 to v2: tag every existing value with its encoding.
///
/// v1 rows stored strings and JSON indistinguishably, so they are marked
/// `legacy` and decoded heuristically.
pub fn migrate_v1_to_v2(store: &str) -> String {
    format!(
        r#"ALTER TABLE "{table}" ADD COLUMN encoding TEXT NOT NULL DEFAULT 'legacy';"#,
        table = table_name(store)
    )
}

/// v1 object store layout, kept so migrations can be exercised.
#[cfg(test)]
pub fn create_object_store_v1(store: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS "{table}" (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
"#,
        table = table_name(store)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name() {
        assert_eq!(table_name("keyval"), "store_keyval");
    }

    #[test]
    fn test_schema_applies_to_fresh_database() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_TABLES).unwrap();
        conn.execute_batch(&create_object_store("keyval")).unwrap();
        // Idempotent
        conn.execute_batch(&create_object_store("keyval")).unwrap();

        conn.execute(
            "INSERT INTO store_keyval (key, value, updated_at) VALUES ('a', '1', 0)",
            [],
        )
        .unwrap();
        let encoding: String = conn
            .query_row("SELECT encoding FROM store_keyval WHERE key = 'a'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(encoding, "json");
    }

    #[test]
    fn test_v1_migration_marks_rows_legacy() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(&create_object_store_v1("keyval")).unwrap();
        conn.execute(
            "INSERT INTO store_keyval (key, value, updated_at) VALUES ('a', 'hello', 0)",
            [],
        )
        .unwrap();

        conn.execute_batch(&migrate_v1_to_v2("keyval")).unwrap();

        let encoding: String = conn
            .query_row("SELECT encoding FROM store_keyval WHERE key = 'a'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(encoding, "legacy");
    }
}
