//! # Connection Manager
//!
//! Opens, memoizes and invalidates the single SQLite handle shared by every
//! partition.
//!
//! ## Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      CONNECTION LIFECYCLE                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   open() ──► slot empty? ──yes──► open file ──► upgrade schema ──┐      │
//! │     │             │                                              │      │
//! │     │             no                                             ▼      │
//! │     │             │                                    cache in slot    │
//! │     │             ▼                                              │      │
//! │     │       handle closed? ──yes──► clear slot, reopen ──────────┘      │
//! │     │             │                                                     │
//! │     │             no                                                    │
//! │     │             ▼                                                     │
//! │     └──────► cached handle                                              │
//! │                                                                         │
//! │  The slot is guarded by an async mutex held across the whole open, so  │
//! │  callers arriving during a cold start wait for that open and receive   │
//! │  the same handle instead of starting their own.                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, ErrorCode};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::schema;
use crate::config::StoreConfig;
use crate::error::{Error, Operation, Result};
use crate::time::now_timestamp_millis;

/// How long a transaction waits on a file lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// CONNECTION
// ============================================================================

/// A shared handle to the open store.
///
/// Cloning is cheap; all clones refer to the same SQLite connection.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    conn: Mutex<rusqlite::Connection>,
    object_store: String,
    table: String,
    generation: u64,
    closed: AtomicBool,
}

impl Connection {
    fn new(conn: rusqlite::Connection, object_store: &str, generation: u64) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                conn: Mutex::new(conn),
                object_store: object_store.to_string(),
                table: schema::table_name(object_store),
                generation,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Object store this handle reads and writes.
    pub fn object_store(&self) -> &str {
        &self.inner.object_store
    }

    /// Which open sequence produced this handle (1 for the first).
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    /// Whether the handle has been closed or invalidated.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Invalidate the handle.
    ///
    /// In-flight transactions finish; new ones fail with
    /// [`Error::ConnectionClosed`] and the manager reopens on next `open()`.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!(generation = self.inner.generation, "Store connection closed");
        }
    }

    /// Identity comparison.
    pub fn ptr_eq(a: &Connection, b: &Connection) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Run `f` inside its own transaction on the blocking pool.
    ///
    /// `f` receives the transaction and the object store's table name.
    /// Any failure is reported as [`Error::Transaction`] naming `operation`
    /// and `key`.
    pub(crate) async fn transact<R, F>(&self, operation: Operation, key: &str, f: F) -> Result<R>
    where
        F: FnOnce(&rusqlite::Transaction<'_>, &str) -> rusqlite::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        let inner = Arc::clone(&self.inner);
        let outcome = tokio::task::spawn_blocking(move || {
            let mut conn = inner.conn.lock();
            let tx = conn.transaction()?;
            let value = f(&tx, &inner.table)?;
            tx.commit()?;
            Ok::<R, rusqlite::Error>(value)
        })
        .await
        .map_err(|e| Error::transaction(operation, key, e))?;

        outcome.map_err(|e| {
            if invalidates_handle(&e) {
                tracing::warn!(
                    generation = self.generation(),
                    "Store file unusable ({}), invalidating connection",
                    e
                );
                self.close();
            }
            Error::transaction(operation, key, e)
        })
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("object_store", &self.inner.object_store)
            .field("generation", &self.inner.generation)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Errors after which the cached handle must not be reused.
fn invalidates_handle(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::NotADatabase) | Some(ErrorCode::DatabaseCorrupt) | Some(ErrorCode::CannotOpen)
    )
}

// ============================================================================
// CONNECTION MANAGER
// ============================================================================

#[derive(Debug, Clone)]
struct OpenSettings {
    path: Option<PathBuf>,
    object_store: String,
    object_stores: Vec<String>,
}

/// Owns the memoized connection.
///
/// Cloning shares the same slot, counters and key locks.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    settings: OpenSettings,
    /// Single-flights opens. Held across the whole open sequence.
    slot: AsyncMutex<Option<Connection>>,
    /// Mirror of the cached handle, reachable without awaiting `slot`.
    current: Mutex<Option<Connection>>,
    opens: AtomicU64,
    locks: KeyLocks,
}

impl ConnectionManager {
    /// Create a manager. Nothing is opened until the first [`open`](Self::open).
    pub fn new(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(ManagerInner {
                settings: OpenSettings {
                    path: config.database_path.clone(),
                    object_store: config.object_store.clone(),
                    object_stores: config.object_stores(),
                },
                slot: AsyncMutex::new(None),
                current: Mutex::new(None),
                opens: AtomicU64::new(0),
                locks: KeyLocks::default(),
            }),
        })
    }

    /// Return the shared handle, opening and upgrading the store if needed.
    pub async fn open(&self) -> Result<Connection> {
        let mut slot = self.inner.slot.lock().await;

        if let Some(conn) = slot.as_ref() {
            if !conn.is_closed() {
                return Ok(conn.clone());
            }
            tracing::debug!(
                generation = conn.generation(),
                "Cached connection was invalidated, reopening"
            );
            *slot = None;
        }

        let generation = self.inner.opens.fetch_add(1, Ordering::SeqCst) + 1;
        let settings = self.inner.settings.clone();
        let conn = tokio::task::spawn_blocking(move || open_blocking(&settings, generation))
            .await
            .map_err(|e| Error::ConnectionFailed(format!("Open task failed: {}", e)))??;

        tracing::info!(
            generation,
            object_store = %conn.object_store(),
            "Store connection opened"
        );
        *self.inner.current.lock() = Some(conn.clone());
        *slot = Some(conn.clone());
        Ok(conn)
    }

    /// Close and forget the cached handle. The next `open()` reopens.
    pub async fn close(&self) {
        let mut slot = self.inner.slot.lock().await;
        self.inner.current.lock().take();
        if let Some(conn) = slot.take() {
            conn.close();
        }
    }

    /// Mark the cached handle unusable without waiting for in-flight opens.
    ///
    /// Used when something outside this manager changed the store file. The
    /// slot itself is cleared lazily by the next `open()`; an open already in
    /// flight publishes a fresh handle and is unaffected.
    pub fn invalidate(&self) {
        if let Some(conn) = self.inner.current.lock().take() {
            tracing::debug!(generation = conn.generation(), "Connection invalidated");
            conn.close();
        }
    }

    /// Whether a usable handle is cached.
    pub async fn is_open(&self) -> bool {
        self.inner
            .slot
            .lock()
            .await
            .as_ref()
            .map(|c| !c.is_closed())
            .unwrap_or(false)
    }

    /// Number of open/upgrade sequences started so far.
    pub fn open_count(&self) -> u64 {
        self.inner.opens.load(Ordering::SeqCst)
    }

    /// Object store the partitions live in.
    pub fn object_store(&self) -> &str {
        &self.inner.settings.object_store
    }

    /// Per-key write locks shared by everything built on this manager.
    pub fn key_locks(&self) -> &KeyLocks {
        &self.inner.locks
    }
}

fn open_blocking(settings: &OpenSettings, generation: u64) -> Result<Connection> {
    let mut conn = match &settings.path {
        Some(path) => rusqlite::Connection::open(path).map_err(|e| {
            Error::ConnectionFailed(format!("Failed to open database {}: {}", path.display(), e))
        })?,
        None => rusqlite::Connection::open_in_memory().map_err(|e| {
            Error::ConnectionFailed(format!("Failed to create in-memory database: {}", e))
        })?,
    };

    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| Error::ConnectionFailed(format!("Failed to set busy timeout: {}", e)))?;

    upgrade(&mut conn, &settings.object_stores)?;

    Ok(Connection::new(conn, &settings.object_store, generation))
}

/// Bring the schema to [`schema::SCHEMA_VERSION`] and create missing stores.
fn upgrade(conn: &mut rusqlite::Connection, stores: &[String]) -> Result<()> {
    let upgrade_err = |e: rusqlite::Error| Error::ConnectionFailed(format!("Schema upgrade failed: {}", e));

    let tx = conn.transaction().map_err(upgrade_err)?;

    let version: Option<i32> = tx
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .ok();

    match version {
        None => {
            tx.execute_batch(schema::CREATE_TABLES).map_err(upgrade_err)?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?)",
                params![schema::SCHEMA_VERSION],
            )
            .map_err(upgrade_err)?;
            tracing::info!("Database schema created (version {})", schema::SCHEMA_VERSION);
        }
        Some(v) if v < schema::SCHEMA_VERSION => {
            tracing::info!(
                "Database schema version {} is older than current {}, running migrations",
                v,
                schema::SCHEMA_VERSION
            );
            if v < 2 {
                tracing::info!("Running migration v1 → v2 (encoding tags)");
                for store in registered_stores(&tx).map_err(upgrade_err)? {
                    tx.execute_batch(&schema::migrate_v1_to_v2(&store))
                        .map_err(upgrade_err)?;
                }
            }
            tx.execute("UPDATE schema_version SET version = ?", params![schema::SCHEMA_VERSION])
                .map_err(upgrade_err)?;
            tracing::info!("All migrations complete (now at version {})", schema::SCHEMA_VERSION);
        }
        Some(v) if v > schema::SCHEMA_VERSION => {
            return Err(Error::ConnectionFailed(format!(
                "Database schema version {} is newer than supported version {}",
                v,
                schema::SCHEMA_VERSION
            )));
        }
        Some(v) => {
            tracing::debug!("Database schema version: {}", v);
        }
    }

    let existing = registered_stores(&tx).map_err(upgrade_err)?;
    for store in stores.iter().filter(|s| !existing.contains(*s)) {
        tx.execute_batch(&schema::create_object_store(store))
            .map_err(upgrade_err)?;
        tx.execute(
            "INSERT INTO object_stores (name, created_at) VALUES (?, ?)",
            params![store, now_timestamp_millis()],
        )
        .map_err(upgrade_err)?;
        tracing::info!(object_store = %store, "Created object store");
    }

    tx.commit().map_err(upgrade_err)
}

fn registered_stores(tx: &rusqlite::Transaction<'_>) -> rusqlite::Result<HashSet<String>> {
    let mut stmt = tx.prepare("SELECT name FROM object_stores")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<HashSet<_>>>()?;
    Ok(names)
}

// ============================================================================
// KEY LOCKS
// ============================================================================

/// Async mutexes keyed by physical key.
///
/// Used to serialize read-modify-write sequences on the same record.
/// Entries nobody holds or waits on are pruned on the next acquisition.
#[derive(Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyLocks {
    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            locks.retain(|k, l| k == key || Arc::strong_count(l) > 1);
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    /// Whether no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// TESTS
// ============================================================================
