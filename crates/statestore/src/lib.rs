//! # Statestore
//!
//! Embedded SQLite key/value store for recorded resource state.
//!
//! Values live in named buckets inside one database file:
//! - `slothctl_state` holds one JSON snapshot per resource id
//! - `slothctl_data` is reserved for other subsystems sharing the file
//!
//! The database is opened with an exclusive lock held for the lifetime of
//! the handle, so two invocations never write state concurrently. A second
//! opener waits up to one second and then fails.
//!
//! ## Example
//!
//! ```no_run
//! use statestore::StateDb;
//! use std::path::Path;
//!
//! let mut db = StateDb::open(Path::new("/tmp/slothctl.db"))?;
//! db.put_in(statestore::STATE_BUCKET, "user:ops", br#"{"exists":true}"#)?;
//! for entry in db.list(statestore::STATE_BUCKET)? {
//!     println!("{} (updated {})", entry.key, entry.updated_at);
//! }
//! # Ok::<(), statestore::Error>(())
//! ```

mod error;

pub use error::{Error, Result};

use chrono::{DateTime, Utc};
use converge::{Snapshot, StateStore};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Bucket holding resource snapshots
pub const STATE_BUCKET: &str = "slothctl_state";

/// Bucket reserved for sibling subsystems
pub const DATA_BUCKET: &str = "slothctl_data";

const BUSY_TIMEOUT: Duration = Duration::from_secs(1);

/// A key and when it was last written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateEntry {
    pub key: String,
    pub updated_at: DateTime<Utc>,
}

/// Handle to the state database
pub struct StateDb {
    conn: Connection,
}

impl StateDb {
    /// Open or create the state database at the given path
    ///
    /// Creates the parent directory, the schema, and both buckets if they
    /// don't exist, and takes the exclusive lock.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "locking_mode", "EXCLUSIVE")?;

        // An exclusive transaction acquires the file lock; in exclusive
        // locking mode it is then kept until the connection closes.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Exclusive)?;
        tx.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS buckets (
                name TEXT PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS kv (
                bucket TEXT NOT NULL REFERENCES buckets(name),
                key TEXT NOT NULL,
                value BLOB NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (bucket, key)
            );
            ",
        )?;
        for bucket in [STATE_BUCKET, DATA_BUCKET] {
            tx.execute("INSERT OR IGNORE INTO buckets (name) VALUES (?1)", [bucket])?;
        }
        tx.commit()?;

        log::debug!("Opened state database {}", db_path.display());
        Ok(Self { conn })
    }

    /// Read a value, `None` when the key was never written
    pub fn get_in(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        self.require_bucket(bucket)?;
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE bucket = ?1 AND key = ?2",
                [bucket, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Insert or replace a value inside a write transaction
    pub fn put_in(&mut self, bucket: &str, key: &str, value: &[u8]) -> Result<()> {
        self.require_bucket(bucket)?;
        let now = Utc::now().timestamp();
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO kv (bucket, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(bucket, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![bucket, key, value, now],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Remove a key, returning whether it existed
    pub fn delete_in(&mut self, bucket: &str, key: &str) -> Result<bool> {
        self.require_bucket(bucket)?;
        let removed = self
            .conn
            .execute("DELETE FROM kv WHERE bucket = ?1 AND key = ?2", [bucket, key])?;
        Ok(removed > 0)
    }

    /// All keys in a bucket, sorted
    pub fn list(&self, bucket: &str) -> Result<Vec<StateEntry>> {
        self.require_bucket(bucket)?;
        let mut stmt = self
            .conn
            .prepare("SELECT key, updated_at FROM kv WHERE bucket = ?1 ORDER BY key")?;
        let rows = stmt.query_map([bucket], |row| {
            let key: String = row.get(0)?;
            let secs: i64 = row.get(1)?;
            Ok(StateEntry {
                key,
                updated_at: DateTime::from_timestamp(secs, 0).unwrap_or_default(),
            })
        })?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// Names of all buckets, sorted
    pub fn buckets(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM buckets ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Decode the recorded snapshot of a resource
    pub fn snapshot(&self, resource_id: &str) -> Result<Option<Snapshot>> {
        match self.get_in(STATE_BUCKET, resource_id)? {
            None => Ok(None),
            Some(bytes) => Ok(Some(Snapshot::from_bytes(&bytes)?)),
        }
    }

    fn require_bucket(&self, bucket: &str) -> Result<()> {
        let exists = self
            .conn
            .query_row("SELECT 1 FROM buckets WHERE name = ?1", [bucket], |_| Ok(()))
            .optional()?
            .is_some();
        if exists {
            Ok(())
        } else {
            Err(Error::UnknownBucket(bucket.to_string()))
        }
    }
}

impl StateStore for StateDb {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.get_in(STATE_BUCKET, key)?)
    }

    fn put(&mut self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        Ok(self.put_in(STATE_BUCKET, key, value)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
