//! State store abstraction for last-known snapshots

use crate::snapshot::Snapshot;
use anyhow::{Context, Result};
use std::collections::HashMap;

/// Byte-oriented key/value store holding one snapshot per resource id
///
/// The engine only ever calls `get` and `put`. Implementations decide
/// durability and locking.
pub trait StateStore {
    /// Read the bytes stored under `key`, `None` when never written
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value
    fn put(&mut self, key: &str, value: &[u8]) -> Result<()>;

    /// Read and decode a snapshot
    fn load_snapshot(&self, resource_id: &str) -> Result<Option<Snapshot>> {
        match self.get(resource_id)? {
            None => Ok(None),
            Some(bytes) => Snapshot::from_bytes(&bytes)
                .map(Some)
                .with_context(|| format!("Stored state for {} is not a valid snapshot", resource_id)),
        }
    }

    /// Encode and write a snapshot
    fn save_snapshot(&mut self, resource_id: &str, snapshot: &Snapshot) -> Result<()> {
        let bytes = snapshot.to_bytes().context("Failed to encode snapshot")?;
        self.put(resource_id, &bytes)
    }
}

/// In-memory store, for tests and one-shot runs
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
