//! Observed or desired attribute sets of a resource

use crate::error::SnapshotError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Ordered attribute map used by snapshots and change records
pub type Attributes = BTreeMap<String, Value>;

/// A set of resource attributes at a point in time
///
/// Snapshots are dynamic maps, but every read goes through a checked
/// accessor so a differently-shaped probe result surfaces as a
/// [`SnapshotError`] instead of a panic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Attributes);

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set an attribute, replacing any previous value
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Read a string attribute
    pub fn get_str(&self, key: &str) -> Result<&str, SnapshotError> {
        let value = self.require(key)?;
        value.as_str().ok_or_else(|| wrong_type(key, "a string", value))
    }

    /// Read a boolean attribute
    pub fn get_bool(&self, key: &str) -> Result<bool, SnapshotError> {
        let value = self.require(key)?;
        value.as_bool().ok_or_else(|| wrong_type(key, "a boolean", value))
    }

    /// Read a boolean attribute, treating a missing key as `default`
    pub fn get_bool_or(&self, key: &str, default: bool) -> Result<bool, SnapshotError> {
        match self.0.get(key) {
            None => Ok(default),
            Some(value) => value.as_bool().ok_or_else(|| wrong_type(key, "a boolean", value)),
        }
    }

    fn require(&self, key: &str) -> Result<&Value, SnapshotError> {
        self.0.get(key).ok_or_else(|| SnapshotError::Missing {
            key: key.to_string(),
        })
    }

    /// Keys observed in `self` whose value differs in `desired`
    ///
    /// Only keys present in both snapshots are compared: attributes a probe
    /// cannot observe (passwords, generated ids) never count as drift.
    pub fn differing_keys<'a>(&'a self, desired: &Snapshot) -> Vec<&'a str> {
        self.0
            .iter()
            .filter(|(key, value)| desired.get(key).is_some_and(|d| d != *value))
            .map(|(key, _)| key.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying attribute map
    pub fn attributes(&self) -> &Attributes {
        &self.0
    }

    /// Encode for the state store
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.0)
    }

    /// Decode a value previously written by [`Snapshot::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes).map(Self)
    }
}

impl From<Attributes> for Snapshot {
    fn from(attributes: Attributes) -> Self {
        Self(attributes)
    }
}

fn wrong_type(key: &str, expected: &'static str, found: &Value) -> SnapshotError {
    let found = match found {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    };
    SnapshotError::WrongType {
        key: key.to_string(),
        expected,
        found: found.to_string(),
    }
}
