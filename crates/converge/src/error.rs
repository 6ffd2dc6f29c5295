//! Error types for planning and applying changes

use crate::change::ChangeKind;
use thiserror::Error;

/// Errors raised by the planner and applier
///
/// Resource implementations report failures as `anyhow::Error`; the engine
/// wraps them here so callers can tell which phase failed and for which
/// resource.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading the live state of a resource failed
    #[error("failed to read current state for {resource_id}")]
    Probe {
        resource_id: String,
        #[source]
        source: anyhow::Error,
    },

    /// Comparing current and desired state failed
    #[error("failed to diff resource {resource_id}")]
    Diff {
        resource_id: String,
        #[source]
        source: anyhow::Error,
    },

    /// An installer or system mutation failed while applying a change
    #[error("failed to apply {kind} change for {resource_id}")]
    Apply {
        resource_id: String,
        kind: ChangeKind,
        #[source]
        source: anyhow::Error,
    },

    /// Recording the post-apply snapshot failed
    #[error("failed to persist state for {resource_id}")]
    StatePersist {
        resource_id: String,
        #[source]
        source: anyhow::Error,
    },

    /// The same resource id was declared twice in one desired list
    #[error("resource {0} is declared more than once")]
    DuplicateResource(String),
}

impl Error {
    /// The resource id this error refers to
    pub fn resource_id(&self) -> &str {
        match self {
            Self::Probe { resource_id, .. }
            | Self::Diff { resource_id, .. }
            | Self::Apply { resource_id, .. }
            | Self::StatePersist { resource_id, .. } => resource_id,
            Self::DuplicateResource(id) => id,
        }
    }
}

/// Errors from schema-checked snapshot access
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// The key is not present in the snapshot
    #[error("snapshot has no attribute '{key}'")]
    Missing { key: String },

    /// The key is present but holds a different JSON type
    #[error("snapshot attribute '{key}' should be {expected}, found {found}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: String,
    },
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;
