//! Error types for host provisioning.

use thiserror::Error;

/// Errors that can occur while probing or changing the host.
#[derive(Debug, Error)]
pub enum Error {
    /// The program could not be started at all
    #[error("failed to execute {command}: {source}")]
    Spawn {
        /// Command line that was attempted
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully
    #[error("command failed: {command} (exit {}): {stderr}", .status.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    CommandFailed {
        /// Command line that failed
        command: String,
        /// Exit code, `None` when killed by a signal
        status: Option<i32>,
        /// Trimmed standard error output
        stderr: String,
    },

    /// An argument would produce a malformed command
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;
