//! Error types shared across the agent-world crates.
//!
//! Mirrors the split the rest of the system relies on: validation failures
//! are recoverable and become structured results (rejections, stale/duplicate
//! outcomes); I/O, lock, and backend failures are not and must bubble up to
//! a caller capable of a graceful shutdown.

use thiserror::Error;

/// Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the agent-world core.
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem I/O failure (snapshot read/write, lock file operations).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The cross-process advisory lock could not be acquired within the
    /// configured retry budget.
    #[error("lock timeout after {attempts} attempts on {path}")]
    LockTimeout {
        /// Path of the `.lock()` sibling file.
        path: String,
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// A caller-supplied mutator or backend returned a failure that we
    /// consider a programmer/config error, not a transient condition.
    #[error("fatal: {0}")]
    Fatal(String),

    /// Input failed validation (untrusted turn payload, handoff envelope,
    /// malformed snapshot entry). Always recoverable.
    #[error("validation failed: {0}")]
    Validation(String),

    /// SQL backend failure (execution store only).
    #[error("sql backend error: {0}")]
    Sql(String),

    /// A racing operation lost to its timeout. The payload is the caller's
    /// label, used to categorize which call timed out.
    #[error("timeout: {0}")]
    Timeout(String),
}

impl Error {
    /// Whether this error represents a condition a caller can recover from
    /// by returning a structured rejection, versus one that must propagate
    /// and trigger shutdown.
    ///
    /// Per: validation errors are recoverable; I/O, lock, and backend
    /// errors are not.
    pub fn recoverable(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Timeout(_))
    }
}
