//! API-layer error classification: every external collaborator
//! entry point resolves to either a structured, recoverable rejection or a
//! fatal error that the process contract says should exit 1.

use thiserror::Error;

/// Error surfaced to an external collaborator driving this facade.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The input line was not valid JSON, or failed schema validation.
    /// Always recoverable: the collaborator may retry with a corrected
    /// line.
    #[error("malformed request: {0}")]
    Malformed(String),

    /// An unrecoverable failure bubbled up from the underlying stack (lock
    /// timeout, rename failure, SQL backend error). This is the one
    /// condition a CLI driving this facade should exit 1 on.
    #[error(transparent)]
    Fatal(#[from] agentworld_core::Error),
}

impl ApiError {
    /// The process exit code a CLI shell should use for this error: 1 on
    /// a fatal internal error. Malformed-input rejections are not fatal;
    /// the caller just tries again.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ApiError::Malformed(_) => None,
            ApiError::Fatal(_) => Some(1),
        }
    }
}

pub(crate) fn from_core(err: agentworld_core::Error) -> ApiError {
    if err.recoverable() {
        ApiError::Malformed(err.to_string())
    } else {
        ApiError::Fatal(err)
    }
}
