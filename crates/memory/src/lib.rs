//! The Memory Store: a serialized, file-locked, crash-safe
//! transactional snapshot manager with event-id idempotency, plus the pure
//! integrity validator that enforces the snapshot's invariants.

#![warn(missing_docs)]

mod config;
mod integrity;
mod lock;
mod persistence;
mod store;

pub use config::MemoryStoreConfig;
pub use integrity::{validate, Issue, ValidationReport};
pub use lock::LockGuard;
pub use store::{MemoryStore, TransactOptions, TransactOutcome};
