//! Execution Store: two interchangeable backends behind a common
//! interface. Both must report identical observable behavior for
//! `record_result`: append a ledger row keyed by `<executionId>:<kind>`,
//! clear matching pending rows unless `clear_pending` is `false`, and
//! append a receipt unless `kind` is `"duplicate_replayed"` (a replay
//! re-reports the original receipt; it must never create or overwrite
//! one).

mod memory_backend;
mod sql_backend;

pub use memory_backend::MemoryExecutionStore;
pub use sql_backend::SqlExecutionStore;

use agentworld_core::{ChronicleEntry, ExecutionReceipt, PendingRecord, Result, Snapshot};
use agentworld_memory::MemoryStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Common interface both backends implement.
pub trait ExecutionStore {
    /// Find a terminal receipt by handoff id or idempotency key.
    fn find_receipt(&self, handoff_id: &str, idempotency_key: &str) -> Result<Option<ExecutionReceipt>>;

    /// Find an in-flight pending record by handoff id or idempotency key.
    fn find_pending_execution(&self, handoff_id: &str, idempotency_key: &str) -> Result<Option<PendingRecord>>;

    /// List all in-flight pending records (crash-recovery scan).
    fn list_pending_executions(&self) -> Result<Vec<PendingRecord>>;

    /// Stage a pending record, superseding any existing one with the same
    /// identity.
    fn stage_pending_execution(&self, record: PendingRecord) -> Result<()>;

    /// Update an in-flight pending record's progress fields in place.
    fn mark_pending_execution_progress(
        &self,
        handoff_id: &str,
        idempotency_key: &str,
        completed_command_count: u32,
        last_applied_command: Option<String>,
        last_known_snapshot_hash: String,
        last_known_epoch: u64,
    ) -> Result<()>;

    /// Clear a pending record matching this identity.
    fn clear_pending_execution(&self, handoff_id: &str, idempotency_key: &str) -> Result<()>;

    /// Append a ledger row, clearing matching pending rows unless
    /// `clear_pending` is `false`. Also appends `receipt` as a new
    /// terminal record, unless `kind == "duplicate_replayed"`, in which
    /// case the original terminal receipt this duplicate re-reports is
    /// left untouched.
    fn record_result(&self, receipt: ExecutionReceipt, kind: &str, clear_pending: bool) -> Result<()>;

    /// Backends that maintain their own projection (the SQL backend) sync
    /// it from the authoritative snapshot; the memory backend is a no-op
    /// since it reads the same snapshot it writes.
    fn sync_world_memory_from_snapshot(&self, snapshot: &Snapshot) -> Result<()>;

    /// Most recent chronicle records, `at DESC`, capped at `limit`.
    fn list_chronicle_records(&self, limit: usize) -> Result<Vec<ChronicleEntry>>;

    /// Most recent terminal receipts, `at DESC` (by ledger day), capped at
    /// `limit`.
    fn list_history_records(&self, limit: usize) -> Result<Vec<ExecutionReceipt>>;
}

/// Which `ExecutionStore` backend a running world uses.
#[derive(Debug, Clone)]
pub enum Backend {
    /// Keep execution state in the same snapshot the Memory Store owns.
    Memory,
    /// Keep execution state in a standalone SQLite database at this path.
    Sql(PathBuf),
}

/// Selects and builds the `ExecutionStore` backend a running world uses.
/// An explicit config struct, matching `MemoryStoreConfig`'s
/// config-struct-with-`Default`-impl pattern, rather than leaving backend
/// selection to whatever the caller happens to construct directly.
#[derive(Debug, Clone)]
pub struct ExecutionStoreConfig {
    /// The backend to build.
    pub backend: Backend,
}

impl Default for ExecutionStoreConfig {
    fn default() -> Self {
        ExecutionStoreConfig {
            backend: Backend::Memory,
        }
    }
}

impl ExecutionStoreConfig {
    /// Build the configured backend, boxed behind the common trait object.
    /// `memory` is only consulted for `Backend::Memory`; `Backend::Sql`
    /// opens its own independent SQLite connection.
    pub fn build(&self, memory: Arc<MemoryStore>) -> Result<Arc<dyn ExecutionStore + Send + Sync>> {
        match &self.backend {
            Backend::Memory => Ok(Arc::new(MemoryExecutionStore::new(memory))),
            Backend::Sql(path) => Ok(Arc::new(SqlExecutionStore::open(path)?)),
        }
    }
}
