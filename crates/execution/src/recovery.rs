//! Crash recovery scan: on startup, sweep `execution.pending` for
//! entries that never reached a terminal receipt and clear them. There is
//! no automatic re-execution; callers must re-submit with the same
//! `idempotencyKey`, and the duplicate path will recognize any handoff that
//! did in fact complete before the crash.

use crate::store::ExecutionStore;
use agentworld_core::Result;
use tracing::warn;

/// One recovered (and cleared) pending entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredPending {
    /// The handoff id that was left in-flight.
    pub handoff_id: String,
    /// Its idempotency key.
    pub idempotency_key: String,
}

/// Scan `execution_store` for pending entries with no matching terminal
/// receipt, clear each, and return what was recovered for the caller to
/// log or surface.
pub fn recover_pending(execution_store: &dyn ExecutionStore) -> Result<Vec<RecoveredPending>> {
    let mut recovered = Vec::new();
    for pending in execution_store.list_pending_executions()? {
        if execution_store
        .find_receipt(&pending.handoff_id, &pending.idempotency_key)?
        .is_some()
        {
            // A receipt already exists (the crash happened after
            // `recordResult` but before `clearPendingExecution`); just
            // clear the stale bookkeeping.
            execution_store.clear_pending_execution(&pending.handoff_id, &pending.idempotency_key)?;
            continue;
        }
        warn!(
            handoff_id = %pending.handoff_id,
            idempotency_key = %pending.idempotency_key,
            completed = pending.completed_command_count,
            total = pending.total_command_count,
            "recovering abandoned pending execution with no terminal receipt"
        );
        execution_store.clear_pending_execution(&pending.handoff_id, &pending.idempotency_key)?;
        recovered.push(RecoveredPending {
                handoff_id: pending.handoff_id,
                idempotency_key: pending.idempotency_key,
            });
    }
    Ok(recovered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryExecutionStore;
    use agentworld_core::PendingRecord;
    use agentworld_memory::{MemoryStore, MemoryStoreConfig};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn abandoned_pending_is_recovered_and_cleared() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryStore::open(dir.path().join("s.json"), MemoryStoreConfig::default()));
        let exec_store = MemoryExecutionStore::new(store.clone());
        exec_store
        .stage_pending_execution(PendingRecord {
                handoff_id: "handoff_1".to_string(),
                idempotency_key: "proposal_1".to_string(),
                prepared_snapshot_hash: "hash".to_string(),
                prepared_epoch: 1,
                last_known_snapshot_hash: "hash".to_string(),
                last_known_epoch: 1,
                total_command_count: 1,
                completed_command_count: 0,
                last_applied_command: None,
            })
        .unwrap();

        let recovered = recover_pending(&exec_store).unwrap();
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0].handoff_id, "handoff_1");
        assert!(exec_store.find_pending_execution("handoff_1", "proposal_1").unwrap().is_none());
    }

    #[test]
    fn pending_with_existing_receipt_is_cleared_silently() {
        use crate::result::finalize_receipt;
        use agentworld_core::{Evaluation, ExecutionReceipt, ExecutionStatus, WorldStateSummary};

        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryStore::open(dir.path().join("s.json"), MemoryStoreConfig::default()));
        let exec_store = MemoryExecutionStore::new(store.clone());
        exec_store
        .stage_pending_execution(PendingRecord {
                handoff_id: "handoff_2".to_string(),
                idempotency_key: "proposal_2".to_string(),
                prepared_snapshot_hash: "hash".to_string(),
                prepared_epoch: 1,
                last_known_snapshot_hash: "hash".to_string(),
                last_known_epoch: 1,
                total_command_count: 1,
                completed_command_count: 1,
                last_applied_command: None,
            })
        .unwrap();
        let receipt = finalize_receipt(ExecutionReceipt {
                execution_id: String::new(),
                result_id: String::new(),
                handoff_id: "handoff_2".to_string(),
                proposal_id: "proposal_2".to_string(),
                snapshot_hash: "hash".to_string(),
                decision_epoch: 1,
                actor_id: "mara".to_string(),
                town_id: "riverbend".to_string(),
                proposal_type: "PROJECT_ADVANCE".to_string(),
                command: "advance".to_string(),
                authority_commands: vec![],
                status: ExecutionStatus::Executed,
                accepted: true,
                executed: true,
                reason_code: "EXECUTED".to_string(),
                evaluation: Evaluation::default(),
                world_state: WorldStateSummary::default(),
            });
        exec_store.record_result(receipt, "executed", false).unwrap();

        let recovered = recover_pending(&exec_store).unwrap();
        assert!(recovered.is_empty());
        assert!(exec_store.find_pending_execution("handoff_2", "proposal_2").unwrap().is_none());
    }
}
