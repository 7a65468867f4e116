//! Memory backend: operates inside the Memory Store's `transact` on
//! the snapshot's `execution` sub-document.

use super::ExecutionStore;
use agentworld_core::{ChronicleEntry, ExecutionReceipt, LedgerEntry, PendingRecord, Result, Snapshot};
use agentworld_memory::{MemoryStore, TransactOptions};
use std::sync::Arc;

/// The memory-backed `ExecutionStore` implementation.
pub struct MemoryExecutionStore {
    store: Arc<MemoryStore>,
}

impl MemoryExecutionStore {
    /// Wrap a shared `MemoryStore` handle.
    pub fn new(store: Arc<MemoryStore>) -> Self {
        MemoryExecutionStore { store }
    }

    fn event_id(kind: &str, handoff_id: &str) -> String {
        format!("exec:{kind}:{handoff_id}")
    }
}

impl ExecutionStore for MemoryExecutionStore {
    fn find_receipt(&self, handoff_id: &str, idempotency_key: &str) -> Result<Option<ExecutionReceipt>> {
        Ok(self
            .store
            .get_snapshot()
            .execution
            .find_receipt(handoff_id, idempotency_key)
            .cloned())
    }

    fn find_pending_execution(&self, handoff_id: &str, idempotency_key: &str) -> Result<Option<PendingRecord>> {
        Ok(self
            .store
            .get_snapshot()
            .execution
            .list_pending()
        .into_iter()
            .find(|p| p.handoff_id == handoff_id || p.idempotency_key == idempotency_key)
            .cloned())
    }

    fn list_pending_executions(&self) -> Result<Vec<PendingRecord>> {
        Ok(self
            .store
            .get_snapshot()
            .execution
            .list_pending()
        .into_iter()
            .cloned()
            .collect())
    }

    fn stage_pending_execution(&self, record: PendingRecord) -> Result<()> {
        let event_id = Self::event_id("stage_pending", &record.handoff_id);
        self.store
        .transact(TransactOptions::with_event_id(event_id), move |snap: &mut Snapshot| {
                snap.execution.stage_pending(record);
                Ok(())
            })?;
        Ok(())
    }

    fn mark_pending_execution_progress(
        &self,
        handoff_id: &str,
        idempotency_key: &str,
        completed_command_count: u32,
        last_applied_command: Option<String>,
        last_known_snapshot_hash: String,
        last_known_epoch: u64,
    ) -> Result<()> {
        let handoff_id = handoff_id.to_string();
        let idempotency_key = idempotency_key.to_string();
        // Not idempotency-keyed: progress marks may legitimately repeat as
        // more authority-command steps complete within the same handoff.
        self.store.transact(TransactOptions::default(), move |snap: &mut Snapshot| {
                if let Some(existing) = snap
                .execution
                .list_pending()
        .into_iter()
                .find(|p| p.handoff_id == handoff_id || p.idempotency_key == idempotency_key)
                .cloned()
                {
                    snap.execution.stage_pending(PendingRecord {
                            completed_command_count,
                            last_applied_command,
                            last_known_snapshot_hash,
                            last_known_epoch,
                            ..existing
                        });
                }
                Ok(())
            })?;
        Ok(())
    }

    fn clear_pending_execution(&self, handoff_id: &str, idempotency_key: &str) -> Result<()> {
        let handoff_id = handoff_id.to_string();
        let idempotency_key = idempotency_key.to_string();
        self.store.transact(TransactOptions::default(), move |snap: &mut Snapshot| {
                snap.execution.clear_pending(&handoff_id, &idempotency_key);
                Ok(())
            })?;
        Ok(())
    }

    fn record_result(&self, receipt: ExecutionReceipt, kind: &str, clear_pending: bool) -> Result<()> {
        let event_id = Self::event_id(&format!("record_result:{kind}"), &receipt.execution_id);
        let kind = kind.to_string();
        self.store.transact(TransactOptions::with_event_id(event_id), move |snap: &mut Snapshot| {
                let day = snap.world.clock.day;
                let ledger_id = format!("{}:{kind}", receipt.execution_id);
                let persist_receipt = kind != "duplicate_replayed";
                snap.execution.push_ledger(LedgerEntry {
                        id: ledger_id,
                        kind,
                        handoff_id: receipt.handoff_id.clone(),
                        idempotency_key: receipt.proposal_id.clone(),
                        execution_id: receipt.execution_id.clone(),
                        status: receipt.status,
                        reason_code: receipt.reason_code.clone(),
                        day,
                        actual_snapshot_hash: receipt.snapshot_hash.clone(),
                        post_execution_snapshot_hash: receipt.world_state.post_execution_snapshot_hash.clone(),
                    });
                if clear_pending {
                    snap.execution.clear_pending(&receipt.handoff_id, &receipt.proposal_id);
                }
                if persist_receipt {
                    snap.execution.push_receipt(receipt);
                }
                Ok(())
            })?;
        Ok(())
    }

    fn sync_world_memory_from_snapshot(&self, _snapshot: &Snapshot) -> Result<()> {
        // No-op: this backend reads its projections directly from the same
        // snapshot it writes, so there is nothing separate to sync.
        Ok(())
    }

    fn list_chronicle_records(&self, limit: usize) -> Result<Vec<ChronicleEntry>> {
        let mut entries = self.store.get_snapshot().world.chronicle;
        entries.sort_by(|a, b| b.at.cmp(&a.at).then_with(|| b.id.cmp(&a.id)));
        entries.truncate(limit);
        Ok(entries)
    }

    fn list_history_records(&self, limit: usize) -> Result<Vec<ExecutionReceipt>> {
        let mut receipts: Vec<ExecutionReceipt> = self.store.get_snapshot().execution.history.iter().cloned().collect();
        receipts.sort_by(|a, b| b.decision_epoch.cmp(&a.decision_epoch).then_with(|| b.execution_id.cmp(&a.execution_id)));
        receipts.truncate(limit);
        Ok(receipts)
    }
}
