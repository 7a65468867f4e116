//! The `execution` sub-document of the snapshot: terminal receipts,
//! the event ledger, and in-flight pending records. Owned here (rather
//! than in `agentworld-execution`) because it is part of the persisted
//! `Snapshot` shape that `agentworld-core` defines; the execution crate
//! reads and writes these types through the Memory Store.

use crate::limits::Limits;
use crate::ring::Ring;
use serde::{Deserialize, Serialize};

/// Terminal status of a processed handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// All authority commands succeeded.
    Executed,
    /// Preconditions failed, or a step failed with no prior success.
    Rejected,
    /// The handoff's freshness claim no longer matches the projection.
    Stale,
    /// A receipt already exists for this handoff or idempotency key.
    Duplicate,
    /// At least one step succeeded before a later step failed.
    Failed,
}

impl ExecutionStatus {
    /// `executed ⇒ accepted ∧ executed`.
    pub fn accepted(&self) -> bool {
        matches!(self, ExecutionStatus::Executed | ExecutionStatus::Failed)
    }

    /// only `executed` implies `executed = true`.
    pub fn executed(&self) -> bool {
        matches!(self, ExecutionStatus::Executed)
    }
}

/// A single precondition failure (step 3, scenario 4).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreconditionFailure {
    /// Short machine-readable failure kind (e.g. `"project_exists"`).
    pub kind: String,
    /// Human-readable detail (e.g. `"Unknown project: proj-x"`).
    pub detail: String,
}

/// Precondition evaluation outcome.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PreconditionCheck {
    /// Whether preconditions were evaluated at all.
    pub evaluated: bool,
    /// Whether all preconditions passed.
    pub passed: bool,
    /// Failures, if any.
    pub failures: Vec<PreconditionFailure>,
}

/// Freshness (stale) evaluation outcome.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaleCheck {
    /// Whether the stale check was evaluated.
    pub evaluated: bool,
    /// Whether the handoff's claimed freshness matched the projection.
    pub passed: bool,
    /// The snapshot hash the projection actually had.
    pub actual_snapshot_hash: String,
    /// The decision epoch the projection actually had.
    pub actual_decision_epoch: u64,
}

/// Duplicate evaluation outcome.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DuplicateCheck {
    /// Whether the duplicate check was evaluated.
    pub evaluated: bool,
    /// Whether a prior receipt for this identity was found.
    pub duplicate: bool,
    /// The execution id of the prior receipt, if any.
    pub duplicate_of: Option<String>,
}

/// Full evaluation record attached to a receipt.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Evaluation {
    /// Precondition evaluation.
    pub preconditions: PreconditionCheck,
    /// Freshness evaluation.
    pub stale_check: StaleCheck,
    /// Duplicate evaluation.
    pub duplicate_check: DuplicateCheck,
}

/// Post-execution world-state summary embedded in a receipt.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorldStateSummary {
    /// Projection hash after this handoff was applied (or the current
    /// projection, for non-executed outcomes).
    pub post_execution_snapshot_hash: String,
    /// Decision epoch after this handoff was applied.
    pub post_execution_decision_epoch: u64,
}

/// The terminal record of a handoff's processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReceipt {
    /// `hash256(stableStringify(self - {execution_id, result_id}))`.
    pub execution_id: String,
    /// Always equal to `execution_id`.
    pub result_id: String,
    /// The handoff id this receipt resolves.
    pub handoff_id: String,
    /// The proposal id (`== idempotencyKey`).
    pub proposal_id: String,
    /// The snapshot hash the handoff claimed as current.
    pub snapshot_hash: String,
    /// The decision epoch the handoff claimed as current.
    pub decision_epoch: u64,
    /// Acting agent id.
    pub actor_id: String,
    /// Target town id (post alias-normalization).
    pub town_id: String,
    /// Canonical proposal type.
    pub proposal_type: String,
    /// The original advisory command string.
    pub command: String,
    /// Authority commands translated from the proposal.
    pub authority_commands: Vec<String>,
    /// Terminal status.
    pub status: ExecutionStatus,
    /// `` cross-invariant field.
    pub accepted: bool,
    /// `` cross-invariant field.
    pub executed: bool,
    /// Machine-readable reason code.
    pub reason_code: String,
    /// Full evaluation trail.
    pub evaluation: Evaluation,
    /// Post-execution world-state summary.
    pub world_state: WorldStateSummary,
}

/// Bookkeeping for an in-flight handoff not yet terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRecord {
    /// Handoff id.
    pub handoff_id: String,
    /// Idempotency key.
    pub idempotency_key: String,
    /// Snapshot hash observed when the plan was prepared.
    pub prepared_snapshot_hash: String,
    /// Decision epoch observed when the plan was prepared.
    pub prepared_epoch: u64,
    /// Most recently observed snapshot hash.
    pub last_known_snapshot_hash: String,
    /// Most recently observed decision epoch.
    pub last_known_epoch: u64,
    /// Total authority commands this handoff will apply.
    pub total_command_count: u32,
    /// Authority commands applied so far.
    pub completed_command_count: u32,
    /// The last authority command string that was applied.
    pub last_applied_command: Option<String>,
}

/// One row per classified event in a handoff's lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// `"{execution_id}:{kind}"`.
    pub id: String,
    /// Event kind (`duplicate_replayed`, `stale`, `rejected`, `failed`,
    /// `executed`,...).
    pub kind: String,
    /// Handoff id.
    pub handoff_id: String,
    /// Idempotency key.
    pub idempotency_key: String,
    /// Execution id this row reports on.
    pub execution_id: String,
    /// Terminal status at the time this row was recorded.
    pub status: ExecutionStatus,
    /// Machine-readable reason code.
    pub reason_code: String,
    /// World-clock day this row was recorded on.
    pub day: u64,
    /// The snapshot hash actually observed.
    pub actual_snapshot_hash: String,
    /// The post-execution snapshot hash, if applicable.
    pub post_execution_snapshot_hash: String,
}

/// The execution sub-document embedded in the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionDocument {
    /// Terminal receipts, capped at 512.
    #[serde(default = "default_history")]
    pub history: Ring<ExecutionReceipt>,
    /// Per-kind event rows, capped at 1024.
    #[serde(default = "default_ledger")]
    pub event_ledger: Ring<LedgerEntry>,
    /// In-flight pending records, capped at 128.
    #[serde(default = "default_pending")]
    pub pending: Ring<PendingRecord>,
}

fn default_history() -> Ring<ExecutionReceipt> {
    Ring::new(Limits::default().cap_execution_history)
}
fn default_ledger() -> Ring<LedgerEntry> {
    Ring::new(Limits::default().cap_execution_ledger)
}
fn default_pending() -> Ring<PendingRecord> {
    Ring::new(Limits::default().cap_execution_pending)
}

impl Default for ExecutionDocument {
    fn default() -> Self {
        ExecutionDocument {
            history: default_history(),
            event_ledger: default_ledger(),
            pending: default_pending(),
        }
    }
}

impl ExecutionDocument {
    /// Find a receipt by handoff id or idempotency (proposal) key.
    pub fn find_receipt(&self, handoff_id: &str, idempotency_key: &str) -> Option<&ExecutionReceipt> {
        self.history
        .iter_rev()
        .find(|r| r.handoff_id == handoff_id || r.proposal_id == idempotency_key)
    }

    /// Append a receipt, evicting the oldest if at capacity (ring rule).
    pub fn push_receipt(&mut self, receipt: ExecutionReceipt) {
        self.history.push(receipt);
    }

    /// Append a ledger row keyed by `<executionId>:<kind>`. The memory
    /// backend appends on every call (duplicates for the same key are
    /// allowed to coexist); see `DESIGN.md` for why this differs from the
    /// SQL backend's `INSERT OR REPLACE`.
    pub fn push_ledger(&mut self, entry: LedgerEntry) {
        self.event_ledger.push(entry);
    }

    /// Stage a new pending record, superseding any existing one with the
    /// same identity.
    pub fn stage_pending(&mut self, record: PendingRecord) {
        self.pending.remove_where(|p| {
                p.handoff_id == record.handoff_id || p.idempotency_key == record.idempotency_key
            });
        self.pending.push(record);
    }

    /// Clear any pending record matching this identity.
    pub fn clear_pending(&mut self, handoff_id: &str, idempotency_key: &str) {
        self.pending
        .remove_where(|p| p.handoff_id == handoff_id || p.idempotency_key == idempotency_key);
    }

    /// All pending records (crash-recovery scan).
    pub fn list_pending(&self) -> Vec<&PendingRecord> {
        self.pending.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_receipt(execution_id: &str, handoff_id: &str) -> ExecutionReceipt {
        ExecutionReceipt {
            execution_id: execution_id.to_string(),
            result_id: execution_id.to_string(),
            handoff_id: handoff_id.to_string(),
            proposal_id: "proposal_1".to_string(),
            snapshot_hash: "hash".to_string(),
            decision_epoch: 1,
            actor_id: "actor".to_string(),
            town_id: "town".to_string(),
            proposal_type: "PROJECT_ADVANCE".to_string(),
            command: "cmd".to_string(),
            authority_commands: vec![],
            status: ExecutionStatus::Executed,
            accepted: true,
            executed: true,
            reason_code: "EXECUTED".to_string(),
            evaluation: Evaluation::default(),
            world_state: WorldStateSummary::default(),
        }
    }

    #[test]
    fn find_receipt_matches_handoff_or_idempotency_key() {
        let mut doc = ExecutionDocument::default();
        doc.push_receipt(sample_receipt("exec_1", "handoff_1"));
        assert!(doc.find_receipt("handoff_1", "nope").is_some());
        assert!(doc.find_receipt("nope", "proposal_1").is_some());
        assert!(doc.find_receipt("nope", "nope").is_none());
    }

    #[test]
    fn staging_pending_supersedes_prior_entry_for_same_identity() {
        let mut doc = ExecutionDocument::default();
        doc.stage_pending(PendingRecord {
                handoff_id: "h1".into(),
                idempotency_key: "k1".into(),
                prepared_snapshot_hash: "a".into(),
                prepared_epoch: 1,
                last_known_snapshot_hash: "a".into(),
                last_known_epoch: 1,
                total_command_count: 2,
                completed_command_count: 0,
                last_applied_command: None,
            });
        doc.stage_pending(PendingRecord {
                handoff_id: "h1".into(),
                idempotency_key: "k1".into(),
                prepared_snapshot_hash: "b".into(),
                prepared_epoch: 2,
                last_known_snapshot_hash: "b".into(),
                last_known_epoch: 2,
                total_command_count: 2,
                completed_command_count: 1,
                last_applied_command: Some("step1".into()),
            });
        assert_eq!(doc.pending.len(), 1);
        assert_eq!(doc.list_pending()[0].completed_command_count, 1);
    }

    #[test]
    fn ring_cap_bounds_history() {
        let mut doc = ExecutionDocument::default();
        for i in 0..600 {
            doc.push_receipt(sample_receipt(&format!("exec_{i}"), &format!("h_{i}")));
        }
        assert_eq!(doc.history.len(), 512);
    }
}
