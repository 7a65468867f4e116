//! Execution result wire envelope: maps the internal, snake_case
//! `ExecutionReceipt` onto the camelCase stdout line external collaborators
//! read. Unlike `WorldMemoryContext`, `ExecutionReceipt` carries no
//! `#[serde(rename_all)]` of its own — it is an internal record shared
//! with the hashing/ledger code in `agentworld-execution`, which needs its
//! field names stable — so this mapping is written out field by field
//! rather than derived.

use agentworld_core::ExecutionReceipt;
use serde_json::{json, Value};

/// Build the `execution-result.v1` stdout line for `receipt`.
///
/// `idempotencyKey` has no counterpart field on `ExecutionReceipt`; it is
/// always equal to `proposalId`.
pub fn execution_result_line(receipt: &ExecutionReceipt) -> Value {
    json!({
            "type": "execution-result.v1",
            "schemaVersion": 1,
            "executionId": receipt.execution_id,
            "resultId": receipt.result_id,
            "handoffId": receipt.handoff_id,
            "proposalId": receipt.proposal_id,
            "idempotencyKey": receipt.proposal_id,
            "snapshotHash": receipt.snapshot_hash,
            "decisionEpoch": receipt.decision_epoch,
            "actorId": receipt.actor_id,
            "townId": receipt.town_id,
            "proposalType": receipt.proposal_type,
            "command": receipt.command,
            "authorityCommands": receipt.authority_commands,
            "status": receipt.status,
            "accepted": receipt.accepted,
            "executed": receipt.executed,
            "reasonCode": receipt.reason_code,
            "evaluation": {
                "preconditions": {
                    "evaluated": receipt.evaluation.preconditions.evaluated,
                    "passed": receipt.evaluation.preconditions.passed,
                    "failures": receipt.evaluation.preconditions.failures,
                },
                "staleCheck": {
                    "evaluated": receipt.evaluation.stale_check.evaluated,
                    "passed": receipt.evaluation.stale_check.passed,
                    "actualSnapshotHash": receipt.evaluation.stale_check.actual_snapshot_hash,
                    "actualDecisionEpoch": receipt.evaluation.stale_check.actual_decision_epoch,
                },
                "duplicateCheck": {
                    "evaluated": receipt.evaluation.duplicate_check.evaluated,
                    "duplicate": receipt.evaluation.duplicate_check.duplicate,
                    "duplicateOf": receipt.evaluation.duplicate_check.duplicate_of,
                },
            },
            "worldState": {
                "postExecutionSnapshotHash": receipt.world_state.post_execution_snapshot_hash,
                "postExecutionDecisionEpoch": receipt.world_state.post_execution_decision_epoch,
            },
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentworld_core::{DuplicateCheck, Evaluation, ExecutionStatus, PreconditionCheck, StaleCheck, WorldStateSummary};

    fn sample_receipt() -> ExecutionReceipt {
        ExecutionReceipt {
            execution_id: "result_abc".to_string(),
            result_id: "result_abc".to_string(),
            handoff_id: "handoff_1".to_string(),
            proposal_id: "proposal_1".to_string(),
            snapshot_hash: "hash".to_string(),
            decision_epoch: 3,
            actor_id: "mara".to_string(),
            town_id: "riverbend".to_string(),
            proposal_type: "PROJECT_ADVANCE".to_string(),
            command: "advance the granary project".to_string(),
            authority_commands: vec!["project advance riverbend granary".to_string()],
            status: ExecutionStatus::Executed,
            accepted: true,
            executed: true,
            reason_code: "EXECUTED".to_string(),
            evaluation: Evaluation {
                preconditions: PreconditionCheck {
                    evaluated: true,
                    passed: true,
                    failures: Vec::new(),
                },
                stale_check: StaleCheck {
                    evaluated: true,
                    passed: true,
                    actual_snapshot_hash: "hash".to_string(),
                    actual_decision_epoch: 3,
                },
                duplicate_check: DuplicateCheck {
                    evaluated: true,
                    duplicate: false,
                    duplicate_of: None,
                },
            },
            world_state: WorldStateSummary {
                post_execution_snapshot_hash: "hash2".to_string(),
                post_execution_decision_epoch: 3,
            },
        }
    }

    #[test]
    fn idempotency_key_mirrors_proposal_id() {
        let line = execution_result_line(&sample_receipt());
        assert_eq!(line["idempotencyKey"], line["proposalId"]);
    }

    #[test]
    fn nested_checks_use_camel_case_keys() {
        let line = execution_result_line(&sample_receipt());
        assert_eq!(line["evaluation"]["staleCheck"]["actualSnapshotHash"], "hash");
        assert_eq!(line["worldState"]["postExecutionSnapshotHash"], "hash2");
    }

    #[test]
    fn status_serializes_lowercase() {
        let line = execution_result_line(&sample_receipt());
        assert_eq!(line["status"], "executed");
    }
}
