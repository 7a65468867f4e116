//! Execution result identity: the result envelope's id is a
//! hash of its own fields, excluding the id fields themselves.

use agentworld_core::{hash256_of, ExecutionReceipt};
use serde_json::{json, Value};

fn identity_payload(receipt: &ExecutionReceipt) -> Value {
    json!({
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
            "evaluation": receipt.evaluation,
            "worldState": receipt.world_state,
        })
}

/// Compute `"result_" + hash256(stableStringify(receipt - {executionId, resultId}))`.
pub fn compute_execution_id(receipt: &ExecutionReceipt) -> String {
    let hash = hash256_of(&identity_payload(receipt)).expect("receipt identity payload is always serializable");
    format!("result_{hash}")
}

/// Stamp `execution_id`/`result_id` onto a receipt whose other fields are
/// already final.
pub fn finalize_receipt(mut receipt: ExecutionReceipt) -> ExecutionReceipt {
    let id = compute_execution_id(&receipt);
    receipt.execution_id = id.clone();
    receipt.result_id = id;
    receipt
}

/// Recompute and verify `receipt.execution_id` (`isValidExecutionResult`).
pub fn is_valid_execution_result(receipt: &ExecutionReceipt) -> bool {
    receipt.execution_id == compute_execution_id(receipt) && receipt.result_id == receipt.execution_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentworld_core::{Evaluation, ExecutionStatus, WorldStateSummary};

    fn sample() -> ExecutionReceipt {
        ExecutionReceipt {
            execution_id: String::new(),
            result_id: String::new(),
            handoff_id: "handoff_1".to_string(),
            proposal_id: "proposal_1".to_string(),
            snapshot_hash: "hash".to_string(),
            decision_epoch: 1,
            actor_id: "mara".to_string(),
            town_id: "riverbend".to_string(),
            proposal_type: "PROJECT_ADVANCE".to_string(),
            command: "advance".to_string(),
            authority_commands: vec!["project advance riverbend granary".to_string()],
            status: ExecutionStatus::Executed,
            accepted: true,
            executed: true,
            reason_code: "EXECUTED".to_string(),
            evaluation: Evaluation::default(),
            world_state: WorldStateSummary::default(),
        }
    }

    #[test]
    fn finalize_then_validate_round_trips() {
        let receipt = finalize_receipt(sample());
        assert!(receipt.execution_id.starts_with("result_"));
        assert_eq!(receipt.execution_id, receipt.result_id);
        assert!(is_valid_execution_result(&receipt));
    }

    #[test]
    fn identity_is_stable_for_equal_payloads() {
        let a = finalize_receipt(sample());
        let b = finalize_receipt(sample());
        assert_eq!(a.execution_id, b.execution_id);
    }

    #[test]
    fn identity_changes_when_a_field_changes() {
        let a = finalize_receipt(sample());
        let mut other = sample();
        other.town_id = "lowmarsh".to_string();
        let b = finalize_receipt(other);
        assert_ne!(a.execution_id, b.execution_id);
    }

    #[test]
    fn tampered_execution_id_fails_validation() {
        let mut receipt = finalize_receipt(sample());
        receipt.execution_id = "result_tampered".to_string();
        assert!(!is_valid_execution_result(&receipt));
    }
}
