//! Execution Adapter: the decision pipeline that turns a validated
//! handoff into a terminal `ExecutionReceipt`, a single pass with no
//! retries.

use crate::handoff::Handoff;
use crate::projection::{create_world_state_from_projection, project_snapshot};
use crate::reason_code::classify_reason;
use crate::result::finalize_receipt;
use crate::store::ExecutionStore;
use crate::translation::{translate, TownAliasMap};
use agentworld_core::{
    DuplicateCheck, Evaluation, ExecutionReceipt, ExecutionStatus, PendingRecord, PreconditionCheck, Result,
    StaleCheck, WorldStateSummary,
};
use agentworld_memory::MemoryStore;
use agentworld_turn::{GodCommandRequest, GodCommandService};

fn base_evaluation() -> Evaluation {
    Evaluation::default()
}

fn receipt_skeleton(handoff: &Handoff, status: ExecutionStatus, reason_code: &str) -> ExecutionReceipt {
    ExecutionReceipt {
        execution_id: String::new(),
        result_id: String::new(),
        handoff_id: handoff.handoff_id.clone(),
        proposal_id: handoff.proposal_id.clone(),
        snapshot_hash: handoff.snapshot_hash.clone(),
        decision_epoch: handoff.decision_epoch,
        actor_id: handoff.proposal.actor_id.clone(),
        town_id: handoff.proposal.town_id.clone(),
        proposal_type: handoff.proposal.proposal_type.clone(),
        command: handoff.command.clone(),
        authority_commands: Vec::new(),
        status,
        accepted: status.accepted(),
        executed: status.executed(),
        reason_code: reason_code.to_string(),
        evaluation: base_evaluation(),
        world_state: WorldStateSummary::default(),
    }
}

/// Run the full decision pipeline for one handoff against the given
/// store, execution store, god service, and town alias map.
pub fn apply_handoff(
    memory: &MemoryStore,
    execution_store: &dyn ExecutionStore,
    god_service: &dyn GodCommandService,
    handoff: &Handoff,
    alias_map: &TownAliasMap,
) -> Result<ExecutionReceipt> {
    // Step 1: duplicate.
    if let Some(existing) = execution_store.find_receipt(&handoff.handoff_id, &handoff.proposal_id)? {
        let mut receipt = receipt_skeleton(&handoff, ExecutionStatus::Duplicate, "DUPLICATE_HANDOFF");
        receipt.evaluation.duplicate_check = DuplicateCheck {
            evaluated: true,
            duplicate: true,
            duplicate_of: Some(existing.execution_id.clone()),
        };
        let receipt = finalize_receipt(receipt);
        execution_store.record_result(receipt.clone(), "duplicate_replayed", false)?;
        return Ok(receipt);
    }

    let snap = memory.get_snapshot();
    let projection = project_snapshot(&snap)?;

    // Step 2: stale.
    if projection.decision_epoch != handoff.decision_epoch {
        return emit_stale(execution_store, handoff, &projection, "STALE_DECISION_EPOCH");
    }
    if projection.snapshot_hash != handoff.snapshot_hash {
        return emit_stale(execution_store, handoff, &projection, "STALE_SNAPSHOT_HASH");
    }

    // Step 3: preconditions / translation.
    let translation = translate(&snap, &handoff.proposal, alias_map);
    if !translation.failures.is_empty() {
        let mut receipt = receipt_skeleton(&handoff, ExecutionStatus::Rejected, "PRECONDITION_FAILED");
        receipt.town_id = translation.normalized_town_id;
        receipt.evaluation.preconditions = PreconditionCheck {
            evaluated: true,
            passed: false,
            failures: translation.failures,
        };
        receipt.world_state = create_world_state_from_projection(&projection);
        let receipt = finalize_receipt(receipt);
        execution_store.record_result(receipt.clone(), "rejected", true)?;
        return Ok(receipt);
    }

    execution_store.stage_pending_execution(PendingRecord {
            handoff_id: handoff.handoff_id.clone(),
            idempotency_key: handoff.proposal_id.clone(),
            prepared_snapshot_hash: projection.snapshot_hash.clone(),
            prepared_epoch: projection.decision_epoch,
            last_known_snapshot_hash: projection.snapshot_hash.clone(),
            last_known_epoch: projection.decision_epoch,
            total_command_count: translation.authority_commands.len() as u32,
            completed_command_count: 0,
            last_applied_command: None,
        })?;

    // Step 4: apply, in order.
    let mut completed = 0u32;
    for (k, command) in translation.authority_commands.iter().enumerate() {
        let operation_id = format!("{}:step:{}", handoff.handoff_id, k);
        let outcome = god_service.apply_god_command(
            memory,
            GodCommandRequest {
                agents: vec![handoff.proposal.actor_id.clone()],
                command: command.clone(),
                operation_id,
            },
        )?;

        if !outcome.applied {
            let reason = outcome.reason.unwrap_or_else(|| "ENGINE_REJECTED".to_string());
            let code = classify_reason(&reason);

            if code == "DUPLICATE_HANDOFF" {
                let projection_now = project_snapshot(&memory.get_snapshot())?;
                let mut receipt = receipt_skeleton(&handoff, ExecutionStatus::Duplicate, "DUPLICATE_HANDOFF");
                receipt.town_id = translation.normalized_town_id.clone();
                receipt.authority_commands = translation.authority_commands.clone();
                receipt.evaluation.duplicate_check = DuplicateCheck {
                    evaluated: true,
                    duplicate: true,
                    duplicate_of: None,
                };
                receipt.world_state = create_world_state_from_projection(&projection_now);
                let receipt = finalize_receipt(receipt);
                execution_store.record_result(receipt.clone(), "duplicate_replayed", false)?;
                execution_store.clear_pending_execution(&handoff.handoff_id, &handoff.proposal_id)?;
                return Ok(receipt);
            }

            let status = if completed > 0 { ExecutionStatus::Failed } else { ExecutionStatus::Rejected };
            let projection_now = project_snapshot(&memory.get_snapshot())?;
            let mut receipt = receipt_skeleton(&handoff, status, &code);
            receipt.town_id = translation.normalized_town_id.clone();
            receipt.authority_commands = translation.authority_commands.clone();
            receipt.world_state = create_world_state_from_projection(&projection_now);
            let kind = if status == ExecutionStatus::Failed { "failed" } else { "rejected" };
            let receipt = finalize_receipt(receipt);
            execution_store.record_result(receipt.clone(), kind, true)?;
            return Ok(receipt);
        }

        completed += 1;
        execution_store.mark_pending_execution_progress(
            &handoff.handoff_id,
            &handoff.proposal_id,
            completed,
            Some(command.clone()),
            projection.snapshot_hash.clone(),
            projection.decision_epoch,
        )?;
    }

    // Step 5: commit.
    let after = project_snapshot(&memory.get_snapshot())?;
    let mut receipt = receipt_skeleton(&handoff, ExecutionStatus::Executed, "EXECUTED");
    receipt.town_id = translation.normalized_town_id;
    receipt.authority_commands = translation.authority_commands;
    receipt.evaluation.preconditions = PreconditionCheck {
        evaluated: true,
        passed: true,
        failures: Vec::new(),
    };
    receipt.evaluation.stale_check = StaleCheck {
        evaluated: true,
        passed: true,
        actual_snapshot_hash: projection.snapshot_hash.clone(),
        actual_decision_epoch: projection.decision_epoch,
    };
    receipt.evaluation.duplicate_check = DuplicateCheck {
        evaluated: true,
        duplicate: false,
        duplicate_of: None,
    };
    receipt.world_state = create_world_state_from_projection(&after);
    let receipt = finalize_receipt(receipt);
    execution_store.record_result(receipt.clone(), "executed", true)?;
    Ok(receipt)
}

fn emit_stale(
    execution_store: &dyn ExecutionStore,
    handoff: &Handoff,
    projection: &crate::projection::Projection,
    reason_code: &str,
) -> Result<ExecutionReceipt> {
    let mut receipt = receipt_skeleton(handoff, ExecutionStatus::Stale, reason_code);
    receipt.evaluation.stale_check = StaleCheck {
        evaluated: true,
        passed: false,
        actual_snapshot_hash: projection.snapshot_hash.clone(),
        actual_decision_epoch: projection.decision_epoch,
    };
    receipt.world_state = create_world_state_from_projection(projection);
    let receipt = finalize_receipt(receipt);
    execution_store.record_result(receipt.clone(), "stale", true)?;
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::validate;
    use crate::store::MemoryExecutionStore;
    use agentworld_core::{hash256_of, ProjectState, TownState};
    use agentworld_memory::MemoryStoreConfig;
    use agentworld_turn::ReferenceGodCommandService;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn memory_with_riverbend() -> (tempfile::TempDir, Arc<MemoryStore>) {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryStore::open(dir.path().join("s.json"), MemoryStoreConfig::default()));
        store
        .transact(Default::default(), |snap| {
                let mut town = TownState {
                    id: "riverbend".to_string(),
                    ..Default::default()
                };
                town.projects.insert(
                    "granary".to_string(),
                    ProjectState {
                        id: "granary".to_string(),
                        progress: 0,
                    },
                );
                snap.world.towns.insert("riverbend".to_string(), town);
                Ok(())
            })
        .unwrap();
        (dir, store)
    }

    fn handoff_for(snap_hash: &str, epoch: u64) -> crate::handoff::Handoff {
        let raw = json!({
                "schemaVersion": "execution-handoff.v1",
                "advisory": true,
                "handoffId": format!("handoff_{}", "a".repeat(64)),
                "proposalId": format!("proposal_{}", "b".repeat(64)),
                "idempotencyKey": format!("proposal_{}", "b".repeat(64)),
                "snapshotHash": snap_hash,
                "decisionEpoch": epoch,
                "command": "advance the granary project",
                "proposal": {"type":"PROJECT_ADVANCE","actorId":"mara","townId":"riverbend","args":{"projectId":"granary"}},
                "executionRequirements": {"expectedSnapshotHash": snap_hash, "expectedDecisionEpoch": epoch, "preconditions": []},
            });
        validate(&raw).unwrap()
    }

    #[test]
    fn fresh_valid_handoff_executes() {
        let (_dir, memory) = memory_with_riverbend();
        let exec_store = MemoryExecutionStore::new(memory.clone());
        let god = ReferenceGodCommandService;
        let snap = memory.get_snapshot();
        let hash = hash256_of(&snap.world).unwrap();
        let handoff = handoff_for(&hash, snap.world.decision_epoch);

        let receipt = apply_handoff(&memory, &exec_store, &god, &handoff, &TownAliasMap::new()).unwrap();
        assert_eq!(receipt.status, ExecutionStatus::Executed);
        assert!(receipt.accepted && receipt.executed);
        assert_eq!(memory.get_snapshot().world.towns["riverbend"].projects["granary"].progress, 1);
    }

    #[test]
    fn stale_epoch_is_rejected_without_mutation() {
        let (_dir, memory) = memory_with_riverbend();
        let exec_store = MemoryExecutionStore::new(memory.clone());
        let god = ReferenceGodCommandService;
        let snap = memory.get_snapshot();
        let hash = hash256_of(&snap.world).unwrap();
        let handoff = handoff_for(&hash, snap.world.decision_epoch + 1);

        let receipt = apply_handoff(&memory, &exec_store, &god, &handoff, &TownAliasMap::new()).unwrap();
        assert_eq!(receipt.status, ExecutionStatus::Stale);
        assert_eq!(receipt.reason_code, "STALE_DECISION_EPOCH");
        assert_eq!(memory.get_snapshot().world.towns["riverbend"].projects["granary"].progress, 0);
    }

    #[test]
    fn unknown_project_is_rejected_with_precondition_failure() {
        let (_dir, memory) = memory_with_riverbend();
        let exec_store = MemoryExecutionStore::new(memory.clone());
        let god = ReferenceGodCommandService;
        let snap = memory.get_snapshot();
        let hash = hash256_of(&snap.world).unwrap();
        let raw = json!({
                "schemaVersion": "execution-handoff.v1",
                "advisory": true,
                "handoffId": format!("handoff_{}", "c".repeat(64)),
                "proposalId": format!("proposal_{}", "d".repeat(64)),
                "idempotencyKey": format!("proposal_{}", "d".repeat(64)),
                "snapshotHash": hash,
                "decisionEpoch": snap.world.decision_epoch,
                "command": "advance a phantom project",
                "proposal": {"type":"PROJECT_ADVANCE","actorId":"mara","townId":"riverbend","args":{"projectId":"phantom"}},
                "executionRequirements": {},
            });
        let handoff = validate(&raw).unwrap();
        let receipt = apply_handoff(&memory, &exec_store, &god, &handoff, &TownAliasMap::new()).unwrap();
        assert_eq!(receipt.status, ExecutionStatus::Rejected);
        assert_eq!(receipt.reason_code, "PRECONDITION_FAILED");
    }

    #[test]
    fn resubmitting_an_executed_handoff_is_duplicate_and_does_not_mutate_again() {
        let (_dir, memory) = memory_with_riverbend();
        let exec_store = MemoryExecutionStore::new(memory.clone());
        let god = ReferenceGodCommandService;
        let snap = memory.get_snapshot();
        let hash = hash256_of(&snap.world).unwrap();
        let handoff = handoff_for(&hash, snap.world.decision_epoch);

        let first = apply_handoff(&memory, &exec_store, &god, &handoff, &TownAliasMap::new()).unwrap();
        assert_eq!(first.status, ExecutionStatus::Executed);

        let second = apply_handoff(&memory, &exec_store, &god, &handoff, &TownAliasMap::new()).unwrap();
        assert_eq!(second.status, ExecutionStatus::Duplicate);
        assert_eq!(second.evaluation.duplicate_check.duplicate_of.as_deref(), Some(first.execution_id.as_str()));
        assert_eq!(memory.get_snapshot().world.towns["riverbend"].projects["granary"].progress, 1);
        assert_eq!(memory.get_snapshot().execution.history.len(), 1);
    }
}
