//! World Loop commit: applies one agent's planned intent inside a
//! `transact` call, authoritatively re-checking the per-agent budget, then
//! (only on success) derives the runtime side effect.

use crate::planning::PlannedIntent;
use crate::side_effect::{compute_side_effect, SideEffect};
use agentworld_core::{tick_at, to_iso, Result};
use agentworld_flow::derive_operation_id;
use agentworld_memory::{MemoryStore, TransactOptions};

/// Outcome of committing one agent's planned intent for a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The agent this outcome is for.
    pub agent: String,
    /// Whether the plan was applied to world state.
    pub applied: bool,
    /// Rejection reason, present when `applied` is `false`.
    pub reason: Option<String>,
    /// Runtime side effect to execute, present only when `applied` is
    /// `true`.
    pub side_effect: SideEffect,
}

const BUDGET_EXCEEDED: &str = "agent_budget_exceeded";

/// Commit `plan` for one tick, inside its own `transact` call.
///
/// The event id is `deriveOperationId([agent, tick, intent, target],
/// windowMs=1) + ":world_loop_intent"`: distinct per (agent, tick, intent,
/// target), so a retried commit for the same tick dedupes, while a
/// genuinely new plan on the next tick always gets a fresh id.
pub fn commit_intent(store: &MemoryStore, tick_number: u64, tick_ms: u64, max_events_per_agent_per_min: u32, plan: &PlannedIntent) -> Result<CommitOutcome> {
    let now = tick_at(tick_number, tick_ms);
    let now_ms = now.timestamp_millis().max(0) as u64;
    let target_part = plan.target.clone().unwrap_or_default();
    let tick_str = tick_number.to_string();
    let base_id = derive_operation_id(now_ms, 1, &[plan.agent.as_str(), tick_str.as_str(), plan.intent.as_str(), target_part.as_str()])?;
    let event_id = format!("{base_id}:world_loop_intent");

    if store.has_processed_event(&event_id) {
        return Ok(CommitOutcome {
                agent: plan.agent.clone(),
                applied: false,
                reason: Some("Duplicate operation ignored.".to_string()),
                side_effect: SideEffect::None,
            });
    }

    let agent_name = plan.agent.clone();
    let intent = plan.intent.clone();
    let target = plan.target.clone();
    let bucket = now.timestamp() / 60;

    let outcome = store.transact(TransactOptions::with_event_id(event_id.clone()), move |snap| {
            let record = snap.agent_mut(&agent_name);
            let state = &mut record.profile.world_intent;

            if state.budgets.minute_bucket == bucket && state.budgets.events_in_min >= max_events_per_agent_per_min {
                return Ok((false, Some(BUDGET_EXCEEDED.to_string())));
            }

            if state.budgets.minute_bucket == bucket {
                state.budgets.events_in_min += 1;
            } else {
                state.budgets.minute_bucket = bucket;
                state.budgets.events_in_min = 1;
            }

            state.intent = intent.clone();
            state.intent_target = target.clone();
            state.intent_set_at = Some(to_iso(now));
            state.last_action = Some(format!("scheduled:{intent}"));
            state.last_action_at = Some(to_iso(now));

            match &state.last_plan {
                Some((last_intent, last_target)) if *last_intent == intent && *last_target == target => {
                    state.repeat_count += 1;
                }
                _ => {
                    state.last_plan = Some((intent.clone(), target.clone()));
                    state.repeat_count = 1;
                }
            }

            Ok((true, None))
        })?;

    let (applied, reason) = outcome.result.unwrap_or((false, Some("Duplicate operation ignored.".to_string())));

    let side_effect = if applied {
        compute_side_effect(&plan.agent, tick_number, &event_id, &plan.intent, plan.target.as_deref())
    } else {
        SideEffect::None
    };

    Ok(CommitOutcome {
            agent: plan.agent.clone(),
            applied,
            reason,
            side_effect,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::PlanSource;
    use agentworld_memory::MemoryStoreConfig;
    use tempfile::tempdir;

    fn store_with_agent(name: &str) -> (tempfile::TempDir, MemoryStore) {
        let dir = tempdir().unwrap();
        let store = MemoryStore::open(dir.path().join("s.json"), MemoryStoreConfig::default());
        store
        .transact(TransactOptions::default(), |snap| {
                snap.agent_mut(name);
                Ok(())
            })
        .unwrap();
        (dir, store)
    }

    fn plan(agent: &str, intent: &str, target: Option<&str>) -> PlannedIntent {
        PlannedIntent {
            agent: agent.to_string(),
            intent: intent.to_string(),
            target: target.map(str::to_string),
            source: PlanSource::DeterministicPick,
        }
    }

    #[test]
    fn wander_commit_updates_intent_and_yields_side_effect() {
        let (_dir, store) = store_with_agent("mara");
        let outcome = commit_intent(&store, 1, 2000, 10, &plan("mara", "wander", None)).unwrap();
        assert!(outcome.applied);
        assert!(matches!(outcome.side_effect, SideEffect::Wander {.. }));
        let snap = store.get_snapshot();
        assert_eq!(snap.agents["mara"].profile.world_intent.intent, "wander");
        assert_eq!(snap.agents["mara"].profile.world_intent.repeat_count, 1);
    }

    #[test]
    fn repeated_identical_plan_increments_repeat_count() {
        let (_dir, store) = store_with_agent("mara");
        commit_intent(&store, 1, 2000, 10, &plan("mara", "idle", None)).unwrap();
        commit_intent(&store, 2, 2000, 10, &plan("mara", "idle", None)).unwrap();
        let snap = store.get_snapshot();
        assert_eq!(snap.agents["mara"].profile.world_intent.repeat_count, 2);
    }

    #[test]
    fn exhausted_budget_rejects_without_mutating_intent() {
        let (_dir, store) = store_with_agent("mara");
        for tick in 0..10u64 {
            let outcome = commit_intent(&store, tick, 10, 3, &plan("mara", "wander", None)).unwrap();
            if tick < 3 {
                assert!(outcome.applied, "tick {tick} should still be within budget");
            } else {
                assert!(!outcome.applied);
                assert_eq!(outcome.reason.as_deref(), Some(BUDGET_EXCEEDED));
            }
        }
    }

    #[test]
    fn same_tick_retry_is_idempotent() {
        let (_dir, store) = store_with_agent("mara");
        let p = plan("mara", "respond", None);
        let first = commit_intent(&store, 1, 2000, 10, &p).unwrap();
        let second = commit_intent(&store, 1, 2000, 10, &p).unwrap();
        assert!(first.applied);
        assert!(!second.applied);
        assert_eq!(store.get_snapshot().agents["mara"].profile.world_intent.repeat_count, 1);
    }
}
