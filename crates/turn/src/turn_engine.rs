//! Turn Engine: records incoming utterances and applies sanitized
//! turns to agent state and world state, each step behind its own
//! `transact` call so a crash mid-turn leaves only fully-applied prefixes.

use crate::action_engine::{apply_actions, ActingAgent, ActionOutcome, ApplyActionsInput};
use crate::turn_guard::{sanitize, MemoryScope, SanitizedTurn};
use agentworld_core::Result;
use agentworld_memory::{MemoryStore, TransactOptions};

/// Carrier the caller's profile mutator operates on; the engine clamps and
/// writes the result back (step 3).
#[derive(Debug, Clone)]
pub struct ProfileCarrier {
    /// Trust, clamped to `[0, 10]` after the mutator runs.
    pub trust: i32,
    /// Free-form mood label.
    pub mood: String,
    /// Free-form behavioral flags.
    pub flags: Vec<String>,
}

/// Result of `apply_turn`.
#[derive(Debug, Clone)]
pub struct ApplyTurnResult {
    /// `true` if `operation_id` was already processed; in that case `turn`
    /// is the caller's fallback and `outcomes` is empty.
    pub skipped: bool,
    /// The sanitized (or fallback) turn.
    pub turn: SanitizedTurn,
    /// Action Engine outcomes, one per proposed action.
    pub outcomes: Vec<ActionOutcome>,
    /// Whether the player is alive after this turn.
    pub player_alive: bool,
}

/// Record an incoming player utterance into agent, faction, and world
/// memory (`recordIncoming`).
pub fn record_incoming(
    store: &MemoryStore,
    agent: &ActingAgent,
    player_name: Option<&str>,
    message: &str,
    operation_id: &str,
) -> Result<()> {
    let base_event_id = format!("{operation_id}:incoming");
    let text = match player_name {
        Some(name) => format!("{name}: {message}"),
        None => message.to_string(),
    };
    store.remember_agent(&agent.name, &text, false, &base_event_id)?;
    store.remember_faction(&agent.faction, &text, false, &base_event_id)?;
    store.remember_world(&text, false, &base_event_id)?;
    Ok(())
}

/// Sanitize and apply a raw turn (`applyTurn`).
pub fn apply_turn(
    store: &MemoryStore,
    agent: &ActingAgent,
    raw_turn: &serde_json::Value,
    fallback_turn: &SanitizedTurn,
    operation_id: &str,
    profile_mutator: impl FnOnce(&SanitizedTurn, &mut ProfileCarrier),
) -> Result<ApplyTurnResult> {
    let turn_applied_event_id = format!("{operation_id}:turn_applied");
    if store.has_processed_event(&turn_applied_event_id) {
        return Ok(ApplyTurnResult {
                skipped: true,
                turn: fallback_turn.clone(),
                outcomes: Vec::new(),
                player_alive: store.get_snapshot().world.player.alive,
            });
    }

    let turn = sanitize(raw_turn, fallback_turn);

    // Step 3: materialize/mutate the agent's profile.
    let agent_state_event_id = format!("{operation_id}:agent_state");
    let agent_name = agent.name.clone();
    let turn_for_profile = turn.clone();
    store.transact(TransactOptions::with_event_id(agent_state_event_id), move |snap| {
            let record = snap.agent_mut(&agent_name);
            let mut carrier = ProfileCarrier {
                trust: record.profile.trust,
                mood: record.profile.mood.clone(),
                flags: record.profile.flags.clone(),
            };
            profile_mutator(&turn_for_profile, &mut carrier);
            record.profile.trust = carrier.trust.clamp(0, 10);
            record.profile.mood = carrier.mood;
            record.profile.flags = carrier.flags;
            Ok(())
        })?;

    // Step 4: memory writes.
    for (i, write) in turn.memory_writes.iter().enumerate() {
        let important = write.importance >= 7;
        let event_id = format!("{operation_id}:memory_write:{i}");
        match write.scope {
            MemoryScope::Agent => {
                store.remember_agent(&agent.name, &write.text, important, &event_id)?;
            }
            MemoryScope::Faction => {
                store.remember_faction(&agent.faction, &write.text, important, &event_id)?;
            }
            MemoryScope::World => {
                store.remember_world(&write.text, important, &event_id)?;
            }
        }
    }

    // Step 5: run the Action Engine and record accepted outcomes.
    let outcomes = apply_actions(
        store,
        ApplyActionsInput {
            agent: agent.clone(),
            proposed_actions: turn.proposed_actions.clone(),
            operation_id: format!("{operation_id}:actions"),
        },
    )?;
    for (i, outcome) in outcomes.iter().enumerate() {
        if outcome.accepted {
            let event_id = format!("{operation_id}:outcome:{i}");
            let text = format!("[ACTION] {:?} by {}", outcome.action_type, agent.name);
            store.remember_faction(&agent.faction, &text, false, &event_id)?;
        }
    }

    // Step 6: mark the turn processed.
    store.transact(TransactOptions::with_event_id(turn_applied_event_id), |_snap| Ok(()))?;

    Ok(ApplyTurnResult {
            skipped: false,
            player_alive: store.get_snapshot().world.player.alive,
            turn,
            outcomes,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentworld_memory::MemoryStoreConfig;
    use serde_json::json;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, MemoryStore) {
        let dir = tempdir().unwrap();
        let store = MemoryStore::open(dir.path().join("snapshot.json"), MemoryStoreConfig::default());
        (dir, store)
    }

    fn agent() -> ActingAgent {
        ActingAgent {
            name: "mara".into(),
            faction: "iron_pact".into(),
        }
    }

    #[test]
    fn record_incoming_writes_three_memories() {
        let (_dir, store) = store();
        record_incoming(&store, &agent(), Some("Player"), "hello there", "op1").unwrap();
        let (_, agent_archive) = store.recall_agent("mara");
        let (_, faction_archive) = store.recall_faction("iron_pact");
        let world_archive = store.recall_world();
        assert_eq!(agent_archive.len(), 1);
        assert_eq!(faction_archive.len(), 1);
        assert_eq!(world_archive.len(), 1);
    }

    #[test]
    fn apply_turn_applies_profile_memory_and_actions() {
        let (_dir, store) = store();
        let raw = json!({
                "say": "I have news.",
                "tone": "wary",
                "trust_delta": 1,
                "memory_writes": [{"scope":"agent","text":"a secret","importance":8}],
                "proposed_actions": [{"type":"recruit","target":"iron_pact","confidence":0.8,"reason":"loyal"}],
            });
        let result = apply_turn(&store, &agent(), &raw, &SanitizedTurn::fallback(), "op1", |turn, carrier| {
                carrier.trust += turn.trust_delta;
            })
        .unwrap();
        assert!(!result.skipped);
        assert!(result.player_alive);
        assert_eq!(result.outcomes.len(), 1);
        assert!(result.outcomes[0].accepted);
        assert_eq!(store.get_snapshot().agents["mara"].profile.trust, 1);
        let (_, agent_archive) = store.recall_agent("mara");
        assert_eq!(agent_archive.len(), 1, "memory_write should have been archived as important");
    }

    #[test]
    fn repeated_operation_id_is_idempotent() {
        let (_dir, store) = store();
        let raw = json!({"say": "hi", "tone": "calm"});
        let first = apply_turn(&store, &agent(), &raw, &SanitizedTurn::fallback(), "op1", |_, _| {}).unwrap();
        let snapshot_after_first = store.get_snapshot();
        let second = apply_turn(&store, &agent(), &raw, &SanitizedTurn::fallback(), "op1", |_, _| {}).unwrap();
        assert!(!first.skipped);
        assert!(second.skipped);
        let snapshot_after_second = store.get_snapshot();
        assert_eq!(
            serde_json::to_string(&snapshot_after_first).unwrap(),
            serde_json::to_string(&snapshot_after_second).unwrap()
        );
    }
}
