//! Action Engine: applies sanitized proposed actions to world state
//! inside one `transact` call, with fixed numeric deltas per action kind
//! and deterministic archive timestamps.

use crate::turn_guard::{ActionType, ProposedAction};
use agentworld_core::{archive_timestamp, clamp_i32, to_iso, ArchiveEntry, Result};
use agentworld_memory::{MemoryStore, TransactOptions};
use serde::Serialize;

/// Identifies the acting agent for `apply_actions`.
#[derive(Debug, Clone)]
pub struct ActingAgent {
    /// Agent name.
    pub name: String,
    /// Agent's faction.
    pub faction: String,
}

/// Input to `apply_actions`.
#[derive(Debug, Clone)]
pub struct ApplyActionsInput {
    /// The acting agent.
    pub agent: ActingAgent,
    /// Sanitized proposed actions (already capped/validated by the Turn
    /// Guard).
    pub proposed_actions: Vec<ProposedAction>,
    /// The caller's base operation id; the actual event id is
    /// `<operationId>:apply_actions`.
    pub operation_id: String,
}

/// Per-action outcome of `apply_actions`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActionOutcome {
    /// Which action this outcome is for.
    pub action_type: ActionType,
    /// Whether the action's effects were applied.
    pub accepted: bool,
    /// Rejection reason, if not accepted.
    pub reason: Option<String>,
    /// A human-readable label for special outcomes (e.g. `"player_killed"`).
    pub outcome: Option<String>,
}

const DUPLICATE_REASON: &str = "Duplicate operation ignored.";

/// Apply `input.proposed_actions` to world state inside one transaction.
pub fn apply_actions(store: &MemoryStore, input: ApplyActionsInput) -> Result<Vec<ActionOutcome>> {
    let event_id = format!("{}:apply_actions", input.operation_id);

    if store.has_processed_event(&event_id) {
        return Ok(duplicate_outcomes(&input.proposed_actions));
    }

    let agent_name = input.agent.name.clone();
    let faction_name = input.agent.faction.clone();
    let op_id = input.operation_id.clone();
    let actions = input.proposed_actions.clone();

    let outcome = store.transact(TransactOptions::with_event_id(event_id), move |snap| {
            let day = snap.world.clock.day;
            let processed_count = snap.processed_event_ids.len();
            let mut subseq: u32 = 0;
            let mut results = Vec::with_capacity(actions.len());

            for action in &actions {
                let mut archive_line: Option<(String, bool)> = None;
                let (accepted, reason, outcome_label) = match action.action_type {
                    ActionType::None => (false, Some("No action proposed.".to_string()), None),
                    ActionType::SpreadRumor => {
                        snap.world.player.legitimacy = clamp_i32(snap.world.player.legitimacy - 2, 0, 100);
                        let faction = snap.world.factions.entry(faction_name.clone()).or_default();
                        faction.hostility_to_player = clamp_i32(faction.hostility_to_player + 3, 0, 100);
                        archive_line = Some((
                                format!("[RUMOR] {} spread a rumor: {}", agent_name, action.reason),
                                false,
                            ));
                        (true, None, None)
                    }
                    ActionType::CallMeeting => {
                        let faction = snap.world.factions.entry(faction_name.clone()).or_default();
                        faction.stability = clamp_i32(faction.stability - 2, 0, 100);
                        archive_line = Some((
                                format!("[MEETING] {} called a meeting: {}", agent_name, action.reason),
                                false,
                            ));
                        (true, None, None)
                    }
                    ActionType::Recruit => {
                        let faction = snap.world.factions.entry(faction_name.clone()).or_default();
                        faction.stability = clamp_i32(faction.stability + 1, 0, 100);
                        (true, None, None)
                    }
                    ActionType::DesertFaction => {
                        let faction = snap.world.factions.entry(faction_name.clone()).or_default();
                        faction.stability = clamp_i32(faction.stability - 6, 0, 100);
                        archive_line = Some((
                                format!("[SPLINTER] {} deserted {}: {}", agent_name, faction_name, action.reason),
                                false,
                            ));
                        (true, None, None)
                    }
                    ActionType::AttackPlayer => {
                        let faction = snap.world.factions.entry(faction_name.clone()).or_default();
                        let allowed = snap.world.rules.allow_lethal_politics
                        && faction.hostility_to_player >= 75
                        && snap.world.player.legitimacy <= 25
                        && (snap.world.war_active || faction.stability <= 35);
                        if allowed {
                            snap.world.player.alive = false;
                            archive_line = Some((
                                    format!("[ASSASSINATION] {} struck down the player.", agent_name),
                                    true,
                                ));
                            (true, None, Some("player_killed".to_string()))
                        } else {
                            (
                                false,
                                Some("Conditions for assassination not met.".to_string()),
                                None,
                            )
                        }
                    }
                };

                if let Some((event, important)) = archive_line {
                    let ts = archive_timestamp(day, processed_count, &op_id, &agent_name, "ACTION", subseq);
                    subseq += 1;
                    snap.world.archive.push(ArchiveEntry {
                            at: to_iso(ts),
                            event,
                            important,
                        });
                }

                results.push(ActionOutcome {
                        action_type: action.action_type,
                        accepted,
                        reason,
                        outcome: outcome_label,
                    });
            }

            Ok(results)
        })?;

    Ok(outcome
        .result
        .unwrap_or_else(|| duplicate_outcomes(&input.proposed_actions)))
}

fn duplicate_outcomes(actions: &[ProposedAction]) -> Vec<ActionOutcome> {
    actions
    .iter()
    .map(|a| ActionOutcome {
            action_type: a.action_type,
            accepted: false,
            reason: Some(DUPLICATE_REASON.to_string()),
            outcome: None,
        })
    .collect()
}
