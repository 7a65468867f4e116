//! Proposal translation: turns a validated proposal into one or
//! more authority command strings, or a list of precondition failures.

use crate::handoff::Proposal;
use agentworld_core::{PreconditionFailure, Snapshot};
use std::collections::BTreeMap;

/// Town-id alias map: raw proposal `townId` -> canonical `world.towns` key.
pub type TownAliasMap = BTreeMap<String, String>;

/// Outcome of translating a single proposal.
#[derive(Debug, Clone)]
pub struct TranslationResult {
    /// The town id after alias normalization.
    pub normalized_town_id: String,
    /// Authority command strings, in application order. Empty if
    /// `failures` is non-empty.
    pub authority_commands: Vec<String>,
    /// Precondition failures, if any.
    pub failures: Vec<PreconditionFailure>,
}

const KNOWN_SALVAGE_FOCI: [&str; 3] = ["scarcity", "dread", "general"];
const KNOWN_TALK_TYPES: [&str; 2] = ["morale-boost", "casual"];

fn failure(kind: &str, detail: impl Into<String>, normalized_town_id: String) -> TranslationResult {
    TranslationResult {
        normalized_town_id,
        authority_commands: Vec::new(),
        failures: vec![PreconditionFailure {
                kind: kind.to_string(),
                detail: detail.into(),
            }],
    }
}

/// Translate `proposal` per the canonical catalog.
pub fn translate(snap: &Snapshot, proposal: &Proposal, alias_map: &TownAliasMap) -> TranslationResult {
    let normalized_town_id = alias_map
    .get(&proposal.town_id)
    .cloned()
    .unwrap_or_else(|| proposal.town_id.clone());

    let Some(town) = snap.world.towns.get(&normalized_town_id) else {
        return failure("town_exists", "Unknown town.", normalized_town_id);
    };

    match proposal.proposal_type.as_str() {
        "MAYOR_ACCEPT_MISSION" => {
            let mission_id = proposal.args.get("missionId").and_then(|v| v.as_str()).unwrap_or("");
            let mut failures = Vec::new();
            if mission_id.trim().is_empty() {
                failures.push(PreconditionFailure {
                        kind: "mission_id_present".to_string(),
                        detail: "missionId must be non-empty".to_string(),
                    });
            }
            if town.major_mission_active {
                failures.push(PreconditionFailure {
                        kind: "no_active_major_mission".to_string(),
                        detail: "Major mission already active.".to_string(),
                    });
            }
            if !failures.is_empty() {
                return TranslationResult {
                    normalized_town_id,
                    authority_commands: Vec::new(),
                    failures,
                };
            }
            TranslationResult {
                authority_commands: vec![
                    format!("mayor talk {normalized_town_id}"),
                    format!("mayor accept {normalized_town_id}"),
                ],
                normalized_town_id,
                failures: Vec::new(),
            }
        }
        "PROJECT_ADVANCE" => {
            let project_id = proposal.args.get("projectId").and_then(|v| v.as_str()).unwrap_or("");
            if project_id.is_empty() || !town.projects.contains_key(project_id) {
                return failure("project_exists", "Unknown project.", normalized_town_id);
            }
            TranslationResult {
                authority_commands: vec![format!("project advance {normalized_town_id} {project_id}")],
                normalized_town_id,
                failures: Vec::new(),
            }
        }
        "SALVAGE_PLAN" => {
            let focus = proposal.args.get("focus").and_then(|v| v.as_str()).unwrap_or("");
            if !KNOWN_SALVAGE_FOCI.contains(&focus) {
                return failure("focus_known", format!("Unknown salvage focus: {focus}"), normalized_town_id);
            }
            let Some(target_key) = town.salvage_targets.get(focus) else {
                return failure("salvage_target_configured", "Unknown salvage target.", normalized_town_id);
            };
            TranslationResult {
                authority_commands: vec![format!("salvage plan {normalized_town_id} {target_key}")],
                normalized_town_id,
                failures: Vec::new(),
            }
        }
        "TOWNSFOLK_TALK" => {
            let talk_type = proposal.args.get("talkType").and_then(|v| v.as_str()).unwrap_or("");
            if !KNOWN_TALK_TYPES.contains(&talk_type) {
                return failure("talk_type_known", format!("Unknown talk type: {talk_type}"), normalized_town_id);
            }
            let Some(npc_key) = town.npc_keys.get(talk_type) else {
                return failure("npc_configured", "Unknown NPC.", normalized_town_id);
            };
            TranslationResult {
                authority_commands: vec![format!("townsfolk talk {normalized_town_id} {npc_key}")],
                normalized_town_id,
                failures: Vec::new(),
            }
        }
        other => failure("proposal_type_known", format!("Unknown proposal type: {other}"), normalized_town_id),
    }
}
