//! God Command Service: the Execution Adapter's sole write path into
//! authority-command territory. The adapter never parses commands itself —
//! it only composes strings from its translation table and hands
//! them here.

use agentworld_core::Result;
use agentworld_core::Snapshot;
use agentworld_memory::{MemoryStore, TransactOptions};

/// A god-command invocation.
#[derive(Debug, Clone)]
pub struct GodCommandRequest {
    /// Agents relevant to this command (e.g. for attribution in output
    /// lines); the reference implementation does not require this to be
    /// non-empty.
    pub agents: Vec<String>,
    /// The composed authority command string, e.g. `"mayor talk riverbend"`.
    pub command: String,
    /// Idempotency key for this single step.
    pub operation_id: String,
}

/// Result of a god-command invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct GodCommandOutcome {
    /// Whether the command's effects were applied.
    pub applied: bool,
    /// Rejection reason, if not applied. The Execution Adapter classifies
    /// this against an exact-phrase map (step 4).
    pub reason: Option<String>,
    /// Human-readable lines describing what happened, for presentation.
    pub output_lines: Vec<String>,
    /// Whether this command should be recorded in an audit trail.
    pub audit: bool,
}

/// External collaborator contract. Implementors own the snapshot mutation
/// (via `MemoryStore::transact`) and the full vocabulary of commands they
/// accept; the Execution Adapter only calls this trait.
pub trait GodCommandService {
    /// Apply `request.command`, mutating the snapshot as needed.
    fn apply_god_command(&self, store: &MemoryStore, request: GodCommandRequest) -> Result<GodCommandOutcome>;
}

enum AuthorityCommand {
    MayorTalk { town: String },
    MayorAccept { town: String },
    ProjectAdvance { town: String, project_id: String },
    SalvagePlan { town: String, target_key: String },
    TownsfolkTalk { town: String, npc_key: String },
}

fn parse_authority_command(command: &str) -> Option<AuthorityCommand> {
    let parts: Vec<&str> = command.split_whitespace().collect();
    match parts.as_slice() {
        ["mayor", "talk", town] => Some(AuthorityCommand::MayorTalk { town: town.to_string() }),
        ["mayor", "accept", town] => Some(AuthorityCommand::MayorAccept { town: town.to_string() }),
        ["project", "advance", town, project_id] => Some(AuthorityCommand::ProjectAdvance {
                town: town.to_string(),
                project_id: project_id.to_string(),
            }),
        ["salvage", "plan", town, target_key] => Some(AuthorityCommand::SalvagePlan {
                town: town.to_string(),
                target_key: target_key.to_string(),
            }),
        ["townsfolk", "talk", town, npc_key] => Some(AuthorityCommand::TownsfolkTalk {
                town: town.to_string(),
                npc_key: npc_key.to_string(),
            }),
        _ => None,
    }
}

fn reject(reason: impl Into<String>) -> GodCommandOutcome {
    GodCommandOutcome {
        applied: false,
        reason: Some(reason.into()),
        output_lines: Vec::new(),
        audit: false,
    }
}

fn apply(snap: &mut Snapshot, command: AuthorityCommand) -> GodCommandOutcome {
    match command {
        AuthorityCommand::MayorTalk { town } => {
            let day = snap.world.clock.day;
            let Some(t) = snap.world.towns.get_mut(&town) else {
                return reject("Unknown town.");
            };
            if let Some(cooldown) = t.mayor_cooldown_until_day {
                if cooldown > day {
                    return reject(format!("mayor cooldown active until day {cooldown}"));
                }
            }
            t.mayor_briefed = true;
            GodCommandOutcome {
                applied: true,
                reason: None,
                output_lines: vec![format!("The mayor of {town} shares the current situation.")],
                audit: true,
            }
        }
        AuthorityCommand::MayorAccept { town } => {
            let day = snap.world.clock.day;
            let Some(t) = snap.world.towns.get_mut(&town) else {
                return reject("Unknown town.");
            };
            if let Some(cooldown) = t.mayor_cooldown_until_day {
                if cooldown > day {
                    return reject(format!("mayor cooldown active until day {cooldown}"));
                }
            }
            if t.major_mission_active {
                return reject("Major mission already active.");
            }
            if !t.mayor_briefed {
                return reject("No major mission briefing is available. talk to the mayor first.");
            }
            t.major_mission_active = true;
            GodCommandOutcome {
                applied: true,
                reason: None,
                output_lines: vec![format!("The mayor of {town} accepts the mission.")],
                audit: true,
            }
        }
        AuthorityCommand::ProjectAdvance { town, project_id } => {
            let Some(t) = snap.world.towns.get_mut(&town) else {
                return reject("Unknown town.");
            };
            let Some(project) = t.projects.get_mut(&project_id) else {
                return reject("Unknown project.");
            };
            project.progress += 1;
            GodCommandOutcome {
                applied: true,
                reason: None,
                output_lines: vec![format!("{town}'s {project_id} project advances.")],
                audit: false,
            }
        }
        AuthorityCommand::SalvagePlan { town, target_key } => {
            let Some(t) = snap.world.towns.get(&town) else {
                return reject("Unknown town.");
            };
            if !t.salvage_targets.values().any(|v| v == &target_key) {
                return reject("Unknown salvage target.");
            }
            GodCommandOutcome {
                applied: true,
                reason: None,
                output_lines: vec![format!("{town} plans a salvage run on {target_key}.")],
                audit: false,
            }
        }
        AuthorityCommand::TownsfolkTalk { town, npc_key } => {
            let Some(t) = snap.world.towns.get(&town) else {
                return reject("Unknown town.");
            };
            if !t.npc_keys.values().any(|v| v == &npc_key) {
                return reject("Unknown NPC.");
            }
            GodCommandOutcome {
                applied: true,
                reason: None,
                output_lines: vec![format!("A townsfolk of {town} talks with {npc_key}.")],
                audit: false,
            }
        }
    }
}

/// The reference God Command Service implementation, covering exactly the
/// five authority-command families the Execution Adapter's translation
/// table emits. Real deployments may swap in a richer
/// implementation covering the full operator vocabulary; the Execution
/// Adapter only depends on the `GodCommandService` trait.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceGodCommandService;

impl GodCommandService for ReferenceGodCommandService {
    fn apply_god_command(&self, store: &MemoryStore, request: GodCommandRequest) -> Result<GodCommandOutcome> {
        if store.has_processed_event(&request.operation_id) {
            return Ok(GodCommandOutcome {
                    applied: false,
                    reason: Some("Duplicate operation ignored.".to_string()),
                    output_lines: Vec::new(),
                    audit: false,
                });
        }

        let Some(parsed) = parse_authority_command(&request.command) else {
            return Ok(GodCommandOutcome {
                    applied: false,
                    reason: Some(format!("Unknown command: {}", request.command)),
                    output_lines: Vec::new(),
                    audit: false,
                });
        };

        let outcome = store.transact(TransactOptions::with_event_id(request.operation_id.clone()), move |snap| {
                Ok(apply(snap, parsed))
            })?;

        Ok(outcome.result.unwrap_or_else(|| GodCommandOutcome {
                    applied: false,
                    reason: Some("Duplicate operation ignored.".to_string()),
                    output_lines: Vec::new(),
                    audit: false,
                }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentworld_core::{ProjectState, TownState};
    use agentworld_memory::{MemoryStoreConfig, TransactOptions as TxOpts};
    use tempfile::tempdir;

    fn store_with_town() -> (tempfile::TempDir, MemoryStore) {
        let dir = tempdir().unwrap();
        let store = MemoryStore::open(dir.path().join("snapshot.json"), MemoryStoreConfig::default());
        store
        .transact(TxOpts::with_event_id(""), |snap| {
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
                town.salvage_targets.insert("scarcity".to_string(), "old_mill".to_string());
                town.npc_keys.insert("casual".to_string(), "baker".to_string());
                snap.world.towns.insert("riverbend".to_string(), town);
                Ok(())
            })
        .unwrap();
        (dir, store)
    }

    fn request(command: &str, op: &str) -> GodCommandRequest {
        GodCommandRequest {
            agents: Vec::new(),
            command: command.to_string(),
            operation_id: op.to_string(),
        }
    }

    #[test]
    fn mayor_talk_then_accept_applies() {
        let (_dir, store) = store_with_town();
        let svc = ReferenceGodCommandService;
        let talk = svc.apply_god_command(&store, request("mayor talk riverbend", "op1")).unwrap();
        assert!(talk.applied);
        let accept = svc.apply_god_command(&store, request("mayor accept riverbend", "op2")).unwrap();
        assert!(accept.applied);
        assert!(store.get_snapshot().world.towns["riverbend"].major_mission_active);
    }

    #[test]
    fn mayor_accept_without_briefing_is_rejected() {
        let (_dir, store) = store_with_town();
        let svc = ReferenceGodCommandService;
        let result = svc.apply_god_command(&store, request("mayor accept riverbend", "op1")).unwrap();
        assert!(!result.applied);
        assert_eq!(
            result.reason.as_deref(),
            Some("No major mission briefing is available. talk to the mayor first.")
        );
    }

    #[test]
    fn project_advance_requires_known_project() {
        let (_dir, store) = store_with_town();
        let svc = ReferenceGodCommandService;
        let ok = svc.apply_god_command(&store, request("project advance riverbend granary", "op1")).unwrap();
        assert!(ok.applied);
        assert_eq!(store.get_snapshot().world.towns["riverbend"].projects["granary"].progress, 1);

        let bad = svc.apply_god_command(&store, request("project advance riverbend nonexistent", "op2")).unwrap();
        assert!(!bad.applied);
        assert_eq!(bad.reason.as_deref(), Some("Unknown project."));
    }

    #[test]
    fn salvage_plan_rejects_unknown_target() {
        let (_dir, store) = store_with_town();
        let svc = ReferenceGodCommandService;
        let ok = svc
        .apply_god_command(&store, request("salvage plan riverbend old_mill", "op1"))
        .unwrap();
        assert!(ok.applied);
        let bad = svc
        .apply_god_command(&store, request("salvage plan riverbend phantom", "op2"))
        .unwrap();
        assert!(!bad.applied);
        assert_eq!(bad.reason.as_deref(), Some("Unknown salvage target."));
    }

    #[test]
    fn unknown_town_is_rejected() {
        let (_dir, store) = store_with_town();
        let svc = ReferenceGodCommandService;
        let result = svc.apply_god_command(&store, request("mayor talk nowhere", "op1")).unwrap();
        assert!(!result.applied);
        assert_eq!(result.reason.as_deref(), Some("Unknown town."));
    }

    #[test]
    fn repeated_operation_id_is_duplicate() {
        let (_dir, store) = store_with_town();
        let svc = ReferenceGodCommandService;
        svc.apply_god_command(&store, request("mayor talk riverbend", "op1")).unwrap();
        let second = svc.apply_god_command(&store, request("mayor talk riverbend", "op1")).unwrap();
        assert!(!second.applied);
        assert_eq!(second.reason.as_deref(), Some("Duplicate operation ignored."));
    }

    #[test]
    fn mayor_cooldown_blocks_talk() {
        let (_dir, store) = store_with_town();
        store
        .transact(TxOpts::with_event_id(""), |snap| {
                snap.world.towns.get_mut("riverbend").unwrap().mayor_cooldown_until_day = Some(5);
                snap.world.clock.day = 2;
                Ok(())
            })
        .unwrap();
        let svc = ReferenceGodCommandService;
        let result = svc.apply_god_command(&store, request("mayor talk riverbend", "op1")).unwrap();
        assert!(!result.applied);
        assert_eq!(result.reason.as_deref(), Some("mayor cooldown active until day 5"));
    }
}
