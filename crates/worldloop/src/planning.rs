//! World Loop planning: for every online agent, pick this tick's
//! intent by walking a fixed precedence chain, then run the repetition
//! breaker over the result.

use crate::config::WorldLoopConfig;
use agentworld_core::{tick_at, Snapshot};

/// Which rule in the precedence chain produced a `PlannedIntent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    /// `world_intent.frozen` is set; intent forced to `idle`.
    Frozen,
    /// `world_intent.manual_override` is set; the stored intent is kept.
    ManualOverride,
    /// The agent has unread `pending_messages`; intent forced to `respond`.
    PendingChat,
    /// The per-minute event budget is exhausted; intent forced to `idle`.
    BudgetGuard,
    /// A `JobAssignment` drove a role-specific plan.
    JobDriven,
    /// No higher rule applied; picked deterministically from a hash.
    DeterministicPick,
    /// The chosen plan would have repeated too many ticks in a row and was
    /// substituted.
    RepetitionBreaker,
}

/// One agent's planned intent for this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedIntent {
    /// The agent this plan is for.
    pub agent: String,
    /// The intent verb (`"idle"`, `"wander"`, `"follow"`, `"respond"`).
    pub intent: String,
    /// The intent's target, if any.
    pub target: Option<String>,
    /// Which precedence rule produced this plan.
    pub source: PlanSource,
}

const DETERMINISTIC_CANDIDATES: [&str; 3] = ["idle", "wander", "respond"];

pub(crate) fn hash_mod(parts: &[&str], modulus: usize) -> usize {
    let joined = parts.join(":");
    let digest = agentworld_core::hash256_hex(joined.as_bytes());
    let prefix = u64::from_str_radix(&digest[..15], 16).unwrap_or(0);
    (prefix % modulus.max(1) as u64) as usize
}

fn minute_bucket(tick_number: u64, tick_ms: u64) -> i64 {
    tick_at(tick_number, tick_ms).timestamp() / 60
}

fn job_plan(agent: &str, role: &str, markers: &[String], tick_number: u64) -> Option<(String, Option<String>)> {
    match role {
        "scout" => Some(("wander".to_string(), None)),
        "guard" => Some(("idle".to_string(), None)),
        "builder" => Some(("idle".to_string(), Some("construct".to_string()))),
        "farmer" => Some(("idle".to_string(), Some("tend".to_string()))),
        "hauler" => {
            if markers.len() >= 2 {
                let tick_str = tick_number.to_string();
                let idx = hash_mod(&[agent, tick_str.as_str(), "hauler_leg"], 2);
                Some(("wander".to_string(), Some(markers[idx].clone())))
            } else {
                Some(("wander".to_string(), markers.first().cloned()))
            }
        }
        _ => None,
    }
}

fn deterministic_pick(agent: &str, tick_number: u64, leader: Option<&str>) -> (String, Option<String>) {
    let tick_str = tick_number.to_string();
    if let Some(leader_name) = leader {
        let idx = hash_mod(&[agent, tick_str.as_str(), "pick_with_leader"], DETERMINISTIC_CANDIDATES.len() + 1);
        if idx == DETERMINISTIC_CANDIDATES.len() {
            return ("follow".to_string(), Some(leader_name.to_string()));
        }
        (DETERMINISTIC_CANDIDATES[idx].to_string(), None)
    } else {
        let idx = hash_mod(&[agent, tick_str.as_str(), "pick"], DETERMINISTIC_CANDIDATES.len());
        (DETERMINISTIC_CANDIDATES[idx].to_string(), None)
    }
}

/// Plan one tick's intents for every online agent in `snapshot`, in
/// deterministic (sorted-by-name) order.
pub fn plan_tick(snapshot: &Snapshot, tick_number: u64, config: &WorldLoopConfig) -> Vec<PlannedIntent> {
    let bucket = minute_bucket(tick_number, config.tick_ms);
    let mut plans = Vec::new();

    for (name, record) in snapshot.agents.iter() {
        let profile = &record.profile;
        if !profile.online {
            continue;
        }
        let intent_state = &profile.world_intent;

        let (mut intent, mut target, mut source) = if intent_state.frozen {
            ("idle".to_string(), None, PlanSource::Frozen)
        } else if intent_state.manual_override {
            let mut t = intent_state.intent_target.clone();
            if intent_state.intent == "follow" && t.is_none() {
                t = intent_state.leader.clone();
            }
            (intent_state.intent.clone(), t, PlanSource::ManualOverride)
        } else if !profile.pending_messages.is_empty() {
            ("respond".to_string(), None, PlanSource::PendingChat)
        } else if intent_state.budgets.minute_bucket == bucket && intent_state.budgets.events_in_min >= config.max_events_per_agent_per_min {
            ("idle".to_string(), None, PlanSource::BudgetGuard)
        } else if let Some(job) = &profile.job {
            match job_plan(name, &job.role, &job.markers, tick_number) {
                Some((i, t)) => (i, t, PlanSource::JobDriven),
                None => {
                    let (i, t) = deterministic_pick(name, tick_number, intent_state.leader.as_deref());
                    (i, t, PlanSource::DeterministicPick)
                }
            }
        } else {
            let (i, t) = deterministic_pick(name, tick_number, intent_state.leader.as_deref());
            (i, t, PlanSource::DeterministicPick)
        };

        if !matches!(
            source,
            PlanSource::Frozen | PlanSource::ManualOverride | PlanSource::PendingChat | PlanSource::BudgetGuard
        ) {
            let would_repeat = match &intent_state.last_plan {
                Some((last_intent, last_target)) if *last_intent == intent && *last_target == target => {
                    intent_state.repeat_count + 1
                }
                _ => 1,
            };
            if would_repeat >= config.repetition_breaker_threshold {
                if intent == "wander" {
                    intent = "idle".to_string();
                } else {
                    intent = "wander".to_string();
                }
                target = None;
                source = PlanSource::RepetitionBreaker;
            }
        }

        plans.push(PlannedIntent {
                agent: name.clone(),
                intent,
                target,
                source,
            });
    }

    plans
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentworld_core::{AgentRecord, IntentBudget, IntentState, JobAssignment};

    fn snapshot_with(name: &str, mutate: impl FnOnce(&mut AgentRecord)) -> Snapshot {
        let mut snap = Snapshot::fresh();
        let mut record = AgentRecord::default();
        record.profile.online = true;
        mutate(&mut record);
        snap.agents.insert(name.to_string(), record);
        snap
    }

    #[test]
    fn frozen_agent_is_always_idle() {
        let snap = snapshot_with("mara", |r| r.profile.world_intent.frozen = true);
        let plans = plan_tick(&snap, 1, &WorldLoopConfig::default());
        assert_eq!(plans[0].intent, "idle");
        assert_eq!(plans[0].source, PlanSource::Frozen);
    }

    #[test]
    fn manual_override_follow_falls_back_to_leader() {
        let snap = snapshot_with("mara", |r| {
                r.profile.world_intent.manual_override = true;
                r.profile.world_intent.intent = "follow".to_string();
                r.profile.world_intent.leader = Some("thorn".to_string());
            });
        let plans = plan_tick(&snap, 1, &WorldLoopConfig::default());
        assert_eq!(plans[0].intent, "follow");
        assert_eq!(plans[0].target.as_deref(), Some("thorn"));
        assert_eq!(plans[0].source, PlanSource::ManualOverride);
    }

    #[test]
    fn pending_chat_outranks_job() {
        let snap = snapshot_with("mara", |r| {
                r.profile.pending_messages.push("hello".to_string());
                r.profile.job = Some(JobAssignment {
                        role: "scout".to_string(),
                        markers: vec![],
                    });
            });
        let plans = plan_tick(&snap, 1, &WorldLoopConfig::default());
        assert_eq!(plans[0].intent, "respond");
        assert_eq!(plans[0].source, PlanSource::PendingChat);
    }

    #[test]
    fn exhausted_budget_forces_idle() {
        let config = WorldLoopConfig::default();
        let bucket = minute_bucket(1, config.tick_ms);
        let snap = snapshot_with("mara", |r| {
                r.profile.world_intent.budgets = IntentBudget {
                    minute_bucket: bucket,
                    events_in_min: config.max_events_per_agent_per_min,
                };
            });
        let plans = plan_tick(&snap, 1, &config);
        assert_eq!(plans[0].intent, "idle");
        assert_eq!(plans[0].source, PlanSource::BudgetGuard);
    }

    #[test]
    fn hauler_alternates_between_first_two_markers() {
        let snap = snapshot_with("wren", |r| {
                r.profile.job = Some(JobAssignment {
                        role: "hauler".to_string(),
                        markers: vec!["dock".to_string(), "mill".to_string(), "mine".to_string()],
                    });
            });
        let plans = plan_tick(&snap, 7, &WorldLoopConfig::default());
        assert_eq!(plans[0].intent, "wander");
        assert!(plans[0].target.as_deref() == Some("dock") || plans[0].target.as_deref() == Some("mill"));
    }

    #[test]
    fn repetition_breaker_substitutes_after_threshold() {
        // A scout's job-driven plan is always ("wander", None), so this
        // scenario is reproducible without depending on hash output.
        let config = WorldLoopConfig::default();
        let snap = snapshot_with("scout1", |r| {
                r.profile.job = Some(JobAssignment {
                        role: "scout".to_string(),
                        markers: vec![],
                    });
                r.profile.world_intent.last_plan = Some(("wander".to_string(), None));
                r.profile.world_intent.repeat_count = config.repetition_breaker_threshold - 1;
            });
        let plans = plan_tick(&snap, 1, &config);
        assert_eq!(plans[0].intent, "idle");
        assert_eq!(plans[0].source, PlanSource::RepetitionBreaker);
    }

    #[test]
    fn offline_agents_are_not_planned() {
        let mut snap = Snapshot::fresh();
        snap.agents.insert("ghost".to_string(), AgentRecord::default());
        let plans = plan_tick(&snap, 1, &WorldLoopConfig::default());
        assert!(plans.is_empty());
    }
}
