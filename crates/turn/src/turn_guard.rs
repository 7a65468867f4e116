//! Turn Guard: a pure, whitelist-based sanitizer over untrusted turn
//! payloads. Nothing here touches the snapshot; it only ever produces a
//! `SanitizedTurn` value from a `serde_json::Value` of unknown shape.

use agentworld_core::{clamp_i32, trim_and_cap, Limits};
use serde::{Deserialize, Serialize};

/// Emotional tone whitelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Calm.
    Calm,
    /// Wary.
    Wary,
    /// Hostile.
    Hostile,
    /// Fearful.
    Fearful,
    /// Proud.
    Proud,
    /// Sad.
    Sad,
    /// Joyful.
    Joyful,
}

impl Tone {
    fn parse(s: &str) -> Option<Tone> {
        match s {
            "calm" => Some(Tone::Calm),
            "wary" => Some(Tone::Wary),
            "hostile" => Some(Tone::Hostile),
            "fearful" => Some(Tone::Fearful),
            "proud" => Some(Tone::Proud),
            "sad" => Some(Tone::Sad),
            "joyful" => Some(Tone::Joyful),
            _ => None,
        }
    }
}

/// Memory-write scope whitelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryScope {
    /// Write to the acting agent's memory.
    Agent,
    /// Write to the agent's faction's memory.
    Faction,
    /// Write to the world's memory.
    World,
}

impl MemoryScope {
    fn parse(s: &str) -> Option<MemoryScope> {
        match s {
            "agent" => Some(MemoryScope::Agent),
            "faction" => Some(MemoryScope::Faction),
            "world" => Some(MemoryScope::World),
            _ => None,
        }
    }
}

/// Proposed-action type whitelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// No action.
    None,
    /// Spread a rumor against the player.
    SpreadRumor,
    /// Recruit for the faction.
    Recruit,
    /// Call a faction meeting.
    CallMeeting,
    /// Desert the faction.
    DesertFaction,
    /// Attack the player, if conditions allow.
    AttackPlayer,
}

impl ActionType {
    fn parse(s: &str) -> Option<ActionType> {
        match s {
            "none" => Some(ActionType::None),
            "spread_rumor" => Some(ActionType::SpreadRumor),
            "recruit" => Some(ActionType::Recruit),
            "call_meeting" => Some(ActionType::CallMeeting),
            "desert_faction" => Some(ActionType::DesertFaction),
            "attack_player" => Some(ActionType::AttackPlayer),
            _ => None,
        }
    }
}

/// A sanitized memory write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryWrite {
    /// Target scope.
    pub scope: MemoryScope,
    /// Text, trimmed and capped at 220 chars.
    pub text: String,
    /// Importance, clamped to `[1, 10]`.
    pub importance: i32,
}

/// A sanitized proposed action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedAction {
    /// Action type.
    pub action_type: ActionType,
    /// Target, trimmed and capped at 80 chars.
    pub target: String,
    /// Confidence, clamped to `[0, 1]`.
    pub confidence: f64,
    /// Reason, trimmed and capped at 220 chars.
    pub reason: String,
}

impl ProposedAction {
    fn none_fallback() -> Self {
        ProposedAction {
            action_type: ActionType::None,
            target: String::new(),
            confidence: 0.0,
            reason: String::new(),
        }
    }
}

/// A fully sanitized turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizedTurn {
    /// Spoken line, non-empty and at most 300 chars.
    pub say: String,
    /// Emotional tone.
    pub tone: Tone,
    /// Trust delta, clamped to `[-2, 2]`.
    pub trust_delta: i32,
    /// Memory writes, at most 5.
    pub memory_writes: Vec<MemoryWrite>,
    /// Proposed actions, at most 3 (never empty: falls back to a single
    /// `none` entry).
    pub proposed_actions: Vec<ProposedAction>,
}

impl SanitizedTurn {
    /// A safe, minimal fallback turn: a neutral line, calm tone, no writes,
    /// one `none` action. Callers supply their own fallback (e.g. the
    /// agent's last-known-good turn); this is only a default of last
    /// resort.
    pub fn fallback() -> Self {
        SanitizedTurn {
            say: "...".to_string(),
            tone: Tone::Calm,
            trust_delta: 0,
            memory_writes: Vec::new(),
            proposed_actions: vec![ProposedAction::none_fallback()],
        }
    }
}

fn str_field<'a>(raw: &'a serde_json::Value, field: &str) -> Option<&'a str> {
    raw.get(field).and_then(|v| v.as_str())
}

/// Sanitize `raw` (an arbitrarily-shaped, untrusted JSON value) against
/// `fallback`, which supplies values for any field that is missing or
/// fails validation.
pub fn sanitize(raw: &serde_json::Value, fallback: &SanitizedTurn) -> SanitizedTurn {
    let limits = Limits::default();

    let say = str_field(raw, "say")
    .map(|s| trim_and_cap(s, limits.max_say))
    .filter(|s| !s.is_empty())
    .unwrap_or_else(|| fallback.say.clone());

    let tone = str_field(raw, "tone")
    .and_then(Tone::parse)
    .unwrap_or(fallback.tone);

    let trust_delta = raw
    .get("trust_delta")
    .and_then(|v| v.as_f64())
    .map(|d| clamp_i32(d as i32, -2, 2))
    .unwrap_or(fallback.trust_delta);

    let memory_writes = raw
    .get("memory_writes")
    .and_then(|v| v.as_array())
    .map(|arr| sanitize_memory_writes(arr, &limits))
    .unwrap_or_default();

    let mut proposed_actions = raw
    .get("proposed_actions")
    .and_then(|v| v.as_array())
    .map(|arr| sanitize_proposed_actions(arr, &limits))
    .unwrap_or_default();

    if proposed_actions.is_empty() {
        proposed_actions.push(ProposedAction::none_fallback());
    }

    SanitizedTurn {
        say,
        tone,
        trust_delta,
        memory_writes,
        proposed_actions,
    }
}

fn sanitize_memory_writes(raw: &[serde_json::Value], limits: &Limits) -> Vec<MemoryWrite> {
    let mut out = Vec::new();
    for item in raw {
        if out.len() >= limits.max_memory_writes {
            break;
        }
        let Some(scope) = str_field(item, "scope").and_then(MemoryScope::parse) else {
            continue;
        };
        let Some(raw_text) = str_field(item, "text") else {
            continue;
        };
        let text = trim_and_cap(raw_text, limits.max_memory_write_text);
        if text.is_empty() {
            continue;
        }
        let importance = item
        .get("importance")
        .and_then(|v| v.as_f64())
        .map(|i| clamp_i32(i as i32, 1, 10))
        .unwrap_or(1);
        out.push(MemoryWrite {
                scope,
                text,
                importance,
            });
    }
    out
}

fn sanitize_proposed_actions(raw: &[serde_json::Value], limits: &Limits) -> Vec<ProposedAction> {
    let mut out = Vec::new();
    for item in raw {
        if out.len() >= limits.max_proposed_actions {
            break;
        }
        let Some(action_type) = str_field(item, "type").and_then(ActionType::parse) else {
            continue;
        };
        let target = str_field(item, "target")
        .map(|s| trim_and_cap(s, limits.max_action_target))
        .unwrap_or_default();
        let confidence = item
        .get("confidence")
        .and_then(|v| v.as_f64())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(0.0);
        let reason = str_field(item, "reason")
        .map(|s| trim_and_cap(s, limits.max_action_reason))
        .unwrap_or_default();
        out.push(ProposedAction {
                action_type,
                target,
                confidence,
                reason,
            });
    }
    out
}
