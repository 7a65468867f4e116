//! Size limits and string normalization.
//!
//! Every string field that reaches persistence is trimmed and
//! length-capped. The Turn Guard's fields carry fixed caps; free-form
//! snapshot text (agent summaries, long memory entries, archive lines)
//! uses symmetrical defaults, recorded in `DESIGN.md`.

/// Size limits enforced when writing strings into the snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Cap for a short-memory / utterance / archive line.
    pub max_memory_text: usize,
    /// Cap for a faction/agent summary string.
    pub max_summary: usize,
    /// Cap for a long-memory entry.
    pub max_long_memory: usize,
    /// Cap for `turn.say`.
    pub max_say: usize,
    /// Cap for `memory_writes[].text`.
    pub max_memory_write_text: usize,
    /// Cap for `proposed_actions[].target`.
    pub max_action_target: usize,
    /// Cap for `proposed_actions[].reason`.
    pub max_action_reason: usize,

    /// Ring capacity: agent short memory.
    pub cap_short_memory: usize,
    /// Ring capacity: agent recent utterances.
    pub cap_recent_utterances: usize,
    /// Ring capacity: per-agent/faction archive.
    pub cap_entity_archive: usize,
    /// Ring capacity: world archive.
    pub cap_world_archive: usize,
    /// Ring capacity: `processedEventIds`.
    pub cap_processed_event_ids: usize,
    /// Ring capacity: `execution.history`.
    pub cap_execution_history: usize,
    /// Ring capacity: `execution.eventLedger`.
    pub cap_execution_ledger: usize,
    /// Ring capacity: `execution.pending`.
    pub cap_execution_pending: usize,

    /// Max entries in `memory_writes[]` per turn.
    pub max_memory_writes: usize,
    /// Max entries in `proposed_actions[]` per turn.
    pub max_proposed_actions: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_memory_text: 300,
            max_summary: 500,
            max_long_memory: 500,
            max_say: 300,
            max_memory_write_text: 220,
            max_action_target: 80,
            max_action_reason: 220,

            cap_short_memory: 20,
            cap_recent_utterances: 20,
            cap_entity_archive: 50,
            cap_world_archive: 500,
            cap_processed_event_ids: 1000,
            cap_execution_history: 512,
            cap_execution_ledger: 1024,
            cap_execution_pending: 128,

            max_memory_writes: 5,
            max_proposed_actions: 3,
        }
    }
}

/// Trim whitespace and cap a string to `max` chars (char-boundary safe).
pub fn trim_and_cap(s: &str, max: usize) -> String {
    let trimmed = s.trim();
    if trimmed.chars().count() <= max {
        trimmed.to_string()
    } else {
        trimmed.chars().take(max).collect()
    }
}

/// Clamp an integer into `[lo, hi]`.
pub fn clamp_i32(value: i32, lo: i32, hi: i32) -> i32 {
    value.clamp(lo, hi)
}
