//! World Memory Context request scope.

use serde::{Deserialize, Serialize};

fn clamp_1_5(n: u32) -> u32 {
    n.clamp(1, 5)
}

/// The request's scope: optional town/faction filter plus result limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextScope {
    /// Restrict town-scoped records/summary to this town id, if present.
    #[serde(default)]
    pub town_id: Option<String>,
    /// Restrict faction-scoped summary to this faction id, if present.
    #[serde(default)]
    pub faction_id: Option<String>,
    /// Chronicle records to return, clamped to `[1, 5]`.
    #[serde(default = "default_limit")]
    pub chronicle_limit: u32,
    /// History (receipt) records to return, clamped to `[1, 5]`.
    #[serde(default = "default_limit")]
    pub history_limit: u32,
}

fn default_limit() -> u32 {
    5
}

impl ContextScope {
    /// Build a scope, clamping both limits to `[1, 5]`.
    pub fn new(town_id: Option<String>, faction_id: Option<String>, chronicle_limit: u32, history_limit: u32) -> Self {
        ContextScope {
            town_id,
            faction_id,
            chronicle_limit: clamp_1_5(chronicle_limit),
            history_limit: clamp_1_5(history_limit),
        }
    }
}
