//! Town/faction summary projections: deterministic views over the
//! Execution Store's receipts and the snapshot's faction/town state.

use agentworld_core::{ChronicleEntry, ExecutionReceipt, ExecutionStatus, WorldFactionState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const STATUS_KEYS: [&str; 5] = ["executed", "rejected", "stale", "duplicate", "failed"];

fn status_key(status: ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::Executed => "executed",
        ExecutionStatus::Rejected => "rejected",
        ExecutionStatus::Stale => "stale",
        ExecutionStatus::Duplicate => "duplicate",
        ExecutionStatus::Failed => "failed",
    }
}

fn empty_counts() -> BTreeMap<String, u32> {
    STATUS_KEYS.iter().map(|k| (k.to_string(), 0)).collect()
}

/// A deterministic view of one town's execution history and chronicle
/// activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TownSummary {
    /// The town id this summary describes.
    pub town_id: String,
    /// Receipt counts by terminal status.
    pub counts_by_status: BTreeMap<String, u32>,
    /// The highest decision epoch observed among this town's receipts.
    pub latest_decision_epoch: Option<u64>,
    /// The most recent chronicle entry's `at` for this town, if any.
    pub latest_chronicle_at: Option<String>,
}

/// Build a town summary from the full receipt/chronicle history (not just
/// the capped recent-records window returned to the caller).
pub fn summarize_town(town_id: &str, receipts: &[ExecutionReceipt], chronicle: &[ChronicleEntry]) -> TownSummary {
    let mut counts = empty_counts();
    let mut latest_decision_epoch = None;
    for r in receipts.iter().filter(|r| r.town_id == town_id) {
        *counts.entry(status_key(r.status).to_string()).or_insert(0) += 1;
        latest_decision_epoch = Some(latest_decision_epoch.map_or(r.decision_epoch, |e: u64| e.max(r.decision_epoch)));
    }
    let latest_chronicle_at = chronicle
    .iter()
    .filter(|c| c.town_id.as_deref() == Some(town_id))
    .map(|c| c.at.clone())
    .max();
    TownSummary {
        town_id: town_id.to_string(),
        counts_by_status: counts,
        latest_decision_epoch,
        latest_chronicle_at,
    }
}

/// A deterministic view of one faction: its linked towns' aggregate
/// execution activity plus the faction's own sim state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FactionSummary {
    /// The faction id this summary describes.
    pub faction_id: String,
    /// Towns this faction controls or influences.
    pub linked_towns: Vec<String>,
    /// Hostility toward the player, `[0, 100]`.
    pub hostility_to_player: i32,
    /// Internal stability, `[0, 100]`.
    pub stability: i32,
    /// Receipt counts by terminal status, aggregated across linked towns.
    pub counts_by_status: BTreeMap<String, u32>,
}

/// Build a faction summary from its world-sim state plus the receipt
/// history of its linked towns.
pub fn summarize_faction(faction_id: &str, faction: &WorldFactionState, receipts: &[ExecutionReceipt]) -> FactionSummary {
    let mut counts = empty_counts();
    for r in receipts.iter().filter(|r| faction.towns.contains(&r.town_id)) {
        *counts.entry(status_key(r.status).to_string()).or_insert(0) += 1;
    }
    FactionSummary {
        faction_id: faction_id.to_string(),
        linked_towns: faction.towns.clone(),
        hostility_to_player: faction.hostility_to_player,
        stability: faction.stability,
        counts_by_status: counts,
    }
}
