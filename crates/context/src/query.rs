//! World Memory Context query: joins the Execution Store's
//! recent-record projections with on-demand town/faction summaries.

use crate::scope::ContextScope;
use crate::summary::{summarize_faction, summarize_town, FactionSummary, TownSummary};
use agentworld_core::{ChronicleEntry, ExecutionReceipt, Result, Snapshot};
use agentworld_execution::ExecutionStore;
use serde::{Deserialize, Serialize};

/// The full context response. Serialized directly to the wire
/// shape (unlike `ExecutionReceipt`, which is an internal record the API
/// layer maps onto `execution-result.v1`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldMemoryContext {
    /// Always `"world-memory-context.v1"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Always `1`.
    pub schema_version: u32,
    /// The scope this response was built for.
    pub scope: ContextScope,
    /// Most recent chronicle entries, `at DESC`, tie-broken by id.
    pub recent_chronicle: Vec<ChronicleEntry>,
    /// Most recent terminal receipts, `decisionEpoch DESC`, tie-broken by
    /// execution id.
    pub recent_history: Vec<ExecutionReceipt>,
    /// Present when `scope.town_id` is set and known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub town_summary: Option<TownSummary>,
    /// Present when `scope.faction_id` is set and known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faction_summary: Option<FactionSummary>,
}

/// Build a `WorldMemoryContext` for `scope` against `execution_store` (for
/// recent-record projections) and `snapshot` (for town/faction summary
/// inputs).
pub fn build_context(execution_store: &dyn ExecutionStore, snapshot: &Snapshot, scope: ContextScope) -> Result<WorldMemoryContext> {
    let recent_chronicle = execution_store.list_chronicle_records(scope.chronicle_limit as usize)?;
    let recent_history = execution_store.list_history_records(scope.history_limit as usize)?;

    // A large-but-i64-safe bound: effectively "all records" without risking
    // a negative LIMIT on the SQL backend from a `usize -> i64` wraparound.
    const ALL: usize = i64::MAX as usize;
    let all_receipts = execution_store.list_history_records(ALL)?;
    let all_chronicle = execution_store.list_chronicle_records(ALL)?;

    let town_summary = scope
    .town_id
    .as_deref()
    .filter(|id| snapshot.world.towns.contains_key(*id))
    .map(|id| summarize_town(id, &all_receipts, &all_chronicle));

    let faction_summary = scope.faction_id.as_deref().and_then(|id| {
            snapshot
            .world
            .factions
            .get(id)
            .map(|faction| summarize_faction(id, faction, &all_receipts))
        });

    Ok(WorldMemoryContext {
            kind: "world-memory-context.v1".to_string(),
            schema_version: 1,
            scope,
            recent_chronicle,
            recent_history,
            town_summary,
            faction_summary,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentworld_execution::MemoryExecutionStore;
    use agentworld_memory::{MemoryStore, MemoryStoreConfig};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn context_omits_summaries_when_scope_has_no_ids() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryStore::open(dir.path().join("s.json"), MemoryStoreConfig::default()));
        let exec_store = MemoryExecutionStore::new(store.clone());
        let snap = store.get_snapshot();
        let ctx = build_context(&exec_store, &snap, ContextScope::new(None, None, 5, 5)).unwrap();
        assert!(ctx.town_summary.is_none());
        assert!(ctx.faction_summary.is_none());
        assert_eq!(ctx.kind, "world-memory-context.v1");
    }

    #[test]
    fn context_includes_town_summary_for_known_town() {
        use agentworld_core::TownState;
        use agentworld_memory::TransactOptions;

        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryStore::open(dir.path().join("s.json"), MemoryStoreConfig::default()));
        store
        .transact(TransactOptions::default(), |snap| {
                snap.world.towns.insert(
                    "riverbend".to_string(),
                    TownState {
                        id: "riverbend".to_string(),
                        ..Default::default()
                    },
                );
                Ok(())
            })
        .unwrap();
        let exec_store = MemoryExecutionStore::new(store.clone());
        let snap = store.get_snapshot();
        let ctx = build_context(&exec_store, &snap, ContextScope::new(Some("riverbend".to_string()), None, 5, 5)).unwrap();
        assert!(ctx.town_summary.is_some());
        assert_eq!(ctx.town_summary.unwrap().town_id, "riverbend");
    }

    #[test]
    fn unknown_town_id_yields_no_summary() {
        let dir = tempdir().unwrap();
        let store = Arc::new(MemoryStore::open(dir.path().join("s.json"), MemoryStoreConfig::default()));
        let exec_store = MemoryExecutionStore::new(store.clone());
        let snap = store.get_snapshot();
        let ctx = build_context(&exec_store, &snap, ContextScope::new(Some("nowhere".to_string()), None, 5, 5)).unwrap();
        assert!(ctx.town_summary.is_none());
    }
}
