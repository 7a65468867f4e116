//! Snapshot projection: the deterministic
//! `(snapshotHash, decisionEpoch)` pair freshness checks compare against.

use agentworld_core::{hash256_of, Result, Snapshot, WorldStateSummary};

/// A point-in-time freshness projection of a snapshot's `world` state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    /// `hash256(stableStringify(world))`.
    pub snapshot_hash: String,
    /// `world.decision_epoch`, bumped on every committed transaction.
    pub decision_epoch: u64,
}

/// Project `snapshot.world` into its freshness fingerprint.
pub fn project_snapshot(snapshot: &Snapshot) -> Result<Projection> {
    Ok(Projection {
            snapshot_hash: hash256_of(&snapshot.world)?,
            decision_epoch: snapshot.world.decision_epoch,
        })
}

/// Build a receipt's `worldState` summary from a projection (step 5).
pub fn create_world_state_from_projection(projection: &Projection) -> WorldStateSummary {
    WorldStateSummary {
        post_execution_snapshot_hash: projection.snapshot_hash.clone(),
        post_execution_decision_epoch: projection.decision_epoch,
    }
}
