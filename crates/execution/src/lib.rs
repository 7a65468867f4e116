#![warn(missing_docs)]
//! The Execution Adapter & Store: translates advisory
//! handoffs into authority commands under freshness, duplicate, and
//! precondition checks, and persists receipts, a ledger, and pending
//! records across two interchangeable backends.

mod adapter;
mod handoff;
mod projection;
mod reason_code;
mod recovery;
mod result;
mod store;
mod translation;

pub use adapter::apply_handoff;
pub use handoff::{validate, ExecutionRequirements, Handoff, Proposal};
pub use projection::{create_world_state_from_projection, project_snapshot, Projection};
pub use reason_code::classify_reason;
pub use recovery::{recover_pending, RecoveredPending};
pub use result::{compute_execution_id, finalize_receipt, is_valid_execution_result};
pub use store::{Backend, ExecutionStore, ExecutionStoreConfig, MemoryExecutionStore, SqlExecutionStore};
pub use translation::{translate, TownAliasMap, TranslationResult};
