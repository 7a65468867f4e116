//! Shared types for the agent-world simulation core: the persisted
//! snapshot document, error/result types, deterministic clock and hashing
//! helpers, fixed-capacity rings, size limits, and runtime metrics.
//!
//! This crate has no knowledge of locking, transactions, or I/O; those
//! live in `agentworld-memory`. It is the vocabulary every other crate in
//! the workspace shares.

#![warn(missing_docs)]

mod error;
mod execution_types;
mod hashing;
mod limits;
mod metrics;
mod ring;
mod snapshot;
mod time;

pub use error::{Error, Result};
pub use execution_types::{
    DuplicateCheck, Evaluation, ExecutionDocument, ExecutionReceipt, ExecutionStatus,
    LedgerEntry, PendingRecord, PreconditionCheck, PreconditionFailure, StaleCheck,
    WorldStateSummary,
};
pub use hashing::{hash256_hex, hash256_of, stable_stringify, truncate_hex};
pub use limits::{clamp_i32, trim_and_cap, Limits};
pub use metrics::{MetricsSnapshot, RuntimeMetrics, TxPhaseTimings};
pub use ring::{ProcessedEventRing, Ring};
pub use snapshot::{
    AgentProfile, AgentRecord, ArchiveEntry, ChronicleEntry, Economy, FactionRecord,
    IntentBudget, IntentState, JobAssignment, Market, MarketOffer, MemoryEntry, NewsEntry,
    Phase, PlayerState, ProjectState, Season, Snapshot, ThreatState, TownState, WorldClock,
    WorldFactionState, WorldRules, WorldState, STORY_FACTIONS,
};
pub use time::{archive_timestamp, epoch, parse_iso, tick_at, to_iso};
