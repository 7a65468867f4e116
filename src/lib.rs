#![warn(missing_docs)]
//! # Agent World
//!
//! A durable, deterministic simulation core for a small population of
//! autonomous agents living in a handful of towns. State lives in a single
//! JSON snapshot behind a cross-process advisory lock; every mutation goes
//! through one serialized `transact` so idempotency, ordering, and crash
//! recovery all reduce to one mechanism.
//!
//! ```text
//! agentworld-core       snapshot shape, hashing, time, error taxonomy
//! agentworld-flow       operation-id derivation shared by callers
//! agentworld-memory     the Memory Store: transact, lock, ring buffers
//! agentworld-turn       Turn Guard, Action Engine, Turn Engine, God Command Service
//! agentworld-execution  Execution Adapter: handoff -> receipt, two store backends
//! agentworld-context    World Memory Context: read-only town/faction/history queries
//! agentworld-worldloop  the tick scheduler: planning, commit, backpressure, town crier
//! agentworld-api        the external-collaborator contract: line grammar, facade
//! ```
//!
//! This crate re-exports the external-collaborator surface from
//! `agentworld-api`; callers needing lower-level access (e.g. driving
//! `MemoryStore` directly for snapshot inspection) depend on the
//! subsystem crates above directly.

pub use agentworld_api::{
    execution_result_line, format_world_memory_response_line, parse_cli_line, parse_handoff_line, parse_world_memory_request_line,
    AgentWorld, ApiError, CliCommand,
};
