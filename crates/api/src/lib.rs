#![warn(missing_docs)]
//! Agent World API: the external-collaborator contract. This crate
//! does not implement the interactive CLI shell itself — that shell, and
//! any other driver (RPC, embedding host), is an external collaborator
//! and lives outside this workspace. What lives here is everything such
//! a driver needs: the line grammar, the wire envelope for
//! execution results, and a facade tying the underlying subsystems
//! together into one call per CLI verb.

mod cli_line;
mod envelope;
mod error;
mod facade;
mod handoff_line;
mod memory_request;

pub use cli_line::{parse_cli_line, CliCommand};
pub use envelope::execution_result_line;
pub use error::ApiError;
pub use facade::AgentWorld;
pub use handoff_line::parse_handoff_line;
pub use memory_request::{format_world_memory_response_line, parse_world_memory_request_line};
