//! World-memory request/response line protocol.

use crate::error::ApiError;
use agentworld_context::ContextScope;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequest {
    #[serde(rename = "type")]
    kind: String,
    #[allow(dead_code)]
    schema_version: u32,
    scope: RawScope,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScope {
    #[serde(default)]
    town_id: Option<String>,
    #[serde(default)]
    faction_id: Option<String>,
    #[serde(default = "default_limit")]
    chronicle_limit: u32,
    #[serde(default = "default_limit")]
    history_limit: u32,
}

fn default_limit() -> u32 {
    5
}

/// Parse a `world-memory-request.v1` line into a `ContextScope`.
pub fn parse_world_memory_request_line(line: &str) -> Result<ContextScope, ApiError> {
    let raw: RawRequest = serde_json::from_str(line).map_err(|e| ApiError::Malformed(e.to_string()))?;
    if raw.kind != "world-memory-request.v1" {
        return Err(ApiError::Malformed(format!("unsupported request type: {}", raw.kind)));
    }
    Ok(ContextScope::new(
            raw.scope.town_id,
            raw.scope.faction_id,
            raw.scope.chronicle_limit,
            raw.scope.history_limit,
        ))
}

/// Serialize a `WorldMemoryContext` response for the stdout line. The
/// context type already carries its own camelCase wire shape, so this is
/// a thin `serde_json::to_value` wrapper kept here for symmetry with the
/// request side.
pub fn format_world_memory_response_line(context: &agentworld_context::WorldMemoryContext) -> Result<Value, ApiError> {
    serde_json::to_value(context).map_err(|e| ApiError::Malformed(e.to_string()))
}
