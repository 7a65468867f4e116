//! Deterministic operation ids: `hash256(JSON([floor(now/windowMs),
//!...parts]))[:40]`. Windowed so retries of the same logical call within
//! the same window collide intentionally, giving the Memory Store's
//! event-id idempotency something stable to key on.

use agentworld_core::{hash256_hex, stable_stringify, truncate_hex, Result};

/// Derive a deterministic operation id from a time window and a sequence of
/// caller-supplied parts (agent name, intent, tick number,...).
pub fn derive_operation_id(now_ms: u64, window_ms: u64, parts: &[&str]) -> Result<String> {
    let window_ms = window_ms.max(1);
    let bucket = now_ms / window_ms;
    let mut components: Vec<serde_json::Value> = Vec::with_capacity(parts.len() + 1);
    components.push(serde_json::Value::from(bucket));
    for part in parts {
        components.push(serde_json::Value::from(*part));
    }
    let stringified = stable_stringify(&components)?;
    let digest = hash256_hex(stringified.as_bytes());
    Ok(truncate_hex(&digest, 40))
}
