//! Deterministic clock helpers.
//!
//! Both the Action Engine's archive timestamps and the World Loop's
//! tick-at timestamps are pure functions of their inputs, not of
//! wall-clock time, so that replaying the same sequence of operations
//! against the same snapshot produces byte-identical output.

use crate::hashing::hash256_hex;
use chrono::{DateTime, Duration, TimeZone, Utc};

/// The simulation epoch all deterministic timestamps are offset from.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

/// Deterministic archive-append timestamp:
///
/// `epoch + (day-1)*86400s + min(86000, processedEventIdsCount)*1s
/// + hash(opId:agent:tag) mod 997 ms + subseq ms`
///
/// `subseq` is a caller-maintained monotonic counter used to break ties
/// between multiple archive lines appended within the same transaction.
pub fn archive_timestamp(
    day: u64,
    processed_event_ids_count: usize,
    op_id: &str,
    agent: &str,
    tag: &str,
    subseq: u32,
) -> DateTime<Utc> {
    let day_offset = Duration::seconds((day.saturating_sub(1) as i64) * 86_400);
    let processed_offset = Duration::seconds(processed_event_ids_count.min(86_000) as i64);
    let hash_input = format!("{op_id}:{agent}:{tag}");
    let digest = hash256_hex(hash_input.as_bytes());
    let hash_prefix = u64::from_str_radix(&digest[..15], 16).unwrap_or(0);
    let hash_ms = Duration::milliseconds((hash_prefix % 997) as i64);
    let subseq_ms = Duration::milliseconds(subseq as i64);
    epoch() + day_offset + processed_offset + hash_ms + subseq_ms
}

/// Deterministic tick-at timestamp: `epoch + tickNumber * tickMs`.
pub fn tick_at(tick_number: u64, tick_ms: u64) -> DateTime<Utc> {
    epoch() + Duration::milliseconds((tick_number * tick_ms) as i64)
}

/// Format a timestamp as an RFC3339/ISO-8601 instant with `Z` suffix.
pub fn to_iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Parse and validate an ISO-8601 instant string (`updated_at` must be
/// a valid ISO-8601 instant).
pub fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
    .ok()
    .map(|dt| dt.with_timezone(&Utc))
}
