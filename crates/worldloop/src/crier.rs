//! Town crier: periodically broadcasts the freshest `world.news`
//! items not already seen, formatted as wire lines.

use agentworld_core::{tick_at, NewsEntry, Ring};

/// Stateful town-crier instance: one per World Loop, holding the
/// already-broadcast id window and the tick it last fired on.
pub struct TownCrier {
    seen: Ring<String>,
    last_fired_tick: Option<u64>,
}

impl TownCrier {
    /// Build a crier with the configured dedupe-window capacity.
    pub fn new(dedupe_window: usize) -> Self {
        TownCrier {
            seen: Ring::new(dedupe_window.max(1)),
            last_fired_tick: None,
        }
    }

    fn is_due(&self, tick_number: u64, tick_ms: u64, interval_ms: u64) -> bool {
        match self.last_fired_tick {
            None => true,
            Some(last) => {
                let elapsed_ms = tick_at(tick_number, tick_ms)
                .signed_duration_since(tick_at(last, tick_ms))
                .num_milliseconds()
                .max(0) as u64;
                elapsed_ms >= interval_ms
            }
        }
    }

    /// Consider firing on this tick. Returns the formatted broadcast lines,
    /// oldest-news-first, capped at `max_per_tick` and deduped against the
    /// seen window. Does nothing (and does not advance `last_fired_tick`)
    /// when not due.
    pub fn maybe_broadcast(
        &mut self,
        news: &[NewsEntry],
        tick_number: u64,
        tick_ms: u64,
        interval_ms: u64,
        recent_window: usize,
        max_per_tick: usize,
    ) -> Vec<String> {
        if !self.is_due(tick_number, tick_ms, interval_ms) {
            return Vec::new();
        }
        self.last_fired_tick = Some(tick_number);

        let already_seen: std::collections::HashSet<&str> = self.seen.iter().map(String::as_str).collect();
        let candidates = news.iter().rev().take(recent_window.max(1));

        let mut lines = Vec::new();
        for item in candidates {
            if lines.len() >= max_per_tick {
                break;
            }
            if already_seen.contains(item.id.as_str()) {
                continue;
            }
            lines.push(match &item.town {
                    Some(town) => format!("[NEWS:{town}] {}", item.message),
                    None => format!("[NEWS] {}", item.message),
                });
            self.seen.push(item.id.clone());
        }
        lines
    }
}
