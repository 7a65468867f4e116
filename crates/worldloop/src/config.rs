//! World Loop tuning knobs. Backpressure thresholds are fixed
//! constants in `backpressure.rs`; what's left here — the tick cadence,
//! per-tick/per-agent event caps, and town-crier cadence — is
//! configurable, with defaults chosen to stay well clear of the
//! backpressure floors.

const MIN_TICK_MS: u64 = 100;

/// Tunables for one World Loop instance.
#[derive(Debug, Clone)]
pub struct WorldLoopConfig {
    /// Milliseconds between ticks (default 2000, minimum 100).
    pub tick_ms: u64,
    /// Max world-loop-intent events applied per tick across all agents.
    pub max_events_per_tick: u32,
    /// Max world-loop-intent events a single agent may commit per
    /// 60-second bucket (default 10).
    pub max_events_per_agent_per_min: u32,
    /// Consecutive identical (intent, target) commits before the
    /// repetition breaker substitutes a different plan (10th).
    pub repetition_breaker_threshold: u32,
    /// Whether the town crier runs at all.
    pub town_crier_enabled: bool,
    /// Milliseconds between town-crier broadcasts (`>= 1`).
    pub town_crier_interval_ms: u64,
    /// Max news items broadcast per crier firing.
    pub town_crier_max_per_tick: usize,
    /// How many of the freshest `world.news` items the crier considers.
    pub town_crier_recent_window: usize,
    /// How many previously-broadcast ids the crier remembers to suppress
    /// repeats.
    pub town_crier_dedupe_window: usize,
}

impl Default for WorldLoopConfig {
    fn default() -> Self {
        WorldLoopConfig {
            tick_ms: 2_000,
            max_events_per_tick: 50,
            max_events_per_agent_per_min: 10,
            repetition_breaker_threshold: 10,
            town_crier_enabled: true,
            town_crier_interval_ms: 30_000,
            town_crier_max_per_tick: 3,
            town_crier_recent_window: 20,
            town_crier_dedupe_window: 50,
        }
    }
}

impl WorldLoopConfig {
    /// Clamp `tick_ms` up to a 100 ms floor and `town_crier_interval_ms`
    /// up to a 1 ms floor.
    pub fn normalized(mut self) -> Self {
        self.tick_ms = self.tick_ms.max(MIN_TICK_MS);
        self.town_crier_interval_ms = self.town_crier_interval_ms.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_clamps_below_floor_values() {
        let config = WorldLoopConfig {
            tick_ms: 10,
            town_crier_interval_ms: 0,
            ..WorldLoopConfig::default()
        };
        let normalized = config.normalized();
        assert_eq!(normalized.tick_ms, MIN_TICK_MS);
        assert_eq!(normalized.town_crier_interval_ms, 1);
    }
}
