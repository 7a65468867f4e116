#![warn(missing_docs)]
//! World Loop: the tick scheduler that plans, commits, and
//! broadcasts agent intents on a fixed cadence, throttling itself under
//! backpressure from `RuntimeMetrics`.

mod backpressure;
mod commit;
mod config;
mod crier;
mod planning;
mod side_effect;

pub use backpressure::{BackpressureTracker, BackpressureVerdict};
pub use commit::{commit_intent, CommitOutcome};
pub use config::WorldLoopConfig;
pub use crier::TownCrier;
pub use planning::{plan_tick, PlanSource, PlannedIntent};
pub use side_effect::{compute_side_effect, SideEffect};

use agentworld_core::Result;
use agentworld_memory::MemoryStore;

/// One tick's full report: whether it was throttled, what was committed,
/// and what the town crier broadcast.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// The tick this report describes.
    pub tick_number: u64,
    /// Whether backpressure suppressed planning/commits this tick.
    pub throttled: bool,
    /// Which backpressure threshold tripped, if any.
    pub throttle_reason: Option<String>,
    /// Per-agent commit outcomes, empty when throttled.
    pub commits: Vec<CommitOutcome>,
    /// Formatted town-crier broadcast lines, if the crier fired.
    pub town_crier_broadcasts: Vec<String>,
}

/// Drives one World Loop instance: owns the backpressure baseline and the
/// town crier's dedupe state across ticks.
pub struct WorldLoop {
    config: WorldLoopConfig,
    backpressure: BackpressureTracker,
    crier: TownCrier,
}

impl WorldLoop {
    /// Build a World Loop with `config`.
    pub fn new(config: WorldLoopConfig) -> Self {
        let config = config.normalized();
        let crier = TownCrier::new(config.town_crier_dedupe_window);
        WorldLoop {
            config,
            backpressure: BackpressureTracker::new(),
            crier,
        }
    }

    /// Run one tick against `store`: evaluate backpressure, plan and
    /// commit agent intents (capped at `max_events_per_tick`), then
    /// consider a town-crier broadcast.
    pub fn run_tick(&mut self, store: &MemoryStore, tick_number: u64) -> Result<TickReport> {
        let metrics = store.metrics().snapshot();
        let verdict = self.backpressure.evaluate(metrics);
        if verdict.throttled {
            tracing::warn!(tick = tick_number, reason = verdict.reason.as_deref().unwrap_or(""), "world loop tick throttled");
        }

        let snapshot = store.get_snapshot();

        let commits = if verdict.throttled {
            Vec::new()
        } else {
            let plans = plan_tick(&snapshot, tick_number, &self.config);
            let mut commits = Vec::with_capacity(plans.len());
            let mut applied_count: u32 = 0;
            for plan in &plans {
                if applied_count >= self.config.max_events_per_tick {
                    commits.push(CommitOutcome {
                            agent: plan.agent.clone(),
                            applied: false,
                            reason: Some("tick_event_cap_reached".to_string()),
                            side_effect: SideEffect::None,
                        });
                    continue;
                }
                let outcome = commit_intent(store, tick_number, self.config.tick_ms, self.config.max_events_per_agent_per_min, plan)?;
                if outcome.applied {
                    applied_count += 1;
                }
                commits.push(outcome);
            }
            commits
        };

        let town_crier_broadcasts = if self.config.town_crier_enabled {
            self.crier.maybe_broadcast(
                &snapshot.world.news,
                tick_number,
                self.config.tick_ms,
                self.config.town_crier_interval_ms,
                self.config.town_crier_recent_window,
                self.config.town_crier_max_per_tick,
            )
        } else {
            Vec::new()
        };

        Ok(TickReport {
                tick_number,
                throttled: verdict.throttled,
                throttle_reason: verdict.reason,
                commits,
                town_crier_broadcasts,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentworld_core::{NewsEntry, TxPhaseTimings};
    use agentworld_memory::{MemoryStoreConfig, TransactOptions};
    use tempfile::tempdir;

    fn store_with_agent(name: &str) -> (tempfile::TempDir, MemoryStore) {
        let dir = tempdir().unwrap();
        let store = MemoryStore::open(dir.path().join("s.json"), MemoryStoreConfig::default());
        store
        .transact(TransactOptions::default(), |snap| {
                snap.agent_mut(name).profile.online = true;
                Ok(())
            })
        .unwrap();
        (dir, store)
    }

    #[test]
    fn a_normal_tick_commits_the_online_agent() {
        let (_dir, store) = store_with_agent("mara");
        let mut scheduler = WorldLoop::new(WorldLoopConfig::default());
        let report = scheduler.run_tick(&store, 1).unwrap();
        assert!(!report.throttled);
        assert_eq!(report.commits.len(), 1);
        assert!(report.commits[0].applied);
    }

    #[test]
    fn high_p99_throttles_and_skips_commits() {
        let (_dir, store) = store_with_agent("mara");
        for _ in 0..5 {
            store.metrics().record_tx(TxPhaseTimings {
                    total_ms: 9_000.0,
                    ..Default::default()
                });
        }
        let mut scheduler = WorldLoop::new(WorldLoopConfig::default());
        let report = scheduler.run_tick(&store, 1).unwrap();
        assert!(report.throttled);
        assert!(report.commits.is_empty());
    }

    #[test]
    fn town_crier_broadcasts_fresh_news_on_first_tick() {
        let (_dir, store) = store_with_agent("mara");
        store
        .transact(TransactOptions::default(), |snap| {
                snap.world.news.push(NewsEntry {
                        id: "n1".to_string(),
                        town: Some("riverbend".to_string()),
                        message: "The harvest failed.".to_string(),
                        at: "2026-01-01T00:00:00.000Z".to_string(),
                    });
                Ok(())
            })
        .unwrap();
        let mut scheduler = WorldLoop::new(WorldLoopConfig::default());
        let report = scheduler.run_tick(&store, 0).unwrap();
        assert_eq!(report.town_crier_broadcasts, vec!["[NEWS:riverbend] The harvest failed.".to_string()]);
    }

    #[test]
    fn tick_event_cap_rejects_overflow_plans() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::open(dir.path().join("s.json"), MemoryStoreConfig::default());
        store
        .transact(TransactOptions::default(), |snap| {
                for i in 0..3 {
                    snap.agent_mut(&format!("agent{i}")).profile.online = true;
                }
                Ok(())
            })
        .unwrap();
        let mut config = WorldLoopConfig::default();
        config.max_events_per_tick = 1;
        let mut scheduler = WorldLoop::new(config);
        let report = scheduler.run_tick(&store, 1).unwrap();
        let applied = report.commits.iter().filter(|c| c.applied).count();
        assert_eq!(applied, 1);
        let capped = report.commits.iter().filter(|c| c.reason.as_deref() == Some("tick_event_cap_reached")).count();
        assert_eq!(capped, 2);
    }
}
