//! World Loop backpressure: compares this tick's `RuntimeMetrics`
//! snapshot against the previous tick's before planning begins.

use agentworld_core::MetricsSnapshot;

const P99_ABSOLUTE_MS: f64 = 250.0;
const AVG_ABSOLUTE_MS: f64 = 120.0;
const P99_RISING_FLOOR_MS: f64 = 100.0;
const AVG_RISING_FLOOR_MS: f64 = 80.0;
const RISING_FACTOR: f64 = 1.3;
const LOCK_RETRY_SPIKE_THRESHOLD: u64 = 3;

/// Tracks the previous tick's metrics snapshot so `evaluate` can compute
/// deltas. Lives for the lifetime of one World Loop instance.
#[derive(Debug, Default)]
pub struct BackpressureTracker {
    previous: Option<MetricsSnapshot>,
}

/// Outcome of a backpressure check for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct BackpressureVerdict {
    /// `true` when the tick should skip planning/committing this round.
    pub throttled: bool,
    /// Which threshold tripped, if any (e.g. `"lock_retry_spike:5"`).
    pub reason: Option<String>,
}

impl BackpressureTracker {
    /// Create a tracker with no prior-tick baseline.
    pub fn new() -> Self {
        BackpressureTracker::default()
    }

    /// Evaluate `current` against the previous call's snapshot, then
    /// remember `current` as the new baseline.
    pub fn evaluate(&mut self, current: MetricsSnapshot) -> BackpressureVerdict {
        let prev = self.previous;
        self.previous = Some(current);

        let timeout_delta = prev.map(|p| current.lock_timeouts.saturating_sub(p.lock_timeouts)).unwrap_or(0);
        if timeout_delta > 0 {
            return throttle("lock_timeouts_detected".to_string());
        }

        let retry_delta = prev.map(|p| current.lock_retries.saturating_sub(p.lock_retries)).unwrap_or(0);
        if retry_delta >= LOCK_RETRY_SPIKE_THRESHOLD {
            return throttle(format!("lock_retry_spike:{retry_delta}"));
        }

        if current.p99_tx_ms > P99_ABSOLUTE_MS {
            return throttle(format!("high_p99_tx:{:.0}", current.p99_tx_ms));
        }
        if current.avg_tx_ms > AVG_ABSOLUTE_MS {
            return throttle(format!("high_avg_tx:{:.0}", current.avg_tx_ms));
        }

        if let Some(p) = prev {
            if p.p99_tx_ms > 0.0 && current.p99_tx_ms > RISING_FACTOR * p.p99_tx_ms && current.p99_tx_ms > P99_RISING_FLOOR_MS {
                return throttle("rising_p99_tx".to_string());
            }
            if p.avg_tx_ms > 0.0 && current.avg_tx_ms > RISING_FACTOR * p.avg_tx_ms && current.avg_tx_ms > AVG_RISING_FLOOR_MS {
                return throttle("rising_avg_tx".to_string());
            }
        }

        BackpressureVerdict {
            throttled: false,
            reason: None,
        }
    }
}

fn throttle(reason: String) -> BackpressureVerdict {
    BackpressureVerdict {
        throttled: true,
        reason: Some(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(p99: f64, avg: f64, timeouts: u64, retries: u64) -> MetricsSnapshot {
        MetricsSnapshot {
            p99_tx_ms: p99,
            avg_tx_ms: avg,
            lock_retries: retries,
            lock_timeouts: timeouts,
            duplicates: 0,
        }
    }

    #[test]
    fn first_tick_never_throttles_on_deltas() {
        let mut tracker = BackpressureTracker::new();
        let verdict = tracker.evaluate(metrics(10.0, 5.0, 0, 50));
        assert!(!verdict.throttled);
    }

    #[test]
    fn any_new_lock_timeout_throttles() {
        let mut tracker = BackpressureTracker::new();
        tracker.evaluate(metrics(10.0, 5.0, 0, 0));
        let verdict = tracker.evaluate(metrics(10.0, 5.0, 1, 0));
        assert!(verdict.throttled);
        assert_eq!(verdict.reason.as_deref(), Some("lock_timeouts_detected"));
    }

    #[test]
    fn lock_retry_spike_of_three_throttles() {
        let mut tracker = BackpressureTracker::new();
        tracker.evaluate(metrics(10.0, 5.0, 0, 0));
        let verdict = tracker.evaluate(metrics(10.0, 5.0, 0, 3));
        assert!(verdict.throttled);
        assert_eq!(verdict.reason.as_deref(), Some("lock_retry_spike:3"));
    }

    #[test]
    fn two_retries_does_not_spike() {
        let mut tracker = BackpressureTracker::new();
        tracker.evaluate(metrics(10.0, 5.0, 0, 0));
        let verdict = tracker.evaluate(metrics(10.0, 5.0, 0, 2));
        assert!(!verdict.throttled);
    }

    #[test]
    fn high_p99_throttles_even_on_first_tick() {
        let mut tracker = BackpressureTracker::new();
        let verdict = tracker.evaluate(metrics(300.0, 5.0, 0, 0));
        assert!(verdict.throttled);
        assert_eq!(verdict.reason.as_deref(), Some("high_p99_tx:300"));
    }

    #[test]
    fn high_avg_throttles_when_p99_is_fine() {
        let mut tracker = BackpressureTracker::new();
        let verdict = tracker.evaluate(metrics(50.0, 150.0, 0, 0));
        assert!(verdict.throttled);
        assert_eq!(verdict.reason.as_deref(), Some("high_avg_tx:150"));
    }

    #[test]
    fn rising_p99_throttles_above_floor_and_factor() {
        let mut tracker = BackpressureTracker::new();
        tracker.evaluate(metrics(90.0, 10.0, 0, 0));
        // 90 * 1.3 = 117, and 150 > 100 floor.
        let verdict = tracker.evaluate(metrics(150.0, 10.0, 0, 0));
        assert!(verdict.throttled);
        assert_eq!(verdict.reason.as_deref(), Some("rising_p99_tx"));
    }

    #[test]
    fn rising_p99_below_floor_does_not_throttle() {
        let mut tracker = BackpressureTracker::new();
        tracker.evaluate(metrics(10.0, 10.0, 0, 0));
        // 10 * 1.3 = 13, 50 > 13 but 50 < the 100ms floor.
        let verdict = tracker.evaluate(metrics(50.0, 10.0, 0, 0));
        assert!(!verdict.throttled);
    }
}
