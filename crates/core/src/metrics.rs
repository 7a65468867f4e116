//! Runtime metrics (component A): counters and percentile rings over
//! transaction phase timings, read by the Memory Store (to decide when to
//! log a slow transaction) and by the World Loop (to evaluate backpressure,
//!).

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

const SAMPLE_RING_CAP: usize = 2048;
const SLOW_TX_MS: u64 = 75;

/// Per-phase timings for a single `transact` call (step 8).
#[derive(Debug, Clone, Copy, Default)]
pub struct TxPhaseTimings {
    /// Time spent waiting for / acquiring the cross-process lock.
    pub lock_wait_ms: f64,
    /// Time spent deep-cloning the snapshot.
    pub clone_ms: f64,
    /// Time spent serializing the working copy to JSON.
    pub stringify_ms: f64,
    /// Time spent writing the temp sibling file.
    pub write_ms: f64,
    /// Time spent renaming the temp file over the target.
    pub rename_ms: f64,
    /// Total wall-clock time for the whole `transact` call.
    pub total_ms: f64,
}

impl TxPhaseTimings {
    /// Whether this transaction exceeded the slow-transaction threshold.
    pub fn is_slow(&self) -> bool {
        self.total_ms > SLOW_TX_MS as f64
    }
}

/// A point-in-time read of the metrics, used by the World Loop to compute
/// backpressure deltas between ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
    /// p99 of recorded transaction durations, in milliseconds.
    pub p99_tx_ms: f64,
    /// Mean of recorded transaction durations, in milliseconds.
    pub avg_tx_ms: f64,
    /// Total lock-acquisition retries observed so far.
    pub lock_retries: u64,
    /// Total lock-acquisition timeouts observed so far (fatal events).
    pub lock_timeouts: u64,
    /// Total duplicate (idempotency-hit) transactions observed so far.
    pub duplicates: u64,
}

/// Process-scoped runtime metrics.
///
/// Counters are atomics so any thread driving a `transact` call can update
/// them without taking the same lock the percentile ring uses; the ring
/// itself is behind a small mutex, a non-lock-free but low-contention
/// tradeoff that is fine at this write rate.
pub struct RuntimeMetrics {
    lock_retries: AtomicU64,
    lock_timeouts: AtomicU64,
    duplicates: AtomicU64,
    tx_durations_ms: Mutex<Vec<f64>>,
}

impl RuntimeMetrics {
    /// Create a fresh, zeroed metrics instance.
    pub fn new() -> Self {
        RuntimeMetrics {
            lock_retries: AtomicU64::new(0),
            lock_timeouts: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            tx_durations_ms: Mutex::new(Vec::with_capacity(SAMPLE_RING_CAP.min(256))),
        }
    }

    /// Record one lock-acquisition retry (step 2).
    pub fn record_lock_retry(&self) {
        self.lock_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one lock-acquisition timeout. Monotonic per property 7.
    pub fn record_lock_timeout(&self) {
        self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one idempotency-hit (duplicate `eventId`).
    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the phase timings of a completed `transact` call, logging at
    /// `warn` level if it crossed the slow threshold.
    pub fn record_tx(&self, timings: TxPhaseTimings) {
        if timings.is_slow() {
            tracing::warn!(total_ms = timings.total_ms, "slow transaction");
        }
        let mut samples = self.tx_durations_ms.lock();
        if samples.len() >= SAMPLE_RING_CAP {
            samples.remove(0);
        }
        samples.push(timings.total_ms);
    }

    /// Current total lock retries.
    pub fn lock_retries(&self) -> u64 {
        self.lock_retries.load(Ordering::Relaxed)
    }

    /// Current total lock timeouts.
    pub fn lock_timeouts(&self) -> u64 {
        self.lock_timeouts.load(Ordering::Relaxed)
    }

    /// Current total duplicate count.
    pub fn duplicates(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }

    /// Take a consistent point-in-time snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let samples = self.tx_durations_ms.lock();
        let (p99, avg) = percentile_and_mean(&samples, 0.99);
        MetricsSnapshot {
            p99_tx_ms: p99,
            avg_tx_ms: avg,
            lock_retries: self.lock_retries(),
            lock_timeouts: self.lock_timeouts(),
            duplicates: self.duplicates(),
        }
    }
}

impl Default for RuntimeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn percentile_and_mean(samples: &[f64], p: f64) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let idx = ((sorted.len() as f64) * p) as usize;
    let pctl = sorted[idx.min(sorted.len() - 1)];
    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
    (pctl, mean)
}
