//! Keyed serial queue: invocations sharing a key run one at a time;
//! different keys run fully concurrently. Used to serialize per-agent turn
//! handling in front of `MemoryStore::transact`.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Serializes closures by key: a `DashMap` of lazily created per-key
/// mutexes, rather than one global lock.
pub struct KeyedSerialQueue {
    lanes: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedSerialQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        KeyedSerialQueue {
            lanes: DashMap::new(),
        }
    }

    /// Run `f` exclusively with respect to any other call presently running
    /// (or waiting) under the same `key`. Calls under different keys may run
    /// concurrently on different threads.
    pub fn run_exclusive<T>(&self, key: &str, f: impl FnOnce() -> T) -> T {
        let lane = self
        .lanes
        .entry(key.to_string())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone();
        let _guard = lane.lock();
        f()
    }

    /// Number of distinct keys that have ever been used. Lanes are never
    /// removed; a long-lived process with many distinct short-lived keys
    /// will accumulate entries.
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }
}

impl Default for KeyedSerialQueue {
    fn default() -> Self {
        Self::new()
    }
}
