//! The Memory Store: the serialized, file-locked, crash-safe
//! transactional snapshot manager with event-id idempotency. Every other
//! subsystem funnels its mutations through `MemoryStore::transact`.

use crate::config::MemoryStoreConfig;
use crate::lock;
use crate::persistence;
use agentworld_core::{ArchiveEntry, MemoryEntry, Result, RuntimeMetrics, Snapshot, TxPhaseTimings};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Outcome of a `transact` call.
#[derive(Debug)]
pub struct TransactOutcome<T> {
    /// `true` if the call was a no-op idempotency hit.
    pub skipped: bool,
    /// The mutator's return value, absent when `skipped` is `true`.
    pub result: Option<T>,
}

impl<T> TransactOutcome<T> {
    fn skip() -> Self {
        TransactOutcome {
            skipped: true,
            result: None,
        }
    }

    fn committed(value: T) -> Self {
        TransactOutcome {
            skipped: false,
            result: Some(value),
        }
    }
}

/// Options for a `transact` call.
#[derive(Debug, Clone)]
pub struct TransactOptions {
    /// Idempotency key. Empty means "always apply, never dedupe".
    pub event_id: String,
    /// Whether to persist to disk on commit. `false` is used for ephemeral
    /// mutator invocations that must still update the in-process snapshot.
    pub persist: bool,
}

impl Default for TransactOptions {
    fn default() -> Self {
        TransactOptions {
            event_id: String::new(),
            persist: true,
        }
    }
}

impl TransactOptions {
    /// Build options carrying only an event id, with `persist` defaulted
    /// to `true`.
    pub fn with_event_id(event_id: impl Into<String>) -> Self {
        TransactOptions {
            event_id: event_id.into(),
            persist: true,
        }
    }
}

/// The transactional snapshot manager.
pub struct MemoryStore {
    path: PathBuf,
    config: MemoryStoreConfig,
    metrics: Arc<RuntimeMetrics>,
    /// Doubles as the in-process serial lane (step 1): holding this
    /// mutex for the whole `transact` body ensures only one transaction
    /// runs at a time, and readers of `get_snapshot` see a consistent
    /// value.
    inner: Mutex<Snapshot>,
}

impl MemoryStore {
    /// Open (or prepare to create) the store at `path` with the given
    /// config, loading the current on-disk snapshot (or a fresh one).
    pub fn open(path: impl Into<PathBuf>, config: MemoryStoreConfig) -> Self {
        let path = path.into();
        let snapshot = persistence::load_or_fresh(&path);
        MemoryStore {
            path,
            config,
            metrics: Arc::new(RuntimeMetrics::new()),
            inner: Mutex::new(snapshot),
        }
    }

    /// Shared handle to this store's runtime metrics, for the World Loop's
    /// backpressure evaluation.
    pub fn metrics(&self) -> Arc<RuntimeMetrics> {
        self.metrics.clone()
    }

    /// Snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Force a reload of the in-process snapshot from disk.
    pub fn load(&self) {
        let snapshot = persistence::load_or_fresh(&self.path);
        *self.inner.lock() = snapshot;
    }

    /// Force-persist the current in-process snapshot to disk.
    pub fn save(&self) -> Result<()> {
        let snapshot = self.inner.lock();
        persistence::write_atomic(&self.path, &snapshot)?;
        Ok(())
    }

    /// A deep copy of the current in-process snapshot.
    pub fn get_snapshot(&self) -> Snapshot {
        self.inner.lock().clone()
    }

    /// Whether `event_id` has already been committed.
    pub fn has_processed_event(&self, event_id: &str) -> bool {
        self.inner.lock().has_processed_event(event_id)
    }

    /// Run `mutator` against a fresh working copy of the snapshot under the
    /// full `transact` protocol (steps 1-8).
    pub fn transact<T>(
        &self,
        options: TransactOptions,
        mutator: impl FnOnce(&mut Snapshot) -> Result<T>,
    ) -> Result<TransactOutcome<T>> {
        let total_start = Instant::now();
        // Step 1: enqueue behind the in-process serial lane.
        let mut inner = self.inner.lock();

        // Step 2: acquire the cross-process lock.
        let (lock_guard, lock_wait_ms) = lock::acquire(&self.path, &self.config, &self.metrics)?;

        // Step 3: re-read the snapshot from disk and check idempotency.
        let on_disk = persistence::load_or_fresh(&self.path);
        if !options.event_id.is_empty() && on_disk.has_processed_event(&options.event_id) {
            self.metrics.record_duplicate();
            drop(lock_guard);
            return Ok(TransactOutcome::skip());
        }

        // Step 4: deep-clone to a working copy and invoke the mutator.
        let clone_start = Instant::now();
        let mut working = on_disk.clone();
        let clone_ms = clone_start.elapsed().as_secs_f64() * 1000.0;

        let result = mutator(&mut working)?;
        working.world.decision_epoch += 1;

        // Step 5: record the event id.
        if !options.event_id.is_empty() {
            working.processed_event_ids.insert(options.event_id.clone());
        }

        // Step 6: persist, if requested.
        let (stringify_ms, write_ms, rename_ms) = if options.persist {
            persistence::write_atomic(&self.path, &working)?
        } else {
            (0.0, 0.0, 0.0)
        };

        // Step 7: replace the in-process snapshot, release the lock.
        *inner = working;
        drop(inner);
        drop(lock_guard);

        // Step 8: record phase timings.
        let total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
        self.metrics.record_tx(TxPhaseTimings {
                lock_wait_ms,
                clone_ms,
                stringify_ms,
                write_ms,
                rename_ms,
                total_ms,
            });

        Ok(TransactOutcome::committed(result))
    }

    /// Append a short-memory entry and an archive line for `agent`
    /// ('s `rememberAgent`).
    pub fn remember_agent(
        &self,
        agent: &str,
        text: &str,
        important: bool,
        event_id: &str,
    ) -> Result<TransactOutcome<()>> {
        let text = agentworld_core::trim_and_cap(text, agentworld_core::Limits::default().max_memory_text);
        let agent_name = agent.to_string();
        let derived_event_id = format!("{event_id}:agent:{agent}");
        self.transact(TransactOptions::with_event_id(derived_event_id), move |snap| {
                let now = agentworld_core::to_iso(agentworld_core::epoch());
                let record = snap.agent_mut(&agent_name);
                record.short_memory.push(MemoryEntry {
                        at: now.clone(),
                        text: text.clone(),
                    });
                record.archive.push(ArchiveEntry {
                        at: now,
                        event: text,
                        important,
                    });
                Ok(())
            })
    }

    /// Append a long-memory note and an archive line for `faction`
    /// ('s `rememberFaction`).
    pub fn remember_faction(
        &self,
        faction: &str,
        text: &str,
        important: bool,
        event_id: &str,
    ) -> Result<TransactOutcome<()>> {
        let text = agentworld_core::trim_and_cap(text, agentworld_core::Limits::default().max_memory_text);
        let faction_name = faction.to_string();
        let derived_event_id = format!("{event_id}:faction:{faction}");
        self.transact(TransactOptions::with_event_id(derived_event_id), move |snap| {
                let now = agentworld_core::to_iso(agentworld_core::epoch());
                let record = snap.faction_mut(&faction_name);
                record.long.push(text.clone());
                record.archive.push(ArchiveEntry {
                        at: now,
                        event: text,
                        important,
                    });
                Ok(())
            })
    }

    /// Append a world archive line ('s `rememberWorld`).
    pub fn remember_world(
        &self,
        text: &str,
        important: bool,
        event_id: &str,
    ) -> Result<TransactOutcome<()>> {
        let text = agentworld_core::trim_and_cap(text, agentworld_core::Limits::default().max_memory_text);
        let derived_event_id = format!("{event_id}:world");
        self.transact(TransactOptions::with_event_id(derived_event_id), move |snap| {
                let now = agentworld_core::to_iso(agentworld_core::epoch());
                snap.world.archive.push(ArchiveEntry {
                        at: now,
                        event: text,
                        important,
                    });
                Ok(())
            })
    }

    /// Read an agent's short memory and archive (oldest first).
    pub fn recall_agent(&self, agent: &str) -> (Vec<MemoryEntry>, Vec<ArchiveEntry>) {
        let snap = self.inner.lock();
        match snap.agents.get(agent) {
            Some(record) => (
                record.short_memory.iter().cloned().collect(),
                record.archive.iter().cloned().collect(),
            ),
            None => (Vec::new(), Vec::new()),
        }
    }

    /// Read a faction's long memory and archive (oldest first).
    pub fn recall_faction(&self, faction: &str) -> (Vec<String>, Vec<ArchiveEntry>) {
        let snap = self.inner.lock();
        match snap.factions.get(faction) {
            Some(record) => (record.long.clone(), record.archive.iter().cloned().collect()),
            None => (Vec::new(), Vec::new()),
        }
    }

    /// Read the world archive (oldest first).
    pub fn recall_world(&self) -> Vec<ArchiveEntry> {
        self.inner.lock().world.archive.iter().cloned().collect()
    }
}
