//! Memory Store configuration: an explicit struct with documented
//! defaults rather than inline constants.

/// Tunables for `MemoryStore::transact`.
#[derive(Debug, Clone, Copy)]
pub struct MemoryStoreConfig {
    /// Number of cross-process lock acquisition attempts before giving up.
    pub lock_retries: u32,
    /// Linear backoff unit, in milliseconds (`attempt * lock_backoff_ms`).
    pub lock_backoff_ms: u64,
    /// A transaction whose total duration exceeds this is logged as slow.
    pub slow_tx_ms: u64,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        MemoryStoreConfig {
            lock_retries: 5,
            lock_backoff_ms: 15,
            slow_tx_ms: 75,
        }
    }
}
