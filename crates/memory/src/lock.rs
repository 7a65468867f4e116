//! Cross-process advisory lock (step 2): exclusive-create of a
//! `.lock` sibling file. No OS-native file-lock primitive is used, matching
//! the source's `wx`-create mechanism exactly rather than substituting
//! `flock`/`fcntl` semantics that would behave differently across
//! filesystems.

use crate::config::MemoryStoreConfig;
use agentworld_core::{Error, Result, RuntimeMetrics};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Holds the `.lock` sibling file open for the lifetime of one transaction;
/// dropping it closes the handle and unlinks the file (step 7).
pub struct LockGuard {
    lock_path: PathBuf,
    _file: std::fs::File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.lock_path) {
            tracing::warn!(path = %self.lock_path.display(), error = %err, "failed to remove lock file");
        }
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".lock");
    PathBuf::from(os)
}

/// Acquire the cross-process lock for `path`, retrying up to
/// `config.lock_retries` times with linear backoff
/// (`attempt * config.lock_backoff_ms`). Returns the held guard and the
/// measured lock-wait latency in milliseconds.
pub fn acquire(
    path: &Path,
    config: &MemoryStoreConfig,
    metrics: &RuntimeMetrics,
) -> Result<(LockGuard, f64)> {
    let lock_path = lock_path_for(path);
    let start = Instant::now();
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&lock_path)
        {
            Ok(file) => {
                let wait_ms = start.elapsed().as_secs_f64() * 1000.0;
                tracing::debug!(path = %lock_path.display(), attempt, wait_ms, "lock acquired");
                return Ok((
                        LockGuard {
                            lock_path,
                            _file: file,
                        },
                        wait_ms,
                    ));
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                if attempt >= config.lock_retries {
                    metrics.record_lock_timeout();
                    return Err(Error::LockTimeout {
                            path: lock_path.display().to_string(),
                            attempts: attempt,
                        });
                }
                metrics.record_lock_retry();
                thread::sleep(Duration::from_millis(config.lock_backoff_ms * attempt as u64));
            }
            Err(err) => return Err(Error::Io(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquires_and_releases() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let metrics = RuntimeMetrics::new();
        let config = MemoryStoreConfig::default();
        let (guard, _wait) = acquire(&path, &config, &metrics).unwrap();
        let lock_path = lock_path_for(&path);
        assert!(lock_path.exists());
        drop(guard);
        assert!(!lock_path.exists());
    }

    #[test]
    fn sequential_acquisitions_succeed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let metrics = RuntimeMetrics::new();
        let config = MemoryStoreConfig::default();
        for _ in 0..3 {
            let (guard, _) = acquire(&path, &config, &metrics).unwrap();
            drop(guard);
        }
    }

    #[test]
    fn exhausting_retries_is_fatal_and_counts_timeout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let metrics = RuntimeMetrics::new();
        let config = MemoryStoreConfig {
            lock_retries: 2,
            lock_backoff_ms: 1,
            ..Default::default()
        };
        // Pre-create the lock file to force every attempt to fail.
        let lock_path = lock_path_for(&path);
        std::fs::File::create(&lock_path).unwrap();
        let result = acquire(&path, &config, &metrics);
        assert!(matches!(result, Err(Error::LockTimeout { attempts: 2, .. })));
        assert_eq!(metrics.lock_timeouts(), 1);
    }
}
