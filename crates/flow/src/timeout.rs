//! Timeout racing: run a closure on a worker thread and race it
//! against a deadline, rejecting with `Error::Timeout(label)` on expiry;
//! callers categorize which call timed out by matching on the label they
//! supplied.
//!
//! `transact` itself must never be raced this way ("would risk partial
//! persistence"); this is for outbound dialogue requests and other calls
//! with no durability side effects.

use agentworld_core::{Error, Result};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Run `f` on a dedicated thread, returning its result if it completes
/// within `timeout`, or `Error::Timeout(label)` if the deadline passes
/// first. `f` keeps running to completion on its thread even if this call
/// times out; its result is simply discarded.
pub fn with_timeout<T: Send + 'static>(
    f: impl FnOnce() -> T + Send + 'static,
    timeout: Duration,
    label: impl Into<String>,
) -> Result<T> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
            let _ = tx.send(f());
        });
    rx.recv_timeout(timeout)
    .map_err(|_| Error::Timeout(label.into()))
}
