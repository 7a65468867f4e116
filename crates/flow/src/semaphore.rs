//! Bounded concurrent slot holder, used to cap outbound dialogue
//! requests in flight at once.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

struct State {
    available: usize,
}

/// A classic counting semaphore. `acquire` blocks until a permit is free;
/// dropping the returned `Permit` releases it.
pub struct Semaphore {
    state: Mutex<State>,
    cond: Condvar,
}

impl Semaphore {
    /// Create a semaphore with `permits` concurrent slots.
    pub fn new(permits: usize) -> Arc<Self> {
        Arc::new(Semaphore {
                state: Mutex::new(State {
                        available: permits,
                    }),
                cond: Condvar::new(),
            })
    }

    /// Block until a permit is available, then hold it until the returned
    /// guard is dropped.
    pub fn acquire(self: &Arc<Self>) -> Permit {
        let mut state = self.state.lock();
        while state.available == 0 {
            self.cond.wait(&mut state);
        }
        state.available -= 1;
        Permit {
            sem: self.clone(),
        }
    }

    /// Try to acquire a permit without blocking.
    pub fn try_acquire(self: &Arc<Self>) -> Option<Permit> {
        let mut state = self.state.lock();
        if state.available == 0 {
            return None;
        }
        state.available -= 1;
        Some(Permit { sem: self.clone() })
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.state.lock().available
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.available += 1;
        self.cond.notify_one();
    }
}

/// RAII permit; releases its slot back to the semaphore on drop.
pub struct Permit {
    sem: Arc<Semaphore>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.sem.release();
    }
}
