//! Flow control primitives: a keyed serial queue, a bounded
//! semaphore, deterministic operation ids, and timeout racing. Shared by
//! the Turn Engine (serializing per-agent turns ahead of `transact`) and
//! the World Loop (deriving per-intent event ids).

#![warn(missing_docs)]

mod keyed_queue;
mod operation_id;
mod semaphore;
mod timeout;

pub use keyed_queue::KeyedSerialQueue;
pub use operation_id::derive_operation_id;
pub use semaphore::{Permit, Semaphore};
pub use timeout::with_timeout;
