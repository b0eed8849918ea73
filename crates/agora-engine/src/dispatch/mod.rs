//! Dispatch pool
//!
//! A fixed set of worker threads, each owning one store connection and one
//! bounded inbound queue. Submissions are assigned round-robin; a worker
//! runs its envelopes strictly one at a time, in arrival order.

pub mod envelope;
pub mod pool;
pub mod selector;

pub use envelope::{Envelope, PendingCompletion, Receipt};
pub use pool::DispatchPool;
pub use selector::RoundRobin;
