//! Mutation executor
//!
//! One function per write operation. Each runs against a single worker's
//! `StoreAdapter` and either commits its whole unit or leaves no trace.
//!
//! ## Logging Ownership
//!
//! The dispatch worker owns lifecycle logging (`log_op_start!`,
//! `log_op_end!`, `log_op_error!`). Functions here use only `debug!` for
//! internal details.

pub mod community;
pub mod content;
pub mod engine_command;
pub mod membership;
pub mod message;
pub mod reset;
pub mod users;
pub mod vote;

/// Row timestamp, seconds since the epoch
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
