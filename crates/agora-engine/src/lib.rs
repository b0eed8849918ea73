//! Agora Engine - mutation execution and dispatch
//!
//! Provides the executor functions that apply one mutation against the
//! store, the worker pool that runs them, and the gateway callers talk to.

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod gateway;

pub use commands::engine_command::{apply_mutation, ExecutorSettings};
pub use config::{EngineConfig, PoolConfig, SaturationPolicy, VotePolicy};
pub use dispatch::{DispatchPool, PendingCompletion, Receipt};
pub use gateway::Gateway;
