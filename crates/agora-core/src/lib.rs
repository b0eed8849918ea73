//! Agora Core - domain types for the mutation layer
//!
//! This crate provides:
//! - The closed `Mutation` inventory and its success payloads
//! - Typed ids, actors, vote targets and values
//! - Pre-dispatch validation rules
//! - The structured error facility (`ExError`) shared by store and engine
//! - The structured logging facility

pub mod commands;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod rules;

// Re-export commonly used types
pub use commands::{Mutation, MutationOutcome, OperationKind};
pub use errors::{AgoraError, ErrorCategory, ExError, ExErrorKind, Result};
pub use model::{Actor, TargetKind, VoteTarget, VoteValue};
pub use rules::validate_mutation;
