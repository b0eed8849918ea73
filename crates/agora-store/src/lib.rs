//! Agora Store - SQLite persistence for the mutation layer
//!
//! This crate provides:
//! - Connection setup for several concurrent worker connections
//! - Embedded, checksummed schema migrations
//! - `StoreAdapter`, the atomic execution surface used by the executor
//! - Point reads used to verify write invariants

pub mod adapter;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod queries;
pub mod tables;

pub use adapter::{Statement, StepOutcome, StoreAdapter};
pub use db::StoreOptions;
pub use errors::Result;
pub use migrations::apply_migrations;
pub use tables::MUTABLE_TABLES;
