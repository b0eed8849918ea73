//! Pre-dispatch rules
//!
//! Everything checkable without the store runs here, before an envelope is
//! created. Checks that need rows (does the parent exist) run inside the
//! executor's transaction.

pub mod validation;

pub use validation::validate_mutation;
