//! Full dataset reset

use agora_core::MutationOutcome;
use agora_store::errors::Result;
use agora_store::{Statement, StoreAdapter, MUTABLE_TABLES};
use tracing::debug;

/// Statements that empty every mutable table and restart its id sequence
pub fn reset_steps() -> Vec<Statement> {
    let mut steps: Vec<Statement> = MUTABLE_TABLES
        .iter()
        .map(|table| Statement::new(format!("DELETE FROM {}", table)))
        .collect();

    let names = MUTABLE_TABLES
        .iter()
        .map(|table| format!("'{}'", table))
        .collect::<Vec<_>>()
        .join(", ");
    steps.push(Statement::new(format!(
        "DELETE FROM sqlite_sequence WHERE name IN ({})",
        names
    )));
    steps
}

/// Delete all rows children-first and reset auto-increment counters
///
/// One transaction: either every table is emptied or none is.
///
/// # Errors
/// Any store failure; nothing is committed in that case.
pub fn reset_all(store: &mut StoreAdapter) -> Result<MutationOutcome> {
    let outcomes = store.execute_atomic("reset_all", &reset_steps())?;
    let rows_deleted: usize = outcomes.iter().map(|o| o.rows_changed).sum();
    debug!(rows_deleted, "reset complete");

    Ok(MutationOutcome::ResetComplete {
        tables_cleared: MUTABLE_TABLES.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_steps_delete_children_before_parents() {
        let steps = reset_steps();
        let position = |table: &str| {
            steps
                .iter()
                .position(|s| s.sql() == format!("DELETE FROM {}", table))
                .unwrap()
        };

        assert!(position("votes") < position("users"));
        assert!(position("comments") < position("posts"));
        assert!(position("community_members") < position("communities"));
        assert!(steps.last().unwrap().sql().contains("sqlite_sequence"));
    }
}
