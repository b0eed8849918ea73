//! Persistent store adapter
//!
//! The only way the executor touches SQLite. Multi-statement work runs in an
//! IMMEDIATE transaction: the write lock is taken at `BEGIN`, so two workers
//! racing on the same rows serialize on the database rather than on pool
//! scheduling. Dropping an uncommitted transaction rolls it back, which is
//! what makes every early `?` return leave no trace.

use crate::db::{self, StoreOptions};
use crate::errors::{from_rusqlite, from_rusqlite_in, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Params, Row, Transaction, TransactionBehavior};
use std::path::Path;
use tracing::{debug, error};

/// One parameterized statement in an atomic step list
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Append a positional parameter
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    fn run(&self, conn: &Connection) -> rusqlite::Result<StepOutcome> {
        let rows_changed = conn.execute(&self.sql, rusqlite::params_from_iter(self.params.iter()))?;
        Ok(StepOutcome {
            rows_changed,
            last_insert_rowid: conn.last_insert_rowid(),
        })
    }
}

/// Effect of one executed statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub rows_changed: usize,
    pub last_insert_rowid: i64,
}

/// A configured connection with atomic and read helpers
pub struct StoreAdapter {
    conn: Connection,
}

impl StoreAdapter {
    /// Open and configure a connection to the database file
    ///
    /// Does not apply migrations; the engine does that once before
    /// starting workers.
    pub fn open<P: AsRef<Path>>(path: P, options: &StoreOptions) -> Result<Self> {
        let conn = db::open(path)?;
        Self::from_connection(conn, options)
    }

    pub fn from_connection(conn: Connection, options: &StoreOptions) -> Result<Self> {
        db::configure(&conn, options)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Run a single statement in autocommit mode
    pub fn execute(&self, op: &str, statement: &Statement) -> Result<StepOutcome> {
        statement
            .run(&self.conn)
            .map_err(|e| from_rusqlite_in(op, e))
    }

    /// Run an ordered list of statements as one all-or-nothing unit
    ///
    /// # Errors
    /// The first failing statement aborts the unit; nothing is committed.
    pub fn execute_atomic(&mut self, op: &str, steps: &[Statement]) -> Result<Vec<StepOutcome>> {
        self.atomic(op, |tx| {
            steps
                .iter()
                .map(|step| step.run(tx).map_err(|e| from_rusqlite_in(op, e)))
                .collect()
        })
    }

    /// Run a closure inside one IMMEDIATE transaction
    ///
    /// Commits if the closure returns `Ok`, rolls back otherwise.
    pub fn atomic<T, F>(&mut self, op: &str, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| from_rusqlite_in(op, e))?;

        match f(&tx) {
            Ok(value) => {
                tx.commit().map_err(|e| from_rusqlite_in(op, e))?;
                Ok(value)
            }
            Err(err) => {
                // RAISE(ROLLBACK) and some I/O errors end the transaction
                // inside SQLite; the caller still gets the original error
                if tx.is_autocommit() {
                    debug!(op, err_code = err.code(), "atomic unit already rolled back");
                } else if let Err(rollback_err) = tx.rollback() {
                    error!(op, err_code = err.code(), error = %rollback_err, "rollback failed");
                } else {
                    debug!(op, err_code = err.code(), "rolled back atomic unit");
                }
                Err(err)
            }
        }
    }

    /// Read at most one row
    pub fn query_one<T, P, F>(&self, sql: &str, params: P, map: F) -> Result<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.conn
            .query_row(sql, params, map)
            .optional()
            .map_err(from_rusqlite)
    }

    /// Read every matching row
    pub fn query_many<T, P, F>(&self, sql: &str, params: P, map: F) -> Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt = self.conn.prepare(sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(params, map)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::ExErrorKind;

    fn adapter() -> StoreAdapter {
        let conn = Connection::open_in_memory().unwrap();
        let adapter = StoreAdapter::from_connection(conn, &StoreOptions::default()).unwrap();
        adapter
            .connection()
            .execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, v TEXT UNIQUE)")
            .unwrap();
        adapter
    }

    fn count(adapter: &StoreAdapter) -> i64 {
        adapter
            .query_one("SELECT COUNT(*) FROM t", [], |r| r.get(0))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_execute_atomic_reports_each_step() {
        let mut adapter = adapter();
        let outcomes = adapter
            .execute_atomic(
                "insert_two",
                &[
                    Statement::new("INSERT INTO t (v) VALUES (?)").bind("a".to_string()),
                    Statement::new("INSERT INTO t (v) VALUES (?)").bind("b".to_string()),
                ],
            )
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[1].last_insert_rowid, 2);
        assert_eq!(count(&adapter), 2);
    }

    #[test]
    fn test_execute_atomic_rolls_back_on_second_step() {
        let mut adapter = adapter();
        let err = adapter
            .execute_atomic(
                "insert_dupe",
                &[
                    Statement::new("INSERT INTO t (v) VALUES (?)").bind("a".to_string()),
                    Statement::new("INSERT INTO t (v) VALUES (?)").bind("a".to_string()),
                ],
            )
            .unwrap_err();

        assert_eq!(err.kind(), ExErrorKind::AlreadyExists);
        assert_eq!(err.op(), Some("insert_dupe"));
        assert_eq!(count(&adapter), 0);
    }

    #[test]
    fn test_atomic_closure_error_leaves_no_rows() {
        let mut adapter = adapter();
        let result: Result<()> = adapter.atomic("closure", |tx| {
            tx.execute("INSERT INTO t (v) VALUES ('x')", []).unwrap();
            Err(agora_core::ExError::new(ExErrorKind::NotFound))
        });

        assert!(result.is_err());
        assert_eq!(count(&adapter), 0);
    }

    #[test]
    fn test_query_many_and_missing_row() {
        let adapter = adapter();
        adapter
            .execute("seed", &Statement::new("INSERT INTO t (v) VALUES ('x'), ('y')"))
            .unwrap();

        let values: Vec<String> = adapter
            .query_many("SELECT v FROM t ORDER BY id", [], |r| r.get(0))
            .unwrap();
        assert_eq!(values, vec!["x".to_string(), "y".to_string()]);

        let missing: Option<String> = adapter
            .query_one("SELECT v FROM t WHERE id = ?", [99], |r| r.get(0))
            .unwrap();
        assert!(missing.is_none());
    }
}
