//! Database connection management
//!
//! Each dispatch worker owns one connection to the same database file.
//! `configure` makes those connections safe to use side by side.

use crate::errors::{from_rusqlite, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// Connection-level settings shared by every worker connection
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// How long a writer waits for another connection's write lock
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(5_000),
        }
    }
}

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

/// Open an in-memory SQLite database (single-connection tests only)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Configure a connection for concurrent writers
pub fn configure(conn: &Connection, options: &StoreOptions) -> Result<()> {
    // Set first so the journal_mode switch below also waits on a busy file
    conn.busy_timeout(options.busy_timeout)
        .map_err(from_rusqlite)?;

    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(from_rusqlite)?;

    // WAL lets readers proceed while one worker holds the write lock.
    // journal_mode returns a row, so it goes through query_row.
    let _mode: String = conn
        .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
        .map_err(from_rusqlite)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_configure_waits_for_lock_before_switching_to_wal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agora.db");

        // Still in rollback-journal mode, held exclusively by another writer
        let holder = open(&path).unwrap();
        holder
            .execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY); BEGIN EXCLUSIVE;")
            .unwrap();
        let release = thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            holder.execute_batch("COMMIT").unwrap();
        });

        let conn = open(&path).unwrap();
        configure(&conn, &StoreOptions::default()).unwrap();
        release.join().unwrap();

        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }
}
