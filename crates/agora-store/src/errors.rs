//! Error handling for agora-store
//!
//! Maps SQLite failures onto the shared `ExError` taxonomy so callers can
//! tell a conflict (roll back, report) from an unavailable store.

use agora_core::errors::{ExError, ExErrorKind};
use rusqlite::{ffi, ErrorCode};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::ConstraintViolation)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Classify a rusqlite error by its SQLite result code
pub fn classify(err: &rusqlite::Error) -> ExErrorKind {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => match e.code {
            ErrorCode::ConstraintViolation => match e.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    ExErrorKind::AlreadyExists
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ExErrorKind::NotFound,
                _ => ExErrorKind::ConstraintViolation,
            },
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => ExErrorKind::Concurrency,
            ErrorCode::CannotOpen
            | ErrorCode::NotADatabase
            | ErrorCode::DatabaseCorrupt
            | ErrorCode::SystemIoFailure
            | ErrorCode::DiskFull
            | ErrorCode::PermissionDenied
            | ErrorCode::ReadOnly => ExErrorKind::StoreUnavailable,
            _ => ExErrorKind::Persistence,
        },
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => ExErrorKind::Serialization,
        _ => ExErrorKind::Persistence,
    }
}

/// Create a store error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(classify(&err))
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Same as `from_rusqlite` but tagged with the operation that failed
pub fn from_rusqlite_in(op: &str, err: rusqlite::Error) -> ExError {
    ExError::new(classify(&err))
        .with_op(op.to_string())
        .with_message(err.to_string())
}
