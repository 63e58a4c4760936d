//! Engine error type.
//!
//! Domain failures carry a [`CoreError`]; everything the store reports is a
//! [`EngineError::Store`], which callers surface as "store unavailable, safe
//! to retry". No engine operation reports success after a store error.

use dispatch_core::error::CoreError;

/// Postgres SQLSTATE for unique violations.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Store unavailable: {0}")]
    Store(#[from] sqlx::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Whether `err` is a unique violation on the named constraint or index.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some(UNIQUE_VIOLATION) && db.constraint() == Some(constraint)
        }
        _ => false,
    }
}
