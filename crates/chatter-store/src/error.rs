use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A unique column already holds the value.
    #[error("{0} already exists")]
    Conflict(&'static str),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Map `QueryReturnedNoRows` onto [`StoreError::NotFound`] for `what`.
    pub(crate) fn or_not_found(err: rusqlite::Error, what: &'static str) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(what),
            other => StoreError::Sqlite(other),
        }
    }

    /// Map a UNIQUE constraint violation onto [`StoreError::Conflict`].
    pub(crate) fn or_conflict(err: rusqlite::Error, what: &'static str) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                StoreError::Conflict(what)
            }
            _ => StoreError::Sqlite(err),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
