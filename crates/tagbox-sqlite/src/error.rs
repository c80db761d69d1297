//! Error types for SQLite storage

use tagbox_core::CoreError;
use thiserror::Error;

/// SQLite storage error type
#[derive(Error, Debug)]
pub enum SqliteError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Schema/migration error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness rule would be broken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Blocking task failed to complete
    #[error("Task error: {0}")]
    Task(String),

    /// Underlying rusqlite error
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

/// Result type for SQLite operations
pub type SqliteResult<T> = Result<T, SqliteError>;

impl From<SqliteError> for CoreError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::NotFound(msg) => Self::NotFound(msg),
            SqliteError::Conflict(msg) => Self::Validation(msg),
            SqliteError::Connection(msg) => Self::Storage(msg),
            SqliteError::Schema(msg) => Self::Storage(msg),
            SqliteError::Task(msg) => Self::Storage(msg),
            SqliteError::Rusqlite(e) => Self::Storage(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        assert!(matches!(
            CoreError::from(SqliteError::NotFound("element 1".into())),
            CoreError::NotFound(_)
        ));
        assert!(matches!(
            CoreError::from(SqliteError::Conflict("username".into())),
            CoreError::Validation(_)
        ));
        assert!(matches!(
            CoreError::from(SqliteError::Rusqlite(rusqlite::Error::QueryReturnedNoRows)),
            CoreError::Storage(_)
        ));
    }
}
