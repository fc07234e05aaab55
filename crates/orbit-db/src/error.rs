//! Database error types.
//!
//! Provides error handling for store operations using `thiserror`.

use thiserror::Error;

/// Database-specific errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to open or create database connection.
    #[error("failed to open database: {0}")]
    Open(String),

    /// Migration execution failed.
    #[error("migration failed: {0}")]
    Migration(String),

    /// Requested record was not found.
    #[error("record not found")]
    NotFound,

    /// Database record with provided identifier not found.
    #[error("{0}")]
    NotFoundWithMessage(String),

    /// A row would violate a domain invariant before reaching `SQLite`.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Underlying `SQLx` error.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error during database operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DatabaseError {
    /// Whether the failure points at the environment (connection, pool, disk)
    /// rather than at a single bad row.
    #[must_use]
    pub fn is_connection_issue(&self) -> bool {
        match self {
            Self::Open(_) | Self::Io(_) => true,
            Self::Sqlx(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Io(_)
                    | sqlx::Error::WorkerCrashed
            ),
            _ => false,
        }
    }
}

/// Result type alias for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_issue_classification() {
        assert!(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut).is_connection_issue());
        assert!(DatabaseError::Open("locked".to_string()).is_connection_issue());
        assert!(!DatabaseError::NotFound.is_connection_issue());
        assert!(!DatabaseError::InvalidRecord("negative metal".to_string()).is_connection_issue());
    }
}
