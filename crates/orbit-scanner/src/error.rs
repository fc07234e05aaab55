use orbit_core::Coordinate;
use orbit_db::DatabaseError;
use orbit_session::SessionError;
use thiserror::Error;

/// The body of a sector response is not the expected JSON shape.
///
/// Almost always a login page served to an expired session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed sector response: {reason}")]
pub struct MalformedResponse {
    /// What was wrong with the body
    pub reason: String,
}

impl MalformedResponse {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Failure of one fetch attempt for a sector.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request never produced a response (timeout, reset, DNS).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server overloaded or rate limiting (5xx, 429).
    #[error("server busy: HTTP {status}")]
    ServerBusy { status: u16 },

    /// Any other non-success status; the session is assumed gone.
    #[error("session rejected: HTTP {status}")]
    StaleSession { status: u16 },

    /// 2xx response whose body is not a sector.
    #[error(transparent)]
    Malformed(#[from] MalformedResponse),
}

/// How a failed attempt should be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Wait with exponential backoff, consuming a retry slot
    Backoff,
    /// Refresh the session and retry immediately, without a retry slot
    Reauthenticate,
}

impl FetchError {
    /// Determine retry strategy based on the failure kind.
    #[must_use]
    pub fn retry_strategy(&self) -> RetryStrategy {
        match self {
            Self::Transport(_) | Self::ServerBusy { .. } => RetryStrategy::Backoff,
            Self::StaleSession { .. } | Self::Malformed(_) => RetryStrategy::Reauthenticate,
        }
    }
}

/// Errors that end a scan run.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("persistence failing: {failures} consecutive sector writes failed (last at {coordinate}: {message})")]
    PersistenceFailing {
        failures: u32,
        coordinate: Coordinate,
        message: String,
    },

    #[error("worker task failed: {0}")]
    WorkerFailed(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_strategy_classification() {
        assert_eq!(
            FetchError::ServerBusy { status: 503 }.retry_strategy(),
            RetryStrategy::Backoff
        );
        assert_eq!(
            FetchError::ServerBusy { status: 429 }.retry_strategy(),
            RetryStrategy::Backoff
        );
        assert_eq!(
            FetchError::StaleSession { status: 302 }.retry_strategy(),
            RetryStrategy::Reauthenticate
        );
        assert_eq!(
            FetchError::from(MalformedResponse::new("<html>")).retry_strategy(),
            RetryStrategy::Reauthenticate
        );
    }

    #[test]
    fn test_persistence_error_names_coordinate() {
        let err = ScanError::PersistenceFailing {
            failures: 5,
            coordinate: Coordinate {
                galaxy: 2,
                system: 17,
            },
            message: "database is locked".to_string(),
        };
        assert!(err.to_string().contains("2:17"));
    }
}
