//! Error types for session handling.

use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors that can occur while acquiring or using a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The credential supplier could not produce credentials.
    #[error("credentials unavailable: {0}")]
    Credentials(String),

    /// The configured server URL is unusable.
    #[error("invalid server url: {0}")]
    InvalidUrl(String),

    /// A supplied header name or value is not valid HTTP.
    #[error("invalid header {name}: {reason}")]
    InvalidHeader {
        /// Header name as supplied
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// The probe page was served but is not the logged-in view.
    #[error("session not authenticated (probe marker missing)")]
    NotAuthenticated,

    /// The authentication wait was cancelled.
    #[error("authentication cancelled")]
    Cancelled,

    /// The bounded authentication wait ran out of attempts.
    #[error("authentication timed out after {attempts} attempts")]
    AuthenticationTimedOut {
        /// Attempts made
        attempts: u32,
    },

    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Cookie file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cookie file is not valid JSON.
    #[error("cookie file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SessionError::AuthenticationTimedOut { attempts: 3 };
        assert_eq!(err.to_string(), "authentication timed out after 3 attempts");
    }

    #[test]
    fn test_invalid_header_display() {
        let err = SessionError::InvalidHeader {
            name: "X Bad".to_string(),
            reason: "invalid name".to_string(),
        };
        assert!(err.to_string().contains("X Bad"));
    }
}
