//! Error types surfaced to whoever drives the pipeline.
//!
//! The core never retries. Each variant carries enough context (status code,
//! missing field, underlying I/O message) for the caller to decide on retry.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("location must not be empty")]
    EmptyLocation,

    #[error("request to weather API timed out")]
    Timeout(#[source] reqwest::Error),

    #[error("failed to reach weather API: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("weather API returned status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed weather API response: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("weather API response is missing field `{0}`")]
    MissingField(&'static str),

    #[error("weather API response has out-of-range timestamp {0}")]
    InvalidTimestamp(i64),

    #[error("weather API answered for '{actual}', expected '{expected}'")]
    UnexpectedLocation { expected: String, actual: String },
}

impl FetchError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() { FetchError::Timeout(err) } else { FetchError::Transport(err) }
    }

    /// HTTP status, when the API answered with a non-success one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether repeating the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to open database {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to initialize schema: {0}")]
    Schema(#[source] rusqlite::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_retryable(&self) -> bool {
        let sqlite = match self {
            StorageError::Open { source, .. } => source,
            StorageError::Schema(e) | StorageError::Sqlite(e) => e,
            StorageError::Io(_) => return false,
        };
        matches!(
            sqlite.sqlite_error_code(),
            Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
        )
    }
}

/// Failure of one pipeline step.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PipelineError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Fetch(e) => e.is_retryable(),
            PipelineError::Storage(e) => e.is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retryable() {
        let err = FetchError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: String::new(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn client_errors_are_not_retryable() {
        let err = FetchError::Status { status: StatusCode::UNAUTHORIZED, body: "bad key".into() };
        assert!(!err.is_retryable());

        let err = PipelineError::from(FetchError::MissingField("main.temp"));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("main.temp"));
    }
}
