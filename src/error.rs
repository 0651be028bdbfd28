//! Error types for tm
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown task, invalid size, bad config)
//! - 3: Rejected by task state (start while running, rename conflict)
//! - 4: Operation failed (I/O, corrupt log, lock timeout)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for tm CLI
pub mod exit_codes {
    pub const USER_ERROR: i32 = 2;
    pub const STATE_REJECTED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for tm operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Invalid size '{0}' (expected S, M, L or XL)")]
    InvalidSize(String),

    // Task state rejections (exit code 3)
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Task already exists: {0}")]
    Conflict(String),

    // Operation failures (exit code 4)
    #[error("Malformed log record: {0}")]
    MalformedRecord(String),

    #[error("Log replay failed at line {line}: {source}")]
    Replay {
        line: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidArgument(_)
            | Error::InvalidConfig(_)
            | Error::NotFound(_)
            | Error::InvalidSize(_) => exit_codes::USER_ERROR,

            // State rejections
            Error::InvalidTransition(_) | Error::Conflict(_) => exit_codes::STATE_REJECTED,

            // Operation failures
            Error::MalformedRecord(_)
            | Error::Replay { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::LockFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Stable machine-readable class of the error, one per exit code.
    pub fn kind(&self) -> &'static str {
        match self.exit_code() {
            exit_codes::USER_ERROR => "user_error",
            exit_codes::STATE_REJECTED => "state_rejected",
            _ => "operation_failed",
        }
    }

    /// Extra structured context for JSON error output.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::Replay { line, source } => Some(serde_json::json!({
                "line": line,
                "cause": source.to_string(),
            })),
            Error::LockFailed(path) => Some(serde_json::json!({
                "lock": path.to_string_lossy(),
            })),
            _ => None,
        }
    }
}

/// Result type alias for tm operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error body of the JSON output envelope
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub message: String,
    pub code: i32,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            message: err.to_string(),
            code: err.exit_code(),
            kind: err.kind(),
            details: err.details(),
        }
    }
}
