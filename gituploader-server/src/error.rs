//! Error types for the upload server.
//!
//! One error type covers the whole request lifecycle. Each variant maps to
//! the HTTP status the upload endpoint answers with, and carries enough
//! context to fill the `details` field of a failure response.

use std::io;
use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

/// The main error type for server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Bad or missing input. Raised before any side effect.
    #[error("{0}")]
    Validation(String),

    /// Decoding or writing one of the uploaded files failed.
    #[error("Failed to write {}: {reason}", path.display())]
    FileWrite { path: PathBuf, reason: String },

    /// A git step other than the final push failed.
    #[error("Git command failed ({command}): {message}")]
    GitCommand { command: String, message: String },

    /// Both the `main` push and the `master` fallback failed.
    #[error("Git push failed for both main and master: main: {main}; master: {master}")]
    Push { main: String, master: String },

    /// Removing a workspace failed. Logged, never returned to a client.
    #[error("Cleanup error: {0}")]
    Cleanup(String),

    /// Configuration errors (missing values, invalid format)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors outside of file materialization
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Create a validation error with a message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a file write error for `path`.
    pub fn file_write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::FileWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a git command error naming the failed command.
    pub fn git_command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GitCommand {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a push error from both failed attempts.
    pub fn push(main: impl Into<String>, master: impl Into<String>) -> Self {
        Self::Push {
            main: main.into(),
            master: master.into(),
        }
    }

    /// Create a cleanup error with a message.
    pub fn cleanup(msg: impl Into<String>) -> Self {
        Self::Cleanup(msg.into())
    }

    /// Create a config error with a message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error with a message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status reported to the client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Diagnostic detail for failure responses. `None` for client errors.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::Validation(_) => None,
            Self::FileWrite { path, reason } => {
                Some(format!("path: {}\ncause: {reason}", path.display()))
            }
            Self::GitCommand { command, message } => {
                Some(format!("command: {command}\n{message}"))
            }
            Self::Push { main, master } => {
                Some(format!("push to main: {main}\npush to master: {master}"))
            }
            Self::Cleanup(msg) | Self::Config(msg) | Self::Internal(msg) => Some(msg.clone()),
            Self::Io(err) => Some(format!("{err:?}")),
        }
    }
}

/// A specialized Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

// Conversion from anyhow::Error for compatibility
impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(format!("{err:#}"))
    }
}

/// JSON body of every failed upload response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&ServerError> for ErrorBody {
    fn from(err: &ServerError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
            details: err.details(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorBody::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_bad_request() {
        let err = ServerError::validation("Invalid GitHub repository URL");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.details().is_none());

        let body = ErrorBody::from(&err);
        assert!(!body.success);
        assert_eq!(body.error, "Invalid GitHub repository URL");
    }

    #[test]
    fn test_push_describes_both_attempts() {
        let err = ServerError::push("rejected main", "rejected master");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("both main and master"));

        let details = err.details().unwrap();
        assert!(details.contains("rejected main"));
        assert!(details.contains("rejected master"));
    }

    #[test]
    fn test_git_command_names_command() {
        let err = ServerError::git_command("git add .", "fatal: oops");
        assert_eq!(err.to_string(), "Git command failed (git add .): fatal: oops");
    }
}
