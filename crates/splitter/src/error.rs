//! Crate-wide error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::api::ApiError;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, SplitterError>;

/// Errors raised while splitting a playlist.
///
/// Only [`SplitterError::QuotaExceeded`] and
/// [`SplitterError::ItemOperationFailed`] are expected in steady-state
/// operation; every other variant ends the run.
#[derive(Debug, Error)]
pub enum SplitterError {
    /// The provider's daily quota is exhausted; the run must pause.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// A structured API error scoped to a single remote call.
    #[error("API request failed: {0}")]
    ItemOperationFailed(String),

    /// A structured API error on a call the whole run depends on (playlist
    /// lookup, listing or creation).
    #[error("{operation} failed: {message}")]
    RequestFailed {
        operation: &'static str,
        message: String,
    },

    /// The configured source playlist does not exist on the account.
    #[error("Playlist '{0}' not found")]
    PlaylistNotFound(String),

    /// The checkpoint file exists but cannot be parsed.
    #[error("Checkpoint file {path:?} is corrupt: {source}")]
    DataCorruption {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SplitterError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Item-level failures on a call the run cannot continue without become
    /// [`SplitterError::RequestFailed`].
    pub(crate) fn escalate(self, operation: &'static str) -> Self {
        match self {
            Self::ItemOperationFailed(message) => Self::RequestFailed { operation, message },
            other => other,
        }
    }

    /// Whether this error ends the current process invocation.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::QuotaExceeded(_) | Self::ItemOperationFailed(_))
    }

    /// Process exit code for a run that ended with this error.
    pub fn exit_code(&self) -> i32 {
        if self.is_fatal() { 1 } else { 0 }
    }
}
