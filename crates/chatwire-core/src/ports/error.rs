//! Error type shared by every API port.

use thiserror::Error;

/// Errors from the persistence and generation APIs.
///
/// Adapters map their transport-specific failures (HTTP, JSON) into these
/// variants at the port boundary so the core never sees adapter types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Network failure or aborted connection.
    #[error("Network error: {message}")]
    Transport {
        /// Description of the network error
        message: String,
    },

    /// The request exceeded its ceiling timeout and was cancelled.
    #[error("Request timed out after {timeout_ms} ms")]
    Timeout {
        /// The ceiling that was exceeded
        timeout_ms: u64,
    },

    /// The server answered with a non-success status.
    #[error("Request failed with status {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Body text or reason phrase
        message: String,
    },

    /// The bearer credential was missing or rejected.
    #[error("Authentication required")]
    Unauthorized,

    /// The addressed resource does not exist.
    #[error("Not found: {resource}")]
    NotFound {
        /// What was requested
        resource: String,
    },

    /// The response body could not be decoded.
    #[error("Invalid response: {message}")]
    Decode {
        /// What was invalid
        message: String,
    },
}

impl ApiError {
    /// Shorthand for a transport failure.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Whether this error came from the ceiling timeout.
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type alias for API port operations.
pub type ApiResult<T> = Result<T, ApiError>;
