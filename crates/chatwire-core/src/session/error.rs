//! Session error types.

use thiserror::Error;

use crate::ports::ApiError;
use crate::stream::{StreamError, StreamErrorReason};

/// Message shown for every transport failure; details go to the log.
pub const TRANSPORT_ERROR_TEXT: &str = "Connection to the server was lost. Please try again.";

/// Why a session ended without a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Network failure, non-success status or timeout.
    #[error(transparent)]
    Transport(#[from] ApiError),

    /// In-band `error` or `unethical` event, text verbatim from the server.
    #[error("{0}")]
    Application(String),

    /// Regenerate targeted a message that is not in the store.
    #[error("Unknown message {message_uuid} in conversation {conversation_uuid}")]
    UnknownMessage {
        conversation_uuid: String,
        message_uuid: String,
    },
}

impl SessionError {
    /// Title and body for the error notifier.
    pub fn notification(&self) -> (&'static str, String) {
        match self {
            Self::Transport(_) => ("Connection error", TRANSPORT_ERROR_TEXT.to_string()),
            Self::Application(message) => ("Generation failed", message.clone()),
            Self::UnknownMessage { .. } => ("Regenerate failed", self.to_string()),
        }
    }
}

impl From<StreamError> for SessionError {
    fn from(err: StreamError) -> Self {
        match err.reason {
            StreamErrorReason::Connection => Self::Transport(ApiError::transport(err.message)),
            StreamErrorReason::Application => Self::Application(err.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_generic() {
        let err = SessionError::from(ApiError::Status {
            status: 500,
            message: "stack trace".to_string(),
        });
        assert_eq!(err.notification().1, TRANSPORT_ERROR_TEXT);
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_application_errors_are_verbatim() {
        let err = SessionError::from(StreamError::application("Policy violation"));
        assert_eq!(err, SessionError::Application("Policy violation".to_string()));
        assert_eq!(err.notification(), ("Generation failed", "Policy violation".to_string()));
    }

    #[test]
    fn test_connection_stream_error_maps_to_transport() {
        let err = SessionError::from(StreamError::connection("reset by peer"));
        assert!(matches!(err, SessionError::Transport(ApiError::Transport { .. })));
    }
}
