//! Internal error types for HTTP operations.
//!
//! These errors stay inside `chatwire-http` and are mapped to the core
//! `ApiError` at the port boundary.

use thiserror::Error;

/// Result type alias for HTTP operations.
pub type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug, Error)]
pub enum HttpError {
    /// The server answered with a non-success status.
    #[error("Request to {url} failed with status {status}: {body}")]
    Status {
        status: u16,
        url: String,
        /// Response body, possibly empty
        body: String,
    },

    /// The ceiling timeout elapsed before a response arrived.
    #[error("Request to {url} timed out after {timeout_ms} ms")]
    Timeout { url: String, timeout_ms: u64 },

    /// Network or HTTP client error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL cannot have path segments appended (e.g. `mailto:`).
    #[error("Base URL cannot be a base: {0}")]
    InvalidBaseUrl(String),

    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),
}
