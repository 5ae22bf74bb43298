//! Public configuration for the chat API client.

use std::time::Duration;

/// Configuration for [`crate::DefaultChatClient`].
///
/// # Example
///
/// ```
/// use chatwire_http::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new()
///     .with_base_url("https://chat.example.com/api")
///     .with_timeout(Duration::from_secs(60))
///     .with_user_agent("my-app/1.0");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to
    pub(crate) base_url: String,
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
    /// Ceiling for non-streaming requests and for opening a stream
    pub(crate) timeout: Duration,
    /// Connection establishment timeout
    pub(crate) connect_timeout: Duration,
    /// Bearer token used when no token provider is supplied
    pub(crate) token: Option<String>,
    /// Retry attempts for idempotent reads that hit a transient error
    pub(crate) max_retries: u8,
    /// Base delay for exponential backoff
    pub(crate) retry_base_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            user_agent: concat!("chatwire/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            token: None,
            max_retries: 2,
            retry_base_delay: Duration::from_millis(250),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL of the chat API.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the ceiling timeout.
    ///
    /// Defaults to 30 seconds. Stream bodies are not subject to it once open.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_optional_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Set the retry budget for idempotent reads. Writes and generation
    /// requests are never retried.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }
}
