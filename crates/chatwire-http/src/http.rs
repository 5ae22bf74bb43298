//! HTTP backend abstraction for the chat API.
//!
//! The backend executes one request and hands back either a decoded JSON
//! body or the raw response body as a byte stream. The production
//! implementation uses reqwest and retries idempotent reads on transient
//! errors; a fake backend is available for unit tests.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{HttpError, HttpResult};

/// Raw response body, chunk by chunk.
pub type BodyStream = BoxStream<'static, HttpResult<Bytes>>;

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }

    /// Only reads are safe to replay.
    pub const fn is_idempotent(self) -> bool {
        matches!(self, Self::Get)
    }
}

/// A fully resolved request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl Request {
    pub const fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            body: None,
            bearer: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

// ============================================================================
// HTTP Backend Trait
// ============================================================================

/// Trait for HTTP backends.
///
/// This is an implementation detail - external code talks to the client
/// through the core `ConversationApi` and `GenerationApi` ports.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// Execute a request and decode its JSON body. An empty body decodes
    /// to `Value::Null`.
    async fn json(&self, request: Request) -> HttpResult<Value>;

    /// Execute a request and return the body once the status is known to
    /// be a success.
    async fn stream(&self, request: Request) -> HttpResult<BodyStream>;
}

// ============================================================================
// Reqwest Backend
// ============================================================================

/// Production HTTP backend using reqwest with retry logic.
///
/// Implements exponential backoff for idempotent requests that fail with a
/// server error (5xx) or a network error.
pub struct ReqwestBackend {
    client: reqwest::Client,
    max_retries: u8,
    retry_base_delay: Duration,
}

impl ReqwestBackend {
    /// Create a new reqwest backend with the given configuration.
    ///
    /// No overall request timeout is set on the client: stream bodies may
    /// stay open far longer than any ceiling, which is applied per call by
    /// the chat client instead.
    pub fn new(config: &ClientConfig) -> HttpResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
        })
    }

    fn build_request(&self, request: &Request) -> reqwest::RequestBuilder {
        let builder = match request.method {
            Method::Get => self.client.get(request.url.as_str()),
            Method::Post => self.client.post(request.url.as_str()),
            Method::Delete => self.client.delete(request.url.as_str()),
        };
        let builder = match request.bearer.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        match request.body.as_ref() {
            Some(body) => builder.json(body),
            None => builder,
        }
    }

    /// Send a request, retrying transient failures of idempotent requests.
    async fn send_with_retry(&self, request: &Request) -> HttpResult<reqwest::Response> {
        let retries = if request.method.is_idempotent() {
            self.max_retries
        } else {
            0
        };

        let mut attempt: u8 = 0;
        loop {
            if attempt > 0 {
                let delay = self.retry_base_delay * 2u32.pow(u32::from(attempt) - 1);
                tokio::time::sleep(delay).await;
            }

            match self.build_request(request).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    if status.is_server_error() && attempt < retries {
                        tracing::debug!(
                            url = %request.url,
                            status = status.as_u16(),
                            attempt,
                            "retrying after server error"
                        );
                        attempt += 1;
                        continue;
                    }

                    let body = response.text().await.unwrap_or_default();
                    return Err(HttpError::Status {
                        status: status.as_u16(),
                        url: request.url.to_string(),
                        body,
                    });
                }
                Err(e) => {
                    if attempt < retries {
                        tracing::debug!(url = %request.url, attempt, error = %e, "retrying after network error");
                        attempt += 1;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn json(&self, request: Request) -> HttpResult<Value> {
        let response = self.send_with_retry(&request).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn stream(&self, request: Request) -> HttpResult<BodyStream> {
        let response = self.send_with_retry(&request).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(HttpError::from))
            .boxed())
    }
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Canned response for the fake backend.
    #[derive(Clone, Debug)]
    pub enum CannedResponse {
        Json(Value),
        Status { status: u16, body: String },
        Stream(Vec<&'static str>),
        /// Never answers within any realistic ceiling.
        Hang,
    }

    /// A fake HTTP backend that returns canned responses keyed by
    /// `"METHOD path"` substrings and records every request it sees.
    #[derive(Clone, Default)]
    pub struct FakeBackend {
        responses: Arc<Mutex<Vec<(String, CannedResponse)>>>,
        requests: Arc<Mutex<Vec<Request>>>,
    }

    impl FakeBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a canned response. Earlier patterns win.
        pub fn with_response(self, pattern: &str, response: CannedResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push((pattern.to_string(), response));
            self
        }

        pub fn requests(&self) -> Vec<Request> {
            self.requests.lock().unwrap().clone()
        }

        async fn respond(&self, request: Request) -> HttpResult<CannedResponse> {
            let key = format!("{} {}", request.method.as_str(), request.url.path());
            let url = request.url.to_string();
            self.requests.lock().unwrap().push(request);

            let found = self
                .responses
                .lock()
                .unwrap()
                .iter()
                .find(|(pattern, _)| key.contains(pattern.as_str()))
                .map(|(_, response)| response.clone());

            match found {
                Some(CannedResponse::Status { status, body }) => {
                    Err(HttpError::Status { status, url, body })
                }
                Some(CannedResponse::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(HttpError::Status {
                        status: 504,
                        url,
                        body: String::new(),
                    })
                }
                Some(response) => Ok(response),
                None => Err(HttpError::Status {
                    status: 404,
                    url,
                    body: String::new(),
                }),
            }
        }
    }

    #[async_trait]
    impl HttpBackend for FakeBackend {
        async fn json(&self, request: Request) -> HttpResult<Value> {
            match self.respond(request).await? {
                CannedResponse::Json(value) => Ok(value),
                other => panic!("canned response is not JSON: {other:?}"),
            }
        }

        async fn stream(&self, request: Request) -> HttpResult<BodyStream> {
            match self.respond(request).await? {
                CannedResponse::Stream(chunks) => Ok(futures_util::stream::iter(
                    chunks.into_iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))),
                )
                .boxed()),
                other => panic!("canned response is not a stream: {other:?}"),
            }
        }
    }
}
