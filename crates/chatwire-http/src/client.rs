//! Chat API client.
//!
//! `ChatClient` resolves endpoints, attaches the bearer credential and
//! enforces the ceiling timeout. Typed calls return the internal
//! `HttpError`; the port implementations map it to `ApiError`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chatwire_core::{
    Conversation, ConversationFilters, GenerationReply, MessagePage, NewConversation, Page,
    RegenerateRequest, SendRequest, StaticToken, TokenProvider,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{HttpError, HttpResult};
use crate::http::{BodyStream, HttpBackend, Method, Request, ReqwestBackend};
use crate::url::ChatUrls;

/// Default chat client using the reqwest HTTP backend.
pub type DefaultChatClient = ChatClient<ReqwestBackend>;

/// Generation request body with the streaming flag set explicitly.
#[derive(Serialize)]
struct GenerationBody<'a, T: Serialize> {
    #[serde(flatten)]
    request: &'a T,
    stream: bool,
}

/// Client for the chat backend, generic over its HTTP backend.
///
/// Use [`DefaultChatClient`] in production code.
pub struct ChatClient<B: HttpBackend> {
    pub(crate) backend: B,
    urls: ChatUrls,
    tokens: Arc<dyn TokenProvider>,
    timeout: Duration,
}

impl DefaultChatClient {
    /// Create a client from configuration.
    ///
    /// The configured token, if any, is used until a token provider is
    /// installed with [`ChatClient::with_token_provider`].
    pub fn new(config: &ClientConfig) -> HttpResult<Self> {
        let backend = ReqwestBackend::new(config)?;
        Self::with_backend(backend, config)
    }
}

impl<B: HttpBackend> ChatClient<B> {
    /// Create a client over a custom backend.
    pub fn with_backend(backend: B, config: &ClientConfig) -> HttpResult<Self> {
        let tokens: Arc<dyn TokenProvider> = Arc::new(
            config
                .token
                .clone()
                .map_or_else(StaticToken::anonymous, StaticToken::new),
        );
        Ok(Self {
            backend,
            urls: ChatUrls::parse(&config.base_url)?,
            tokens,
            timeout: config.timeout,
        })
    }

    /// Replace the credential source.
    #[must_use]
    pub fn with_token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = tokens;
        self
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn request(&self, method: Method, url: Url) -> Request {
        Request::new(method, url).with_bearer(self.tokens.current_token())
    }

    /// Run `fut` under the ceiling timeout.
    async fn within<T>(&self, url: &Url, fut: impl Future<Output = HttpResult<T>>) -> HttpResult<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .unwrap_or_else(|_| {
                tracing::warn!(url = %url, timeout = ?self.timeout, "request timed out");
                Err(HttpError::Timeout {
                    url: url.to_string(),
                    timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                })
            })
    }

    async fn fetch<T: DeserializeOwned>(&self, request: Request) -> HttpResult<T> {
        let url = request.url.clone();
        let value = self.within(&url, self.backend.json(request)).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn execute(&self, request: Request) -> HttpResult<()> {
        let url = request.url.clone();
        self.within(&url, self.backend.json(request)).await.map(drop)
    }

    /// Open a stream. Only the time until response headers counts against
    /// the ceiling.
    async fn open(&self, request: Request) -> HttpResult<BodyStream> {
        let url = request.url.clone();
        self.within(&url, self.backend.stream(request)).await
    }

    fn generation_body<T: Serialize>(request: &T, stream: bool) -> HttpResult<Value> {
        Ok(serde_json::to_value(GenerationBody { request, stream })?)
    }

    // ------------------------------------------------------------------------
    // Conversations
    // ------------------------------------------------------------------------

    pub async fn list_conversations(
        &self,
        page: u32,
        per_page: u32,
        filters: &ConversationFilters,
    ) -> HttpResult<Page<Conversation>> {
        let url = self.urls.conversations(page, per_page, filters);
        self.fetch(self.request(Method::Get, url)).await
    }

    pub async fn get_conversation(&self, uuid: &str) -> HttpResult<Conversation> {
        let url = self.urls.conversation(uuid);
        self.fetch(self.request(Method::Get, url)).await
    }

    pub async fn create_conversation(&self, new: &NewConversation) -> HttpResult<Conversation> {
        let request = self
            .request(Method::Post, self.urls.create_conversation())
            .with_body(serde_json::to_value(new)?);
        self.fetch(request).await
    }

    pub async fn delete_conversation(&self, uuid: &str) -> HttpResult<()> {
        let url = self.urls.conversation(uuid);
        self.execute(self.request(Method::Delete, url)).await
    }

    pub async fn archive_conversation(&self, uuid: &str) -> HttpResult<()> {
        let url = self.urls.archive(uuid);
        self.execute(self.request(Method::Post, url)).await
    }

    pub async fn unarchive_conversation(&self, uuid: &str) -> HttpResult<Conversation> {
        let url = self.urls.unarchive(uuid);
        self.fetch(self.request(Method::Post, url)).await
    }

    pub async fn list_messages(
        &self,
        conversation_uuid: &str,
        page: u32,
        per_page: u32,
    ) -> HttpResult<MessagePage> {
        let url = self.urls.messages(conversation_uuid, page, per_page);
        self.fetch(self.request(Method::Get, url)).await
    }

    // ------------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------------

    pub async fn stream_message(&self, request: &SendRequest) -> HttpResult<BodyStream> {
        let body = Self::generation_body(request, true)?;
        tracing::debug!(conversation = %request.conversation_uuid, "opening chat stream");
        self.open(self.request(Method::Post, self.urls.chat()).with_body(body))
            .await
    }

    pub async fn stream_regenerate(&self, request: &RegenerateRequest) -> HttpResult<BodyStream> {
        let body = Self::generation_body(request, true)?;
        tracing::debug!(message = %request.message_uuid, "opening regenerate stream");
        self.open(self.request(Method::Post, self.urls.regenerate()).with_body(body))
            .await
    }

    pub async fn send_message(&self, request: &SendRequest) -> HttpResult<GenerationReply> {
        let body = Self::generation_body(request, false)?;
        self.fetch(self.request(Method::Post, self.urls.chat()).with_body(body))
            .await
    }

    pub async fn regenerate(&self, request: &RegenerateRequest) -> HttpResult<GenerationReply> {
        let body = Self::generation_body(request, false)?;
        self.fetch(self.request(Method::Post, self.urls.regenerate()).with_body(body))
            .await
    }
}
