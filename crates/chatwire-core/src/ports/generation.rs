//! AI generation port.
//!
//! Generation can be consumed either as an open byte stream carrying the
//! event-stream protocol, or as a single JSON reply.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};
use crate::domain::Message;
use crate::stream::StreamMetadata;

/// Raw body of a streaming response.
pub type ByteStream = BoxStream<'static, Result<Bytes, ApiError>>;

/// A user message submitted for generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendRequest {
    pub query: String,
    pub conversation_uuid: String,
    pub model_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_uuids: Vec<String>,
}

impl SendRequest {
    pub fn new(
        conversation_uuid: impl Into<String>,
        query: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            conversation_uuid: conversation_uuid.into(),
            model_id: model_id.into(),
            file_uuids: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_files(mut self, file_uuids: Vec<String>) -> Self {
        self.file_uuids = file_uuids;
        self
    }
}

/// A request for another version of an existing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegenerateRequest {
    pub message_uuid: String,
    pub model_id: String,
    pub conversation_uuid: String,
}

/// Reply of a non-streaming generation call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerationReply {
    /// The persisted message; absent when the server suppressed the reply.
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(flatten)]
    pub metadata: StreamMetadata,
}

/// Port for the AI generation backend.
#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// Submit a message and open the response event stream.
    ///
    /// Non-success statuses are returned as `Err`, never as a stream.
    async fn stream_message(&self, request: &SendRequest) -> ApiResult<ByteStream>;

    /// Regenerate a message and open the response event stream.
    async fn stream_regenerate(&self, request: &RegenerateRequest) -> ApiResult<ByteStream>;

    /// Submit a message and wait for the whole reply.
    async fn send_message(&self, request: &SendRequest) -> ApiResult<GenerationReply>;

    /// Regenerate a message and wait for the whole reply.
    async fn regenerate(&self, request: &RegenerateRequest) -> ApiResult<GenerationReply>;
}
