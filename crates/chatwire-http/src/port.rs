//! Port trait implementations for `ChatClient`.
//!
//! This module implements the core-owned `ConversationApi` and
//! `GenerationApi` traits, converting internal HTTP errors to `ApiError`.

use async_trait::async_trait;
use chatwire_core::{
    ApiError, ApiResult, ByteStream, Conversation, ConversationApi, ConversationFilters,
    GenerationApi, GenerationReply, MessagePage, NewConversation, Page, RegenerateRequest,
    SendRequest,
};
use futures_util::StreamExt;

use crate::client::ChatClient;
use crate::error::HttpError;
use crate::http::{BodyStream, HttpBackend};

// ============================================================================
// Error Mapping
// ============================================================================

/// Convert internal `HttpError` to core `ApiError`.
fn map_error(err: HttpError) -> ApiError {
    match err {
        HttpError::Status { status, url, body } => match status {
            401 | 403 => ApiError::Unauthorized,
            404 => ApiError::NotFound { resource: url },
            _ => {
                let body = body.trim();
                ApiError::Status {
                    status,
                    message: if body.is_empty() {
                        url
                    } else {
                        body.to_string()
                    },
                }
            }
        },
        HttpError::Timeout { timeout_ms, .. } => ApiError::Timeout { timeout_ms },
        HttpError::Network(e) if e.is_decode() => ApiError::Decode {
            message: e.to_string(),
        },
        HttpError::Network(e) => ApiError::Transport {
            message: e.to_string(),
        },
        HttpError::InvalidUrl(e) => ApiError::Transport {
            message: format!("invalid URL: {e}"),
        },
        HttpError::InvalidBaseUrl(url) => ApiError::Transport {
            message: format!("invalid base URL: {url}"),
        },
        HttpError::JsonParse(e) => ApiError::Decode {
            message: e.to_string(),
        },
    }
}

fn into_byte_stream(body: BodyStream) -> ByteStream {
    body.map(|chunk| chunk.map_err(map_error)).boxed()
}

// ============================================================================
// Port Implementations
// ============================================================================

#[async_trait]
impl<B: HttpBackend> ConversationApi for ChatClient<B> {
    async fn list_conversations(
        &self,
        page: u32,
        per_page: u32,
        filters: &ConversationFilters,
    ) -> ApiResult<Page<Conversation>> {
        Self::list_conversations(self, page, per_page, filters)
            .await
            .map_err(map_error)
    }

    async fn get_conversation(&self, uuid: &str) -> ApiResult<Option<Conversation>> {
        match Self::get_conversation(self, uuid).await {
            Ok(conversation) => Ok(Some(conversation)),
            Err(HttpError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(map_error(e)),
        }
    }

    async fn create_conversation(&self, new: &NewConversation) -> ApiResult<Conversation> {
        Self::create_conversation(self, new).await.map_err(map_error)
    }

    async fn delete_conversation(&self, uuid: &str) -> ApiResult<()> {
        Self::delete_conversation(self, uuid).await.map_err(map_error)
    }

    async fn archive_conversation(&self, uuid: &str) -> ApiResult<()> {
        Self::archive_conversation(self, uuid).await.map_err(map_error)
    }

    async fn unarchive_conversation(&self, uuid: &str) -> ApiResult<Conversation> {
        Self::unarchive_conversation(self, uuid)
            .await
            .map_err(map_error)
    }

    async fn list_messages(
        &self,
        conversation_uuid: &str,
        page: u32,
        per_page: u32,
    ) -> ApiResult<MessagePage> {
        Self::list_messages(self, conversation_uuid, page, per_page)
            .await
            .map_err(map_error)
    }
}

#[async_trait]
impl<B: HttpBackend> GenerationApi for ChatClient<B> {
    async fn stream_message(&self, request: &SendRequest) -> ApiResult<ByteStream> {
        Self::stream_message(self, request)
            .await
            .map(into_byte_stream)
            .map_err(map_error)
    }

    async fn stream_regenerate(&self, request: &RegenerateRequest) -> ApiResult<ByteStream> {
        Self::stream_regenerate(self, request)
            .await
            .map(into_byte_stream)
            .map_err(map_error)
    }

    async fn send_message(&self, request: &SendRequest) -> ApiResult<GenerationReply> {
        Self::send_message(self, request).await.map_err(map_error)
    }

    async fn regenerate(&self, request: &RegenerateRequest) -> ApiResult<GenerationReply> {
        Self::regenerate(self, request).await.map_err(map_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::http::testing::{CannedResponse, FakeBackend};
    use serde_json::json;

    fn client(backend: FakeBackend) -> ChatClient<FakeBackend> {
        ChatClient::with_backend(
            backend,
            &ClientConfig::new().with_base_url("http://localhost/api"),
        )
        .unwrap()
    }

    fn status(status: u16, body: &str) -> CannedResponse {
        CannedResponse::Status {
            status,
            body: body.to_string(),
        }
    }

    fn conversation_json(uuid: &str) -> serde_json::Value {
        json!({
            "uuid": uuid,
            "name": "Chat",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z"
        })
    }

    #[test]
    fn test_map_error_statuses() {
        let err = |status, body: &str| HttpError::Status {
            status,
            url: "http://localhost/api/chat".to_string(),
            body: body.to_string(),
        };

        assert_eq!(map_error(err(401, "")), ApiError::Unauthorized);
        assert_eq!(map_error(err(403, "nope")), ApiError::Unauthorized);
        assert!(matches!(map_error(err(404, "")), ApiError::NotFound { .. }));
        assert_eq!(
            map_error(err(500, " overloaded \n")),
            ApiError::Status {
                status: 500,
                message: "overloaded".to_string()
            }
        );
        assert_eq!(
            map_error(err(502, "")),
            ApiError::Status {
                status: 502,
                message: "http://localhost/api/chat".to_string()
            }
        );
        assert_eq!(
            map_error(HttpError::Timeout {
                url: String::new(),
                timeout_ms: 30_000
            }),
            ApiError::Timeout { timeout_ms: 30_000 }
        );
    }

    #[test]
    fn test_map_error_json() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(
            map_error(HttpError::JsonParse(parse)),
            ApiError::Decode { .. }
        ));
    }

    #[tokio::test]
    async fn test_list_conversations_decodes_page() {
        let backend = FakeBackend::new().with_response(
            "GET /api/conversations",
            CannedResponse::Json(json!({
                "data": [conversation_json("c-1"), conversation_json("c-2")],
                "pagination": {"page": 1, "per_page": 2, "total": 3, "total_pages": 2}
            })),
        );
        let client = client(backend);

        let page = ConversationApi::list_conversations(&client, 1, 2, &ConversationFilters::default())
            .await
            .unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[1].uuid, "c-2");
        assert!(page.pagination.has_more());
    }

    #[tokio::test]
    async fn test_get_conversation_not_found_is_none() {
        let backend = FakeBackend::new()
            .with_response("GET /api/conversations/gone", status(404, "missing"))
            .with_response(
                "GET /api/conversations/c-1",
                CannedResponse::Json(conversation_json("c-1")),
            );
        let client = client(backend);

        assert_eq!(
            ConversationApi::get_conversation(&client, "gone").await,
            Ok(None)
        );
        let found = ConversationApi::get_conversation(&client, "c-1")
            .await
            .unwrap();
        assert_eq!(found.map(|c| c.uuid).as_deref(), Some("c-1"));
    }

    #[tokio::test]
    async fn test_unauthorized_list() {
        let backend =
            FakeBackend::new().with_response("GET /api/conversations", status(401, "expired"));
        let err = ConversationApi::list_conversations(
            &client(backend),
            1,
            30,
            &ConversationFilters::default(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, ApiError::Unauthorized);
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let backend = FakeBackend::new().with_response(
            "GET /api/conversations/c-1/messages",
            CannedResponse::Json(json!({"data": "not a list"})),
        );
        let err = ConversationApi::list_messages(&client(backend), "c-1", 1, 20)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_archive_ignores_empty_body() {
        let backend = FakeBackend::new()
            .with_response("POST /api/conversations/c-1/archive", CannedResponse::Json(serde_json::Value::Null))
            .with_response(
                "POST /api/conversations/c-1/unarchive",
                CannedResponse::Json(conversation_json("c-1")),
            );
        let client = client(backend.clone());

        tokio_test::assert_ok!(ConversationApi::archive_conversation(&client, "c-1").await);
        let restored = ConversationApi::unarchive_conversation(&client, "c-1")
            .await
            .unwrap();
        assert_eq!(restored.uuid, "c-1");
        assert_eq!(backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_stream_error_status_is_not_a_stream() {
        let backend =
            FakeBackend::new().with_response("POST /api/chat", status(429, "slow down"));
        let request = SendRequest::new("c-1", "Hello", "model-a");

        let err = GenerationApi::stream_message(&client(backend), &request)
            .await
            .err()
            .unwrap();
        assert_eq!(
            err,
            ApiError::Status {
                status: 429,
                message: "slow down".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_stream_regenerate_yields_body() {
        let backend = FakeBackend::new().with_response(
            "POST /api/chat/regenerate",
            CannedResponse::Stream(vec!["data: {\"type\":", "\"content\"}\n\n"]),
        );
        let request = RegenerateRequest {
            message_uuid: "m-1".to_string(),
            model_id: "model-b".to_string(),
            conversation_uuid: "c-1".to_string(),
        };

        let chunks: Vec<_> = GenerationApi::stream_regenerate(&client(backend.clone()), &request)
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(Result::is_ok));
        assert_eq!(backend.requests()[0].body.as_ref().unwrap()["message_uuid"], "m-1");
    }

    #[tokio::test]
    async fn test_send_message_without_stream() {
        let backend = FakeBackend::new().with_response(
            "POST /api/chat",
            CannedResponse::Json(json!({
                "message": {
                    "uuid": "m-9",
                    "content": "Hi!",
                    "sender": "assistant",
                    "model_name": "model-a"
                },
                "selected_model": "model-a"
            })),
        );
        let request = SendRequest::new("c-1", "Hello", "model-a");

        let reply = GenerationApi::send_message(&client(backend.clone()), &request)
            .await
            .unwrap();
        assert_eq!(reply.message.unwrap().content, "Hi!");
        assert_eq!(reply.metadata.selected_model.as_deref(), Some("model-a"));
        assert_eq!(backend.requests()[0].body.as_ref().unwrap()["stream"], false);
    }
}
