//! Conversation persistence port.
//!
//! This port defines the paginated list/get/create/delete/archive
//! interface of the backend that owns conversations and messages.

use async_trait::async_trait;

use super::error::ApiResult;
use crate::domain::{Conversation, ConversationFilters, MessagePage, NewConversation, Page};

/// Port for conversation and message persistence.
///
/// Implementations handle the actual transport (HTTP, in-memory fakes).
/// A missing conversation is reported as `Ok(None)` by `get_conversation`
/// rather than as an error.
#[async_trait]
pub trait ConversationApi: Send + Sync {
    /// List one page of conversations, most recently updated first.
    async fn list_conversations(
        &self,
        page: u32,
        per_page: u32,
        filters: &ConversationFilters,
    ) -> ApiResult<Page<Conversation>>;

    /// Get a specific conversation by uuid.
    async fn get_conversation(&self, uuid: &str) -> ApiResult<Option<Conversation>>;

    /// Create a new conversation.
    async fn create_conversation(&self, new: &NewConversation) -> ApiResult<Conversation>;

    /// Delete a conversation.
    async fn delete_conversation(&self, uuid: &str) -> ApiResult<()>;

    /// Hide a conversation from the active list.
    async fn archive_conversation(&self, uuid: &str) -> ApiResult<()>;

    /// Restore an archived conversation, returning the server's copy.
    async fn unarchive_conversation(&self, uuid: &str) -> ApiResult<Conversation>;

    /// Get one page of grouped messages. Page 1 holds the newest messages.
    async fn list_messages(
        &self,
        conversation_uuid: &str,
        page: u32,
        per_page: u32,
    ) -> ApiResult<MessagePage>;
}
