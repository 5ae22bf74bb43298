//! Page-based fetching of conversation lists and message pages.
//!
//! Conversations page forward ("load more"); messages page backward, page 1
//! being the newest and later pages holding older history.

use std::sync::Arc;

use tracing::debug;

use crate::domain::{Conversation, ConversationFilters, Message, Page, PageCursor};
use crate::ports::{ApiResult, ConversationApi};
use crate::settings::SessionSettings;
use crate::versioning::flatten_groups;

/// One fetched message page, already flattened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBatch {
    pub messages: Vec<Message>,
    pub cursor: PageCursor,
}

/// Wraps the list endpoints with cursor bookkeeping.
pub struct PaginationController {
    api: Arc<dyn ConversationApi>,
    conversations_per_page: u32,
    messages_per_page: u32,
}

impl PaginationController {
    pub fn new(api: Arc<dyn ConversationApi>, settings: &SessionSettings) -> Self {
        Self {
            api,
            conversations_per_page: settings.effective_conversations_per_page(),
            messages_per_page: settings.effective_messages_per_page(),
        }
    }

    /// Fetch one page of the conversation list.
    pub async fn conversations(
        &self,
        page: u32,
        filters: &ConversationFilters,
    ) -> ApiResult<Page<Conversation>> {
        let page = page.max(1);
        debug!(page, per_page = self.conversations_per_page, "Fetching conversations");
        self.api
            .list_conversations(page, self.conversations_per_page, filters)
            .await
    }

    /// Fetch the page after `cursor`, or `None` once the list is exhausted.
    pub async fn more_conversations(
        &self,
        cursor: &PageCursor,
        filters: &ConversationFilters,
    ) -> ApiResult<Option<Page<Conversation>>> {
        match cursor.next_page() {
            Some(page) => self.conversations(page, filters).await.map(Some),
            None => Ok(None),
        }
    }

    /// Fetch the newest message page of a conversation.
    pub async fn latest_messages(&self, conversation_uuid: &str) -> ApiResult<MessageBatch> {
        self.messages(conversation_uuid, 1).await
    }

    /// Fetch the page of older messages after `cursor`, or `None` once
    /// `page >= total_pages`.
    pub async fn older_messages(
        &self,
        conversation_uuid: &str,
        cursor: &PageCursor,
    ) -> ApiResult<Option<MessageBatch>> {
        match cursor.next_page() {
            Some(page) => self.messages(conversation_uuid, page).await.map(Some),
            None => Ok(None),
        }
    }

    async fn messages(&self, conversation_uuid: &str, page: u32) -> ApiResult<MessageBatch> {
        debug!(conversation = %conversation_uuid, page, "Fetching messages");
        let fetched = self
            .api
            .list_messages(conversation_uuid, page, self.messages_per_page)
            .await?;
        Ok(MessageBatch {
            messages: flatten_groups(&fetched.data),
            cursor: fetched.pagination,
        })
    }
}
