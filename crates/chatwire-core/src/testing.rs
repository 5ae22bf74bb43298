//! In-memory fakes of the API ports.
//!
//! Available to this crate's tests and, behind the `test-utils` feature, to
//! downstream crates.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::domain::{
    Conversation, ConversationFilters, Message, MessageGroup, MessagePage, NewConversation, Page,
    PageCursor, Sender,
};
use crate::ports::{
    ApiError, ApiResult, ByteStream, ConversationApi, GenerationApi, GenerationReply,
    RegenerateRequest, SendRequest,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn conversation(uuid: &str) -> Conversation {
    let now = Utc::now();
    Conversation {
        uuid: uuid.to_string(),
        name: format!("Conversation {uuid}"),
        created_at: now,
        updated_at: now,
        project_uuid: None,
        model_id: None,
        is_archived: false,
    }
}

pub fn message(uuid: &str, content: &str, sender: Sender) -> Message {
    let now = Utc::now();
    Message {
        uuid: uuid.to_string(),
        content: content.to_string(),
        sender,
        model_name: (sender == Sender::Assistant).then(|| "model-a".to_string()),
        linked_files: None,
        created_at: now,
        updated_at: now,
        versions: None,
        current_version_index: None,
    }
}

/// Frame one event as an event-stream line.
pub fn sse_line(event: &serde_json::Value) -> String {
    format!("data: {event}\n\n")
}

/// Frame a sequence of events as one body.
pub fn sse_body(events: &[serde_json::Value]) -> String {
    events.iter().map(sse_line).collect()
}

// ============================================================================
// Generation
// ============================================================================

/// Live feed into a scripted stream. Dropping it ends the body.
#[derive(Debug, Clone)]
pub struct StreamFeed {
    tx: mpsc::UnboundedSender<Result<Bytes, ApiError>>,
}

impl StreamFeed {
    /// Push one event as its own read.
    pub fn event(&self, event: &serde_json::Value) {
        self.raw(&sse_line(event));
    }

    /// Push raw bytes as one read.
    pub fn raw(&self, text: &str) {
        let _ = self.tx.send(Ok(Bytes::copy_from_slice(text.as_bytes())));
    }

    /// Abort the body with a transport error.
    pub fn fail(&self, error: ApiError) {
        let _ = self.tx.send(Err(error));
    }
}

/// Scripted [`GenerationApi`]: each call pops the next queued response.
#[derive(Default)]
pub struct FakeGeneration {
    streams: Mutex<VecDeque<ApiResult<ByteStream>>>,
    replies: Mutex<VecDeque<ApiResult<GenerationReply>>>,
    sent: Mutex<Vec<SendRequest>>,
    regenerated: Mutex<Vec<RegenerateRequest>>,
}

impl FakeGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a body delivered as the given reads.
    pub fn push_chunks<I, S>(&self, chunks: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let reads: Vec<Result<Bytes, ApiError>> = chunks
            .into_iter()
            .map(|chunk| Ok(Bytes::from(chunk.into())))
            .collect();
        lock(&self.streams).push_back(Ok(futures_util::stream::iter(reads).boxed()));
    }

    /// Queue a body made of `events`, delivered in one read.
    pub fn push_events(&self, events: &[serde_json::Value]) {
        self.push_chunks([sse_body(events)]);
    }

    /// Queue a body fed live through the returned handle.
    pub fn push_feed(&self) -> StreamFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        let body = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        lock(&self.streams).push_back(Ok(body.boxed()));
        StreamFeed { tx }
    }

    /// Queue a failure to open the stream.
    pub fn push_stream_error(&self, error: ApiError) {
        lock(&self.streams).push_back(Err(error));
    }

    /// Queue the result of a non-streaming call.
    pub fn push_reply(&self, reply: ApiResult<GenerationReply>) {
        lock(&self.replies).push_back(reply);
    }

    pub fn sent(&self) -> Vec<SendRequest> {
        lock(&self.sent).clone()
    }

    pub fn regenerated(&self) -> Vec<RegenerateRequest> {
        lock(&self.regenerated).clone()
    }

    fn next_stream(&self) -> ApiResult<ByteStream> {
        lock(&self.streams)
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::transport("no scripted stream")))
    }

    fn next_reply(&self) -> ApiResult<GenerationReply> {
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::transport("no scripted reply")))
    }
}

#[async_trait]
impl GenerationApi for FakeGeneration {
    async fn stream_message(&self, request: &SendRequest) -> ApiResult<ByteStream> {
        lock(&self.sent).push(request.clone());
        self.next_stream()
    }

    async fn stream_regenerate(&self, request: &RegenerateRequest) -> ApiResult<ByteStream> {
        lock(&self.regenerated).push(request.clone());
        self.next_stream()
    }

    async fn send_message(&self, request: &SendRequest) -> ApiResult<GenerationReply> {
        lock(&self.sent).push(request.clone());
        self.next_reply()
    }

    async fn regenerate(&self, request: &RegenerateRequest) -> ApiResult<GenerationReply> {
        lock(&self.regenerated).push(request.clone());
        self.next_reply()
    }
}

// ============================================================================
// Persistence
// ============================================================================

/// Operations of [`FakeChatApi`], used to count calls and inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatOp {
    ListConversations,
    GetConversation,
    CreateConversation,
    DeleteConversation,
    ArchiveConversation,
    UnarchiveConversation,
    ListMessages,
}

/// In-memory [`ConversationApi`] backed by vectors.
///
/// Every call yields once before answering so concurrent callers interleave
/// the way they would against a real server.
#[derive(Default)]
pub struct FakeChatApi {
    conversations: Mutex<Vec<Conversation>>,
    groups: Mutex<HashMap<String, Vec<MessageGroup>>>,
    failures: Mutex<HashMap<ChatOp, ApiError>>,
    calls: Mutex<HashMap<ChatOp, usize>>,
}

impl FakeChatApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conversations(conversations: Vec<Conversation>) -> Self {
        let api = Self::new();
        *lock(&api.conversations) = conversations;
        api
    }

    pub fn add_conversation(&self, conversation: Conversation) {
        lock(&self.conversations).push(conversation);
    }

    /// Set a conversation's groups, oldest first.
    pub fn set_groups(&self, conversation_uuid: &str, groups: Vec<MessageGroup>) {
        lock(&self.groups).insert(conversation_uuid.to_string(), groups);
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: ChatOp, error: ApiError) {
        lock(&self.failures).insert(op, error);
    }

    pub fn calls(&self, op: ChatOp) -> usize {
        lock(&self.calls).get(&op).copied().unwrap_or(0)
    }

    pub fn stored(&self) -> Vec<Conversation> {
        lock(&self.conversations).clone()
    }

    async fn enter(&self, op: ChatOp) -> ApiResult<()> {
        *lock(&self.calls).entry(op).or_default() += 1;
        tokio::task::yield_now().await;
        lock(&self.failures).remove(&op).map_or(Ok(()), Err)
    }

    fn not_found(uuid: &str) -> ApiError {
        ApiError::NotFound {
            resource: format!("conversation {uuid}"),
        }
    }
}

fn paginate<T: Clone>(items: &[T], page: u32, per_page: u32) -> (Vec<T>, PageCursor) {
    let per_page = per_page.max(1);
    let total = items.len();
    let total_pages = u32::try_from(total.div_ceil(per_page as usize)).unwrap_or(u32::MAX);
    let cursor = PageCursor {
        page,
        per_page,
        total: total as u64,
        total_pages,
    };
    let skip = (page.saturating_sub(1) as usize).saturating_mul(per_page as usize);
    let data = items.iter().skip(skip).take(per_page as usize).cloned().collect();
    (data, cursor)
}

#[async_trait]
impl ConversationApi for FakeChatApi {
    async fn list_conversations(
        &self,
        page: u32,
        per_page: u32,
        filters: &ConversationFilters,
    ) -> ApiResult<Page<Conversation>> {
        self.enter(ChatOp::ListConversations).await?;
        let matching: Vec<Conversation> = lock(&self.conversations)
            .iter()
            .filter(|c| !c.is_archived)
            .filter(|c| {
                filters
                    .project_uuid
                    .as_ref()
                    .is_none_or(|p| c.project_uuid.as_ref() == Some(p))
            })
            .filter(|c| filters.search.as_ref().is_none_or(|s| c.name.contains(s.as_str())))
            .cloned()
            .collect();
        let (data, pagination) = paginate(&matching, page, per_page);
        Ok(Page { data, pagination })
    }

    async fn get_conversation(&self, uuid: &str) -> ApiResult<Option<Conversation>> {
        self.enter(ChatOp::GetConversation).await?;
        Ok(lock(&self.conversations)
            .iter()
            .find(|c| c.uuid == uuid)
            .cloned())
    }

    async fn create_conversation(&self, new: &NewConversation) -> ApiResult<Conversation> {
        self.enter(ChatOp::CreateConversation).await?;
        let mut created = conversation(&format!("conv-{}", uuid::Uuid::new_v4()));
        created.name.clone_from(&new.name);
        created.project_uuid.clone_from(&new.project_uuid);
        created.model_id.clone_from(&new.model_id);
        lock(&self.conversations).insert(0, created.clone());
        Ok(created)
    }

    async fn delete_conversation(&self, uuid: &str) -> ApiResult<()> {
        self.enter(ChatOp::DeleteConversation).await?;
        let mut conversations = lock(&self.conversations);
        let before = conversations.len();
        conversations.retain(|c| c.uuid != uuid);
        if conversations.len() == before {
            return Err(Self::not_found(uuid));
        }
        Ok(())
    }

    async fn archive_conversation(&self, uuid: &str) -> ApiResult<()> {
        self.enter(ChatOp::ArchiveConversation).await?;
        let mut conversations = lock(&self.conversations);
        let conversation = conversations
            .iter_mut()
            .find(|c| c.uuid == uuid)
            .ok_or_else(|| Self::not_found(uuid))?;
        conversation.is_archived = true;
        Ok(())
    }

    async fn unarchive_conversation(&self, uuid: &str) -> ApiResult<Conversation> {
        self.enter(ChatOp::UnarchiveConversation).await?;
        let mut conversations = lock(&self.conversations);
        let conversation = conversations
            .iter_mut()
            .find(|c| c.uuid == uuid)
            .ok_or_else(|| Self::not_found(uuid))?;
        conversation.is_archived = false;
        conversation.updated_at = Utc::now();
        Ok(conversation.clone())
    }

    /// Page 1 holds the newest groups; each page is in chronological order.
    async fn list_messages(
        &self,
        conversation_uuid: &str,
        page: u32,
        per_page: u32,
    ) -> ApiResult<MessagePage> {
        self.enter(ChatOp::ListMessages).await?;
        let mut newest_first = lock(&self.groups)
            .get(conversation_uuid)
            .cloned()
            .unwrap_or_default();
        newest_first.reverse();
        let (mut data, pagination) = paginate(&newest_first, page, per_page);
        data.reverse();
        Ok(Page { data, pagination })
    }
}
