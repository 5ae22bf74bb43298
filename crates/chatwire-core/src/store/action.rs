//! Typed mutations accepted by the store.
//!
//! Session-scoped actions carry the id of the session that produced them.
//! The reducer drops any whose id does not match the tracked session, so a
//! superseded stream can never write into its successor's state.

use uuid::Uuid;

use super::state::{SessionPhase, StreamTarget};
use crate::domain::{Conversation, ListScope, Message, Page, PageCursor};
use crate::stream::StreamMetadata;

/// Where a freshly loaded message page goes relative to the cached list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// First page: the page becomes the transcript.
    Replace,
    /// Older page: goes in front of what is already loaded.
    Prepend,
}

/// Every state change the store supports.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ---- conversations ----
    ConversationsLoading(bool),
    ConversationsLoaded {
        scope: ListScope,
        page: Page<Conversation>,
    },
    /// Insert or refresh one conversation, keeping its position if known.
    ConversationUpserted(Conversation),
    /// A new conversation goes to the top, replacing its optimistic entry.
    ConversationCreated {
        placeholder_uuid: Option<String>,
        conversation: Conversation,
    },
    /// Put a conversation back at a given position (delete rollback).
    ConversationRestored {
        conversation: Conversation,
        index: usize,
    },
    ConversationRemoved {
        uuid: String,
    },
    ConversationArchived {
        uuid: String,
    },
    ConversationUnarchived(Conversation),
    ConversationSelected(Option<String>),

    // ---- messages ----
    MessagesLoading {
        conversation_uuid: String,
        loading: bool,
    },
    MessagesLoaded {
        conversation_uuid: String,
        messages: Vec<Message>,
        cursor: PageCursor,
        placement: Placement,
    },
    /// Upsert by uuid; `None` is a no-op.
    MessageAdded {
        conversation_uuid: String,
        message: Option<Message>,
    },
    MessageRemoved {
        conversation_uuid: String,
        message_uuid: String,
    },
    MessageContentUpdated {
        conversation_uuid: String,
        message_uuid: String,
        content: String,
    },
    VersionAppended {
        conversation_uuid: String,
        message_uuid: String,
        version: Message,
    },
    VersionSwitched {
        conversation_uuid: String,
        message_uuid: String,
        index: usize,
    },

    // ---- streaming session ----
    SessionStarted {
        session_id: Uuid,
        conversation_uuid: String,
        target: StreamTarget,
    },
    SessionPhaseChanged {
        session_id: Uuid,
        phase: SessionPhase,
    },
    InitialContentCommitted {
        session_id: Uuid,
        text: String,
    },
    ContentCommitted {
        session_id: Uuid,
        content: String,
    },
    SessionMetadataUpdated {
        session_id: Uuid,
        metadata: StreamMetadata,
    },
    SessionFinished {
        session_id: Uuid,
    },
    SessionFailed {
        session_id: Uuid,
        error: String,
    },
    SessionAborted {
        session_id: Uuid,
    },

    ErrorSet(Option<String>),
}

impl Action {
    /// Session the action belongs to, if it is session-scoped.
    pub const fn session_id(&self) -> Option<Uuid> {
        match self {
            Self::SessionStarted { session_id, .. }
            | Self::SessionPhaseChanged { session_id, .. }
            | Self::InitialContentCommitted { session_id, .. }
            | Self::ContentCommitted { session_id, .. }
            | Self::SessionMetadataUpdated { session_id, .. }
            | Self::SessionFinished { session_id }
            | Self::SessionFailed { session_id, .. }
            | Self::SessionAborted { session_id } => Some(*session_id),
            _ => None,
        }
    }
}
