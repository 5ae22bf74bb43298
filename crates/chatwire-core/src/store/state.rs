//! State held by the store.
//!
//! Everything the UI reads lives here. The state is plain data: cloning it
//! gives a consistent snapshot, and only the reducer ever changes it.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use uuid::Uuid;

use crate::domain::{Conversation, ListScope, Message, PageCursor};
use crate::stream::StreamMetadata;

/// Lifecycle of a send or regenerate session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    /// Request submitted, stream not yet open.
    Sending,
    /// Only preview text has arrived.
    StreamingPreview,
    /// Real content is arriving.
    StreamingFinal,
    /// Terminal event received, transcript being reconciled.
    Completing,
    /// Cancelled or superseded before completion.
    Aborted,
}

impl SessionPhase {
    /// Whether a session is in flight.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::Sending | Self::StreamingPreview | Self::StreamingFinal | Self::Completing
        )
    }

    pub const fn is_streaming(self) -> bool {
        matches!(self, Self::StreamingPreview | Self::StreamingFinal)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub const fn can_transition(self, next: Self) -> bool {
        use SessionPhase::{Aborted, Completing, Idle, Sending, StreamingFinal, StreamingPreview};
        matches!(
            (self, next),
            (Idle | Aborted, Sending)
                | (Sending, StreamingPreview | StreamingFinal | Completing)
                | (StreamingPreview, StreamingPreview | StreamingFinal | Completing)
                | (StreamingFinal, StreamingFinal | Completing)
                | (Sending | StreamingPreview | StreamingFinal, Aborted)
                | (Completing, Idle)
        )
    }
}

/// What a session's result will become.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTarget {
    /// A new transcript entry; the optimistic user message awaits replacement.
    NewMessage { placeholder_uuid: String },
    /// An additional version of an existing message.
    Version { message_uuid: String },
}

/// Transient state of the session currently tracked by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamingState {
    pub session_id: Option<Uuid>,
    pub conversation_uuid: Option<String>,
    pub target: Option<StreamTarget>,
    pub phase: SessionPhase,
    /// Committed real content.
    pub content: String,
    /// Committed preview text, only shown before real content starts.
    pub initial_content: String,
    pub real_content_started: bool,
    pub metadata: StreamMetadata,
}

impl StreamingState {
    pub const fn is_streaming(&self) -> bool {
        self.phase.is_active()
    }

    /// Text the UI should show for the in-flight reply.
    pub fn visible_text(&self) -> &str {
        if self.real_content_started {
            &self.content
        } else {
            &self.initial_content
        }
    }

    pub(crate) fn is_session(&self, session_id: Uuid) -> bool {
        self.session_id == Some(session_id)
    }
}

/// The whole client-side view of conversations and messages.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Active (non-archived) conversations in display order.
    pub conversations: IndexMap<String, Conversation>,
    /// Conversations hidden by archive, kept for reversal.
    pub archived: IndexMap<String, Conversation>,
    pub conversation_cursors: HashMap<ListScope, PageCursor>,
    pub current_conversation: Option<String>,
    /// Ordered transcript per conversation, oldest first.
    pub messages: HashMap<String, Vec<Message>>,
    pub message_cursors: HashMap<String, PageCursor>,
    /// Session state per conversation; at most one session each.
    pub streams: HashMap<String, StreamingState>,
    /// Last transport or application error shown to the user.
    pub error: Option<String>,
    pub loading_conversations: bool,
    pub loading_messages: HashSet<String>,
}

impl AppState {
    /// The selected conversation, if it is in the active set.
    pub fn current(&self) -> Option<&Conversation> {
        self.current_conversation
            .as_ref()
            .and_then(|uuid| self.conversations.get(uuid))
    }

    pub fn conversation(&self, uuid: &str) -> Option<&Conversation> {
        self.conversations.get(uuid)
    }

    /// Transcript of a conversation; empty when nothing is loaded.
    pub fn messages_for(&self, conversation_uuid: &str) -> &[Message] {
        self.messages
            .get(conversation_uuid)
            .map_or(&[], Vec::as_slice)
    }

    pub fn has_messages(&self, conversation_uuid: &str) -> bool {
        self.messages.contains_key(conversation_uuid)
    }

    pub fn find_message(&self, conversation_uuid: &str, message_uuid: &str) -> Option<&Message> {
        self.messages_for(conversation_uuid)
            .iter()
            .find(|m| m.uuid == message_uuid)
    }

    pub fn conversation_cursor(&self, scope: &ListScope) -> Option<&PageCursor> {
        self.conversation_cursors.get(scope)
    }

    pub fn message_cursor(&self, conversation_uuid: &str) -> Option<&PageCursor> {
        self.message_cursors.get(conversation_uuid)
    }

    pub fn streaming(&self, conversation_uuid: &str) -> Option<&StreamingState> {
        self.streams.get(conversation_uuid)
    }

    /// Whether a session is in flight for the conversation.
    pub fn is_streaming(&self, conversation_uuid: &str) -> bool {
        self.streaming(conversation_uuid)
            .is_some_and(StreamingState::is_streaming)
    }

    pub(crate) fn session_mut(&mut self, session_id: Uuid) -> Option<&mut StreamingState> {
        self.streams.values_mut().find(|s| s.is_session(session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        use SessionPhase::*;
        assert!(Idle.can_transition(Sending));
        assert!(Sending.can_transition(StreamingPreview));
        assert!(StreamingPreview.can_transition(StreamingFinal));
        assert!(StreamingFinal.can_transition(Completing));
        assert!(Completing.can_transition(Idle));
        assert!(StreamingFinal.can_transition(Aborted));

        assert!(!StreamingFinal.can_transition(StreamingPreview));
        assert!(!Idle.can_transition(Completing));
        assert!(!Completing.can_transition(Aborted));
        assert!(!Aborted.can_transition(StreamingFinal));
    }

    #[test]
    fn test_visible_text_prefers_real_content() {
        let mut streaming = StreamingState {
            initial_content: "preview".to_string(),
            ..Default::default()
        };
        assert_eq!(streaming.visible_text(), "preview");

        streaming.real_content_started = true;
        streaming.content = "real".to_string();
        assert_eq!(streaming.visible_text(), "real");
    }
}
