//! Pure state transitions.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::action::{Action, Placement};
use super::state::{AppState, SessionPhase, StreamingState};
use crate::domain::{Conversation, ListScope, Message, Page};

/// Apply one action to a state, returning the next state.
pub fn reduce(mut state: AppState, action: Action) -> AppState {
    match action {
        Action::ConversationsLoading(loading) => state.loading_conversations = loading,
        Action::ConversationsLoaded { scope, page } => load_conversations(&mut state, scope, page),
        Action::ConversationUpserted(conversation) => upsert_conversation(&mut state, conversation),
        Action::ConversationCreated {
            placeholder_uuid,
            conversation,
        } => {
            if let Some(placeholder) = placeholder_uuid {
                state.conversations.shift_remove(&placeholder);
            }
            state
                .conversations
                .shift_insert(0, conversation.uuid.clone(), conversation);
        }
        Action::ConversationRestored {
            mut conversation,
            index,
        } => {
            state.archived.shift_remove(&conversation.uuid);
            conversation.is_archived = false;
            let index = index.min(state.conversations.len());
            state
                .conversations
                .shift_insert(index, conversation.uuid.clone(), conversation);
        }
        Action::ConversationRemoved { uuid } => {
            state.conversations.shift_remove(&uuid);
            state.archived.shift_remove(&uuid);
            state.messages.remove(&uuid);
            state.message_cursors.remove(&uuid);
            state.loading_messages.remove(&uuid);
            clear_selection(&mut state, &uuid);
        }
        Action::ConversationArchived { uuid } => {
            if let Some(mut conversation) = state.conversations.shift_remove(&uuid) {
                conversation.is_archived = true;
                state.archived.insert(uuid.clone(), conversation);
            }
            clear_selection(&mut state, &uuid);
        }
        Action::ConversationUnarchived(mut conversation) => {
            state.archived.shift_remove(&conversation.uuid);
            conversation.is_archived = false;
            state
                .conversations
                .shift_insert(0, conversation.uuid.clone(), conversation);
        }
        Action::ConversationSelected(uuid) => state.current_conversation = uuid,

        Action::MessagesLoading {
            conversation_uuid,
            loading,
        } => {
            if loading {
                state.loading_messages.insert(conversation_uuid);
            } else {
                state.loading_messages.remove(&conversation_uuid);
            }
        }
        Action::MessagesLoaded {
            conversation_uuid,
            messages,
            cursor,
            placement,
        } => {
            let loaded = dedup_by_uuid(messages);
            let list = state.messages.entry(conversation_uuid.clone()).or_default();
            match placement {
                Placement::Replace => *list = loaded,
                Placement::Prepend => {
                    let known: HashSet<&str> = list.iter().map(|m| m.uuid.as_str()).collect();
                    let mut merged: Vec<Message> = loaded
                        .into_iter()
                        .filter(|m| !known.contains(m.uuid.as_str()))
                        .collect();
                    merged.append(list);
                    *list = merged;
                }
            }
            state.message_cursors.insert(conversation_uuid.clone(), cursor);
            state.loading_messages.remove(&conversation_uuid);
        }
        Action::MessageAdded {
            conversation_uuid,
            message,
        } => {
            if let Some(message) = message {
                let list = state.messages.entry(conversation_uuid).or_default();
                match list.iter_mut().find(|m| m.uuid == message.uuid) {
                    Some(existing) => *existing = message,
                    None => list.push(message),
                }
            }
        }
        Action::MessageRemoved {
            conversation_uuid,
            message_uuid,
        } => {
            if let Some(list) = state.messages.get_mut(&conversation_uuid) {
                list.retain(|m| m.uuid != message_uuid);
            }
        }
        Action::MessageContentUpdated {
            conversation_uuid,
            message_uuid,
            content,
        } => {
            if let Some(message) = message_mut(&mut state, &conversation_uuid, &message_uuid) {
                if let (Some(versions), Some(index)) =
                    (message.versions.as_mut(), message.current_version_index)
                {
                    if let Some(current) = versions.get_mut(index) {
                        current.content.clone_from(&content);
                    }
                }
                message.content = content;
            }
        }
        Action::VersionAppended {
            conversation_uuid,
            message_uuid,
            version,
        } => match message_mut(&mut state, &conversation_uuid, &message_uuid) {
            Some(message) => message.push_version(&version),
            None => warn!(
                conversation = %conversation_uuid,
                message = %message_uuid,
                "Dropping version for unknown message"
            ),
        },
        Action::VersionSwitched {
            conversation_uuid,
            message_uuid,
            index,
        } => {
            if let Some(message) = message_mut(&mut state, &conversation_uuid, &message_uuid) {
                if !message.switch_version(index) {
                    debug!(message = %message_uuid, index, "Ignoring out-of-range version switch");
                }
            }
        }

        Action::SessionStarted {
            session_id,
            conversation_uuid,
            target,
        } => {
            state.error = None;
            state.streams.insert(
                conversation_uuid.clone(),
                StreamingState {
                    session_id: Some(session_id),
                    conversation_uuid: Some(conversation_uuid),
                    target: Some(target),
                    phase: SessionPhase::Sending,
                    ..StreamingState::default()
                },
            );
        }
        Action::SessionPhaseChanged { session_id, phase } => {
            if let Some(session) = state.session_mut(session_id) {
                advance(session, phase);
            } else {
                debug!(%session_id, "Ignoring write from stale session");
            }
        }
        Action::InitialContentCommitted { session_id, text } => {
            if let Some(session) = state.session_mut(session_id) {
                if !session.real_content_started {
                    session.initial_content = text;
                    advance(session, SessionPhase::StreamingPreview);
                }
            } else {
                debug!(%session_id, "Ignoring write from stale session");
            }
        }
        Action::ContentCommitted {
            session_id,
            content,
        } => {
            if let Some(session) = state.session_mut(session_id) {
                session.content = content;
                session.real_content_started = true;
                session.initial_content.clear();
                advance(session, SessionPhase::StreamingFinal);
            } else {
                debug!(%session_id, "Ignoring write from stale session");
            }
        }
        Action::SessionMetadataUpdated {
            session_id,
            metadata,
        } => {
            if let Some(session) = state.session_mut(session_id) {
                session.metadata.merge(&metadata);
            } else {
                debug!(%session_id, "Ignoring write from stale session");
            }
        }
        Action::SessionFinished { session_id } => {
            state.streams.retain(|_, s| !s.is_session(session_id));
        }
        Action::SessionFailed { session_id, error } => {
            let before = state.streams.len();
            state.streams.retain(|_, s| !s.is_session(session_id));
            if state.streams.len() < before {
                state.error = Some(error);
            } else {
                debug!(%session_id, "Ignoring failure of stale session");
            }
        }
        Action::SessionAborted { session_id } => {
            if let Some(session) = state.session_mut(session_id) {
                *session = StreamingState {
                    conversation_uuid: session.conversation_uuid.take(),
                    phase: SessionPhase::Aborted,
                    ..StreamingState::default()
                };
            }
        }

        Action::ErrorSet(error) => state.error = error,
    }
    state
}

fn load_conversations(state: &mut AppState, scope: ListScope, page: Page<Conversation>) {
    if page.pagination.page <= 1 {
        match &scope {
            ListScope::Global => state.conversations.clear(),
            ListScope::Project(project) => state
                .conversations
                .retain(|_, c| c.project_uuid.as_deref() != Some(project.as_str())),
        }
    }
    for conversation in page.data {
        upsert_conversation(state, conversation);
    }
    state.conversation_cursors.insert(scope, page.pagination);
    state.loading_conversations = false;
}

fn upsert_conversation(state: &mut AppState, conversation: Conversation) {
    let uuid = conversation.uuid.clone();
    if conversation.is_archived {
        state.conversations.shift_remove(&uuid);
        state.archived.insert(uuid, conversation);
    } else {
        state.archived.shift_remove(&uuid);
        state.conversations.insert(uuid, conversation);
    }
}

fn clear_selection(state: &mut AppState, uuid: &str) {
    if state.current_conversation.as_deref() == Some(uuid) {
        state.current_conversation = None;
    }
}

fn message_mut<'a>(
    state: &'a mut AppState,
    conversation_uuid: &str,
    message_uuid: &str,
) -> Option<&'a mut Message> {
    state
        .messages
        .get_mut(conversation_uuid)?
        .iter_mut()
        .find(|m| m.uuid == message_uuid)
}

/// Keep the first occurrence of every uuid.
fn dedup_by_uuid(messages: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::new();
    messages
        .into_iter()
        .filter(|m| seen.insert(m.uuid.clone()))
        .collect()
}

fn advance(session: &mut StreamingState, next: SessionPhase) {
    if session.phase == next {
        return;
    }
    if session.phase.can_transition(next) {
        debug!(from = ?session.phase, to = ?next, "Session phase change");
        session.phase = next;
    } else {
        debug!(from = ?session.phase, to = ?next, "Rejected session phase change");
    }
}
