//! Per-session buffers and throttled store commits.
//!
//! The writer is the only owner of a session's text buffers. Chunks are
//! appended in arrival order; the store sees them through throttled commits
//! plus a trailing flush driven by the controller's timer.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use super::throttle::CommitThrottle;
use crate::domain::Message;
use crate::store::{Action, SessionPhase, Store, StreamTarget};
use crate::stream::{EventType, StreamError, StreamEvent, StreamHandler, StreamMetadata};

pub(crate) struct SessionWriter<'a> {
    store: &'a Store,
    session_id: Uuid,
    conversation_uuid: String,
    target: StreamTarget,
    throttle: CommitThrottle,
    preview: String,
    content: String,
    preview_started: bool,
    real_started: bool,
    /// Buffered text not yet committed.
    dirty: bool,
    completed: Option<Option<Message>>,
    failure: Option<StreamError>,
}

impl<'a> SessionWriter<'a> {
    pub(crate) fn new(
        store: &'a Store,
        session_id: Uuid,
        conversation_uuid: String,
        target: StreamTarget,
        window: Duration,
    ) -> Self {
        Self {
            store,
            session_id,
            conversation_uuid,
            target,
            throttle: CommitThrottle::new(window),
            preview: String::new(),
            content: String::new(),
            preview_started: false,
            real_started: false,
            dirty: false,
            completed: None,
            failure: None,
        }
    }

    /// When the trailing flush is due, if anything is waiting.
    pub(crate) fn pending_deadline(&self) -> Option<Instant> {
        if self.dirty {
            self.throttle.next_allowed()
        } else {
            None
        }
    }

    /// Commit whatever is buffered.
    pub(crate) fn flush(&mut self) {
        if self.dirty {
            self.commit();
            self.throttle.mark_committed();
        }
    }

    pub(crate) fn take_completed(&mut self) -> Option<Message> {
        self.completed.take().flatten()
    }

    pub(crate) fn take_failure(&mut self) -> Option<StreamError> {
        self.failure.take()
    }

    fn push_preview(&mut self, delta: &str) {
        if self.real_started {
            return;
        }
        self.preview.push_str(delta);
        if !self.preview_started {
            self.preview_started = true;
            self.throttle.reset();
        }
        self.commit_or_defer();
    }

    fn push_content(&mut self, delta: &str) {
        self.content.push_str(delta);
        if !self.real_started {
            self.real_started = true;
            self.preview.clear();
            self.throttle.reset();
        }
        self.commit_or_defer();
    }

    fn commit_or_defer(&mut self) {
        if self.throttle.should_commit() {
            self.commit();
        } else {
            self.dirty = true;
        }
    }

    fn commit(&mut self) {
        self.dirty = false;
        let action = if self.real_started {
            Action::ContentCommitted {
                session_id: self.session_id,
                content: self.content.clone(),
            }
        } else {
            Action::InitialContentCommitted {
                session_id: self.session_id,
                text: self.preview.clone(),
            }
        };
        self.store.dispatch(action);
    }

    fn update_metadata(&self, metadata: &StreamMetadata) {
        if metadata.is_empty() {
            return;
        }
        self.store.dispatch(Action::SessionMetadataUpdated {
            session_id: self.session_id,
            metadata: metadata.clone(),
        });
    }

    /// Swap the optimistic user message for the server's copy.
    fn confirm(&self, message: Message) {
        if let StreamTarget::NewMessage { placeholder_uuid } = &self.target {
            self.store
                .remove_message(&self.conversation_uuid, placeholder_uuid);
        }
        self.store.add_message(&self.conversation_uuid, Some(message));
    }
}

impl StreamHandler for SessionWriter<'_> {
    fn on_chunk(&mut self, delta: &str, kind: EventType, event: &StreamEvent) {
        match kind {
            EventType::InitialContent => self.push_preview(delta),
            EventType::Content => self.push_content(delta),
            _ => {
                if let Some(metadata) = event.metadata() {
                    self.update_metadata(metadata);
                }
                if let StreamEvent::InitialMetadata {
                    message: Some(message),
                    ..
                } = event
                {
                    if matches!(self.target, StreamTarget::NewMessage { .. }) {
                        self.confirm(message.clone());
                    }
                }
            }
        }
    }

    fn on_complete(&mut self, event: StreamEvent) {
        let StreamEvent::Completion { message, metadata } = event else {
            return;
        };
        self.update_metadata(&metadata);
        self.store.dispatch(Action::SessionPhaseChanged {
            session_id: self.session_id,
            phase: SessionPhase::Completing,
        });

        match (&self.target, &message) {
            (_, None) => debug!(
                conversation = %self.conversation_uuid,
                "Completion carried no message, nothing to insert"
            ),
            (StreamTarget::NewMessage { .. }, Some(message)) => self.confirm(message.clone()),
            (StreamTarget::Version { message_uuid }, Some(version)) => {
                self.store.dispatch(Action::VersionAppended {
                    conversation_uuid: self.conversation_uuid.clone(),
                    message_uuid: message_uuid.clone(),
                    version: version.clone(),
                });
            }
        }
        self.completed = Some(message);
    }

    fn on_error(&mut self, error: StreamError) {
        self.failure = Some(error);
    }
}
