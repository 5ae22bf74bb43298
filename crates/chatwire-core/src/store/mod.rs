//! Reactive conversation and message store.
//!
//! The store owns one [`AppState`] behind a `tokio::sync::watch` channel.
//! Mutations go through [`Store::dispatch`], which runs the pure
//! [`reduce`] function; subscribers observe every committed state.

mod action;
mod reducer;
mod state;

use thiserror::Error;
use tokio::sync::watch;

pub use action::{Action, Placement};
pub use reducer::reduce;
pub use state::{AppState, SessionPhase, StreamTarget, StreamingState};

use crate::domain::Message;
use crate::ports::ApiError;

/// Errors from store-level operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Version {index} out of range for a message with {count} version(s)")]
    VersionOutOfRange { index: usize, count: usize },
}

/// Shared handle to the application state.
#[derive(Debug)]
pub struct Store {
    tx: watch::Sender<AppState>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_state(AppState::default())
    }

    pub fn with_state(state: AppState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self { tx }
    }

    /// Apply an action and notify subscribers.
    pub fn dispatch(&self, action: Action) {
        self.tx.send_modify(|state| {
            let current = std::mem::take(state);
            *state = reduce(current, action);
        });
    }

    /// Receiver that wakes on every dispatched action.
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }

    /// Read the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> AppState {
        self.tx.borrow().clone()
    }

    // =========================================================================
    // Direct message mutations
    // =========================================================================

    /// Upsert a message by uuid. `None` is a no-op.
    pub fn add_message(&self, conversation_uuid: &str, message: Option<Message>) {
        if message.is_none() {
            return;
        }
        self.dispatch(Action::MessageAdded {
            conversation_uuid: conversation_uuid.to_string(),
            message,
        });
    }

    pub fn remove_message(&self, conversation_uuid: &str, message_uuid: &str) {
        self.dispatch(Action::MessageRemoved {
            conversation_uuid: conversation_uuid.to_string(),
            message_uuid: message_uuid.to_string(),
        });
    }

    pub fn update_message_content(
        &self,
        conversation_uuid: &str,
        message_uuid: &str,
        content: impl Into<String>,
    ) {
        self.dispatch(Action::MessageContentUpdated {
            conversation_uuid: conversation_uuid.to_string(),
            message_uuid: message_uuid.to_string(),
            content: content.into(),
        });
    }

    /// Show another version of a regenerated message.
    ///
    /// Out-of-range indexes are rejected and leave the state untouched.
    pub fn switch_version(
        &self,
        conversation_uuid: &str,
        message_uuid: &str,
        index: usize,
    ) -> Result<(), StoreError> {
        let count = self.read(|state| {
            state
                .find_message(conversation_uuid, message_uuid)
                .map(|m| m.versions.as_ref().map_or(0, Vec::len))
        });
        let count = count.ok_or_else(|| StoreError::MessageNotFound(message_uuid.to_string()))?;
        if index >= count {
            return Err(StoreError::VersionOutOfRange { index, count });
        }

        self.dispatch(Action::VersionSwitched {
            conversation_uuid: conversation_uuid.to_string(),
            message_uuid: message_uuid.to_string(),
            index,
        });
        Ok(())
    }

    pub fn set_error(&self, error: Option<String>) {
        self.dispatch(Action::ErrorSet(error));
    }
}
