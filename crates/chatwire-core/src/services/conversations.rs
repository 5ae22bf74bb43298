//! Conversation service - keeps the store consistent with the backend.
//!
//! Reads go through the pagination controller and land in the store via
//! dispatched actions. Mutations are applied optimistically and rolled back
//! when the backend call fails.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use super::inflight::InFlightSet;
use super::pagination::PaginationController;
use crate::domain::{
    Conversation, ConversationFilters, LOCAL_ID_PREFIX, ListScope, NewConversation, Page,
};
use crate::ports::{ApiResult, ConversationApi, ErrorNotifier};
use crate::settings::SessionSettings;
use crate::store::{Action, Placement, Store, StoreError};

/// Orchestrates conversation listing, selection and lifecycle changes.
pub struct ConversationService {
    store: Arc<Store>,
    api: Arc<dyn ConversationApi>,
    notifier: Arc<dyn ErrorNotifier>,
    pagination: PaginationController,
    selecting: InFlightSet,
    paging: InFlightSet,
}

impl ConversationService {
    pub fn new(
        store: Arc<Store>,
        api: Arc<dyn ConversationApi>,
        notifier: Arc<dyn ErrorNotifier>,
        settings: &SessionSettings,
    ) -> Self {
        Self {
            store,
            pagination: PaginationController::new(Arc::clone(&api), settings),
            api,
            notifier,
            selecting: InFlightSet::new(),
            paging: InFlightSet::new(),
        }
    }

    pub const fn store(&self) -> &Arc<Store> {
        &self.store
    }

    // =========================================================================
    // Listing and selection
    // =========================================================================

    /// Load a page of the conversation list. Page 1 replaces the scope's
    /// active set; later pages merge into it.
    pub async fn load_conversations(
        &self,
        page: u32,
        filters: &ConversationFilters,
    ) -> Result<(), StoreError> {
        self.store.dispatch(Action::ConversationsLoading(true));
        let fetched = self.pagination.conversations(page, filters).await.map(Some);
        self.apply_conversations(fetched, filters).map(|_| ())
    }

    /// Load the page after the scope's cursor. Returns `false` when there is
    /// nothing more to load.
    pub async fn load_more_conversations(
        &self,
        filters: &ConversationFilters,
    ) -> Result<bool, StoreError> {
        let scope = ListScope::from_project(filters.project_uuid.as_deref());
        let Some(cursor) = self
            .store
            .read(|state| state.conversation_cursor(&scope).copied())
        else {
            return Ok(false);
        };
        if !cursor.has_more() {
            return Ok(false);
        }

        self.store.dispatch(Action::ConversationsLoading(true));
        let fetched = self.pagination.more_conversations(&cursor, filters).await;
        self.apply_conversations(fetched, filters)
    }

    /// Make `uuid` the current conversation, fetching whatever is missing.
    ///
    /// Concurrent calls for the same uuid perform a single fetch; the later
    /// callers return immediately.
    pub async fn select_conversation(&self, uuid: &str) -> Result<(), StoreError> {
        let (selected, known, loaded) = self.store.read(|state| {
            (
                state.current_conversation.as_deref() == Some(uuid),
                state.conversation(uuid).is_some(),
                state.has_messages(uuid),
            )
        });
        if selected && loaded {
            return Ok(());
        }

        let Some(_guard) = self.selecting.try_acquire(uuid) else {
            debug!(conversation = %uuid, "Selection already in flight");
            return Ok(());
        };

        if !known {
            match self.api.get_conversation(uuid).await {
                Ok(Some(conversation)) => {
                    self.store.dispatch(Action::ConversationUpserted(conversation));
                }
                Ok(None) => {
                    debug!(conversation = %uuid, "Conversation not found");
                    return Ok(());
                }
                Err(err) => return Err(self.surface("Could not open conversation", err.into())),
            }
        }
        self.store
            .dispatch(Action::ConversationSelected(Some(uuid.to_string())));

        if !loaded {
            self.store.dispatch(Action::MessagesLoading {
                conversation_uuid: uuid.to_string(),
                loading: true,
            });
            match self.pagination.latest_messages(uuid).await {
                Ok(batch) => self.store.dispatch(Action::MessagesLoaded {
                    conversation_uuid: uuid.to_string(),
                    messages: batch.messages,
                    cursor: batch.cursor,
                    placement: Placement::Replace,
                }),
                Err(err) => {
                    self.store.dispatch(Action::MessagesLoading {
                        conversation_uuid: uuid.to_string(),
                        loading: false,
                    });
                    return Err(self.surface("Could not load messages", err.into()));
                }
            }
        }
        Ok(())
    }

    /// Prepend the next page of older messages. Returns `false` once every
    /// page is loaded.
    pub async fn load_more_messages(&self, uuid: &str) -> Result<bool, StoreError> {
        let Some(cursor) = self.store.read(|state| state.message_cursor(uuid).copied()) else {
            return Ok(false);
        };
        if !cursor.has_more() {
            return Ok(false);
        }
        let Some(_guard) = self.paging.try_acquire(uuid) else {
            return Ok(false);
        };

        match self.pagination.older_messages(uuid, &cursor).await {
            Ok(Some(batch)) => {
                self.store.dispatch(Action::MessagesLoaded {
                    conversation_uuid: uuid.to_string(),
                    messages: batch.messages,
                    cursor: batch.cursor,
                    placement: Placement::Prepend,
                });
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(err) => Err(self.surface("Could not load older messages", err.into())),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create a conversation. An optimistic entry is shown until the
    /// backend confirms it.
    pub async fn create_conversation(
        &self,
        new: NewConversation,
    ) -> Result<Conversation, StoreError> {
        let placeholder = optimistic_conversation(&new);
        let placeholder_uuid = placeholder.uuid.clone();
        self.store.dispatch(Action::ConversationCreated {
            placeholder_uuid: None,
            conversation: placeholder,
        });

        match self.api.create_conversation(&new).await {
            Ok(conversation) => {
                self.store.dispatch(Action::ConversationCreated {
                    placeholder_uuid: Some(placeholder_uuid),
                    conversation: conversation.clone(),
                });
                Ok(conversation)
            }
            Err(err) => {
                self.store.dispatch(Action::ConversationRemoved {
                    uuid: placeholder_uuid,
                });
                Err(self.surface("Could not create conversation", err.into()))
            }
        }
    }

    /// Delete a conversation. A conversation the store has never seen is
    /// deleted on the server only.
    pub async fn delete_conversation(&self, uuid: &str) -> Result<(), StoreError> {
        let located = self.locate(uuid);
        self.store.dispatch(Action::ConversationRemoved {
            uuid: uuid.to_string(),
        });

        if let Err(err) = self.api.delete_conversation(uuid).await {
            if let Some((conversation, index)) = located {
                self.restore(conversation, index);
            }
            return Err(self.surface("Could not delete conversation", err.into()));
        }
        Ok(())
    }

    /// Hide a conversation from the active set. Reversible with
    /// [`Self::unarchive_conversation`].
    pub async fn archive_conversation(&self, uuid: &str) -> Result<(), StoreError> {
        let located = self.locate(uuid);
        if located.as_ref().is_some_and(|(c, _)| c.is_archived) {
            return Ok(());
        }
        self.store.dispatch(Action::ConversationArchived {
            uuid: uuid.to_string(),
        });

        if let Err(err) = self.api.archive_conversation(uuid).await {
            if let Some((conversation, index)) = located {
                self.restore(conversation, index);
            }
            return Err(self.surface("Could not archive conversation", err.into()));
        }
        Ok(())
    }

    /// Bring an archived conversation back, using the server's copy.
    ///
    /// Works for conversations archived before this store was created; the
    /// confirmed conversation is inserted at the top of the list.
    pub async fn unarchive_conversation(&self, uuid: &str) -> Result<Conversation, StoreError> {
        let archived = self.store.read(|state| state.archived.get(uuid).cloned());
        let optimistic = archived.is_some();
        if let Some(archived) = archived {
            self.store
                .dispatch(Action::ConversationUnarchived(archived));
        }

        match self.api.unarchive_conversation(uuid).await {
            Ok(confirmed) => {
                self.store
                    .dispatch(Action::ConversationUnarchived(confirmed.clone()));
                Ok(confirmed)
            }
            Err(err) => {
                if optimistic {
                    self.store.dispatch(Action::ConversationArchived {
                        uuid: uuid.to_string(),
                    });
                }
                Err(self.surface("Could not unarchive conversation", err.into()))
            }
        }
    }

    pub fn clear_error(&self) {
        self.store.set_error(None);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn apply_conversations(
        &self,
        fetched: ApiResult<Option<Page<Conversation>>>,
        filters: &ConversationFilters,
    ) -> Result<bool, StoreError> {
        match fetched {
            Ok(Some(page)) => {
                self.store.dispatch(Action::ConversationsLoaded {
                    scope: ListScope::from_project(filters.project_uuid.as_deref()),
                    page,
                });
                Ok(true)
            }
            Ok(None) => {
                self.store.dispatch(Action::ConversationsLoading(false));
                Ok(false)
            }
            Err(err) => {
                self.store.dispatch(Action::ConversationsLoading(false));
                Err(self.surface("Could not load conversations", err.into()))
            }
        }
    }

    /// Find a conversation and its position among the active or archived set.
    fn locate(&self, uuid: &str) -> Option<(Conversation, usize)> {
        self.store.read(|state| {
            state
                .conversations
                .get_full(uuid)
                .or_else(|| state.archived.get_full(uuid))
                .map(|(index, _, conversation)| (conversation.clone(), index))
        })
    }

    fn restore(&self, conversation: Conversation, index: usize) {
        let action = if conversation.is_archived {
            Action::ConversationUpserted(conversation)
        } else {
            Action::ConversationRestored {
                conversation,
                index,
            }
        };
        self.store.dispatch(action);
    }

    fn surface(&self, title: &str, error: StoreError) -> StoreError {
        warn!(error = %error, "{title}");
        let message = error.to_string();
        self.store.set_error(Some(message.clone()));
        self.notifier.report_error(title, &message);
        error
    }
}

fn optimistic_conversation(new: &NewConversation) -> Conversation {
    let now = Utc::now();
    Conversation {
        uuid: format!("{LOCAL_ID_PREFIX}{}", uuid::Uuid::new_v4()),
        name: new.name.clone(),
        created_at: now,
        updated_at: now,
        project_uuid: new.project_uuid.clone(),
        model_id: new.model_id.clone(),
        is_archived: false,
    }
}
