//! Streaming chat engine: event-stream parsing, send and regenerate
//! sessions, and a reactive conversation/message store kept consistent with
//! a paginated backend.
//!
//! Transport lives behind the traits in [`ports`]; the HTTP adapter is a
//! separate crate.
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod ports;
pub mod services;
pub mod session;
pub mod settings;
pub mod store;
pub mod stream;
pub mod versioning;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export commonly used types for convenience
pub use domain::{
    Conversation, ConversationFilters, GroupKind, LinkedFile, ListScope, Message, MessageGroup,
    MessagePage, NewConversation, Page, PageCursor, Sender,
};
pub use ports::{
    ApiError, ApiResult, ByteStream, ConversationApi, ErrorNotifier, GenerationApi,
    GenerationReply, NoopNotifier, RegenerateRequest, SendRequest, StaticToken, TokenProvider,
};
pub use services::{ConversationService, InFlightSet, PaginationController};
pub use session::{SessionController, SessionError, SessionOutcome};
pub use settings::{SessionSettings, SettingsError};
pub use store::{Action, AppState, SessionPhase, Store, StoreError, StreamTarget, StreamingState};
pub use stream::{EventStream, EventType, StreamError, StreamEvent, StreamMetadata};
pub use versioning::flatten_groups;
