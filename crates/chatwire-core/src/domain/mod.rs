//! Domain types for conversations, messages and pagination.

pub mod chat;
pub mod group;
pub mod pagination;

pub use chat::{
    Conversation, ConversationFilters, LOCAL_ID_PREFIX, LinkedFile, Message, NewConversation,
    Sender,
};
pub use group::{GroupKind, MessageGroup};
pub use pagination::{ListScope, MessagePage, Page, PageCursor};
