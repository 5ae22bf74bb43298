//! Services - orchestration between the ports and the store.

mod conversations;
mod inflight;
mod pagination;

pub use conversations::ConversationService;
pub use inflight::{InFlightGuard, InFlightSet};
pub use pagination::{MessageBatch, PaginationController};
