//! Port definitions (trait abstractions) for external collaborators.
//!
//! Ports define the interfaces that the core expects from the outside
//! world. They contain no transport details and use only domain types.
//!
//! # Design Rules
//!
//! - No HTTP types in any signature
//! - Every fallible call returns `ApiResult`
//! - Sinks (`ErrorNotifier`) are synchronous and must not block

pub mod auth;
pub mod chat_api;
pub mod error;
pub mod generation;
pub mod notifier;

pub use auth::{StaticToken, TokenProvider};
pub use chat_api::ConversationApi;
pub use error::{ApiError, ApiResult};
pub use generation::{ByteStream, GenerationApi, GenerationReply, RegenerateRequest, SendRequest};
pub use notifier::{ErrorNotifier, NoopNotifier};
