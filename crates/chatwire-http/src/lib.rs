#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

mod client;
mod config;
mod error;
mod http;
mod port;
mod url;

// ============================================================================
// Public API
// ============================================================================

// Client
pub use client::{ChatClient, DefaultChatClient};

// Configuration
pub use config::ClientConfig;

// Errors surfaced while constructing a client
pub use error::{HttpError, HttpResult};

// Backend seam for custom transports
pub use http::{BodyStream, HttpBackend, Method, Request};
