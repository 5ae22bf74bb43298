//! Command handlers.
//!
//! Handlers follow one pattern: `pub async fn execute(ctx: &CliContext, ...)
//! -> Result<()>`. They call the engine services, then format what landed in
//! the store for the terminal. No handler talks to the HTTP client directly.

pub mod conversations;
pub mod manage;
pub mod send;
pub mod show;
