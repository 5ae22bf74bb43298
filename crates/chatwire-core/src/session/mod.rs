//! Streaming sessions: send, regenerate, throttled commits and cancellation.

mod controller;
mod error;
mod throttle;
mod writer;

pub use controller::{SessionController, SessionOutcome};
pub use error::{SessionError, TRANSPORT_ERROR_TEXT};
pub use throttle::{CommitThrottle, DEFAULT_THROTTLE_WINDOW};
