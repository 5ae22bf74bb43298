//! Handler-based consumption of a generation stream.
//!
//! Each event is routed to exactly one of three handlers: chunks (content,
//! preview and metadata updates), completion, or error.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use thiserror::Error;

use super::event::{EventType, StreamEvent};
use super::parser::EventStream;
use crate::ports::ApiError;

/// Where a stream failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorReason {
    /// Network abort, non-success status or timeout.
    Connection,
    /// In-band `error` or `unethical` event from the server.
    Application,
}

/// A failure reported to the error handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StreamError {
    pub reason: StreamErrorReason,
    pub message: String,
}

impl StreamError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            reason: StreamErrorReason::Connection,
            message: message.into(),
        }
    }

    pub fn application(message: impl Into<String>) -> Self {
        Self {
            reason: StreamErrorReason::Application,
            message: message.into(),
        }
    }
}

impl From<ApiError> for StreamError {
    fn from(err: ApiError) -> Self {
        Self::connection(err.to_string())
    }
}

/// Routing decision for one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Chunk(StreamEvent),
    Complete(StreamEvent),
    Error(StreamError),
}

impl From<StreamEvent> for Dispatch {
    fn from(event: StreamEvent) -> Self {
        match event {
            StreamEvent::Error { message } | StreamEvent::Unethical { message } => {
                Self::Error(StreamError::application(message))
            }
            event @ StreamEvent::Completion { .. } => Self::Complete(event),
            event => Self::Chunk(event),
        }
    }
}

/// Caller-supplied handlers for a generation stream.
pub trait StreamHandler {
    /// Called for every non-terminal event with its text delta (may be empty).
    fn on_chunk(&mut self, delta: &str, kind: EventType, event: &StreamEvent);

    /// Called once when the server confirms completion.
    fn on_complete(&mut self, event: StreamEvent);

    /// Called once on a transport or in-band failure.
    fn on_error(&mut self, error: StreamError);
}

/// How a consumed stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    Completed,
    Failed,
    /// Body ended without a terminal event.
    Exhausted,
}

/// Drive `body` to its end, dispatching every event to `handler`.
///
/// Reading stops at the first terminal event; the rest of the body is
/// dropped with the stream.
pub async fn consume<S, H>(body: S, handler: &mut H) -> StreamEnd
where
    S: Stream<Item = Result<Bytes, ApiError>> + Unpin,
    H: StreamHandler + ?Sized,
{
    let mut events = EventStream::new(body);
    while let Some(item) = events.next().await {
        if let Some(end) = route(item, handler) {
            return end;
        }
    }
    StreamEnd::Exhausted
}

/// Hand one parsed item to `handler`. Returns how the stream ended if the
/// item was terminal.
pub fn route<H>(item: Result<StreamEvent, StreamError>, handler: &mut H) -> Option<StreamEnd>
where
    H: StreamHandler + ?Sized,
{
    match item.map_or_else(Dispatch::Error, Dispatch::from) {
        Dispatch::Chunk(event) => {
            handler.on_chunk(event.delta(), event.event_type(), &event);
            None
        }
        Dispatch::Complete(event) => {
            handler.on_complete(event);
            Some(StreamEnd::Completed)
        }
        Dispatch::Error(err) => {
            handler.on_error(err);
            Some(StreamEnd::Failed)
        }
    }
}
