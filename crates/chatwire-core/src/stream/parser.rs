//! Incremental event-stream parser.
//!
//! Turns the raw byte body of a generation response into typed
//! [`StreamEvent`]s. Handles:
//! - reads that split lines (and multi-byte characters) at any byte
//! - `\n` and `\r\n` line endings
//! - the `data:` marker, with or without a following space
//!
//! Lines are split on raw bytes before decoding; `\n` never occurs inside a
//! multi-byte UTF-8 sequence, so a character cut across two reads is always
//! reassembled before it is decoded.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_util::Stream;
use tracing::warn;

use super::dispatch::StreamError;
use super::event::StreamEvent;
use crate::ports::ApiError;

/// Marker that prefixes every payload line.
pub const DATA_PREFIX: &str = "data:";

/// Sentinel some upstreams send after the last event.
const DONE_SENTINEL: &str = "[DONE]";

/// Byte-level line splitter that retains partial lines across reads.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one read's worth of bytes.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pop the next complete line, without its terminator.
    pub fn next_line(&mut self) -> Option<String> {
        let end = self.buf.iter().position(|&b| b == b'\n')?;
        let line = self.buf.split_to(end + 1);
        Some(decode_line(&line[..end]))
    }

    /// Take whatever is left after the final newline.
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = self.buf.split();
        Some(decode_line(&rest))
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Bytes currently held back waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Extract the JSON payload of a `data:` line.
///
/// Returns `None` for blank lines, comments, other SSE fields and the
/// `[DONE]` sentinel.
pub fn data_payload(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(DATA_PREFIX)?;
    let payload = rest.strip_prefix(' ').unwrap_or(rest).trim_end();
    if payload.is_empty() || payload == DONE_SENTINEL {
        return None;
    }
    Some(payload)
}

/// Parse one complete line. Malformed payloads are logged and dropped.
pub fn parse_line(line: &str) -> Option<StreamEvent> {
    let payload = data_payload(line)?;
    match StreamEvent::from_json(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, line = %payload, "Skipping malformed stream line");
            None
        }
    }
}

/// Stateful parser for callers that feed reads by hand.
#[derive(Debug, Default)]
pub struct EventParser {
    lines: LineBuffer,
}

impl EventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read and return the events it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.lines.extend(chunk);
        let mut events = Vec::new();
        while let Some(line) = self.lines.next_line() {
            events.extend(parse_line(&line));
        }
        events
    }

    /// Flush the final unterminated line at end of stream.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        self.lines
            .take_remainder()
            .and_then(|line| parse_line(&line))
            .into_iter()
            .collect()
    }
}

/// A stream adapter yielding typed events from a response body.
///
/// Transport failures surface once as a [`StreamError`] with the
/// `Connection` reason, after which the stream ends. End of body without a
/// terminal event simply ends the stream.
pub struct EventStream<S> {
    inner: S,
    lines: LineBuffer,
    done: bool,
}

impl<S> EventStream<S> {
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            lines: LineBuffer::new(),
            done: false,
        }
    }
}

impl<S> Stream for EventStream<S>
where
    S: Stream<Item = Result<Bytes, ApiError>> + Unpin,
{
    type Item = Result<StreamEvent, StreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(line) = self.lines.next_line() {
                if let Some(event) = parse_line(&line) {
                    return Poll::Ready(Some(Ok(event)));
                }
                continue;
            }

            if self.done {
                let tail = self.lines.take_remainder();
                return Poll::Ready(tail.and_then(|line| parse_line(&line)).map(Ok));
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => self.lines.extend(&bytes),
                Poll::Ready(Some(Err(e))) => {
                    warn!(error = %e, "Generation stream failed");
                    self.done = true;
                    self.lines.clear();
                    return Poll::Ready(Some(Err(StreamError::connection(e.to_string()))));
                }
                Poll::Ready(None) => self.done = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
