//! Generation stream protocol: typed events, incremental parser and
//! handler dispatch.

pub mod dispatch;
pub mod event;
pub mod parser;

pub use dispatch::{Dispatch, StreamEnd, StreamError, StreamErrorReason, StreamHandler, consume, route};
pub use event::{EventType, StreamEvent, StreamMetadata};
pub use parser::{DATA_PREFIX, EventParser, EventStream, LineBuffer, data_payload, parse_line};
