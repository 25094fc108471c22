//! Wire-level event protocol for Whisperlink.
//!
//! Every WebSocket text frame carries one JSON envelope:
//!
//! ```json
//! {"event": "send-message", "data": {"content": "hi"}}
//! ```
//!
//! The `data` member is omitted for events without a payload. Field names
//! are camelCase on the wire; this is the format deployed browser
//! clients speak and it must be preserved exactly.
//!
//! Decoding is deliberately tolerant: an unknown event name or a malformed
//! payload yields a [`ProtocolError`] that callers log and drop, never a
//! connection-fatal condition.

#![forbid(unsafe_code)]

mod error;
mod event;
mod message;

pub use error::ProtocolError;
pub use event::{
    ClientEvent, ReactPayload, ReportPayload, RoomJoinedPayload, SendMessagePayload, ServerEvent,
    TypingPayload, UserCountPayload,
};
pub use message::Message;
