//! Protocol error types.

/// Errors produced while decoding inbound frames.
///
/// All variants are per-frame: the offending frame is dropped and the
/// connection continues. Nothing here closes a socket.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame was not valid JSON or lacked the `event` member.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The event name is not one the server understands.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// The `data` member did not match the payload shape for the event.
    #[error("invalid payload for {event}: {reason}")]
    InvalidPayload {
        /// Event whose payload failed to decode.
        event: &'static str,
        /// Decoder error message.
        reason: String,
    },
}
