//! Engine error types.

/// Errors that can occur while processing engine events.
///
/// These indicate contract violations by the surrounding runtime, not bad
/// client input. Bad client input (unknown participants, stale rooms,
/// malformed payloads) is silently dropped per the error-handling design;
/// it never reaches this type.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An event referenced a connection the runtime never opened (or
    /// already closed).
    ///
    /// The runtime must deliver `ConnectionOpened` before any other event
    /// for a connection. Indicates a driver bug, not a client error.
    #[error("connection not registered: {0}")]
    ConnectionNotFound(u64),

    /// `ConnectionOpened` was delivered twice for the same id.
    ///
    /// Connection ids are assigned by the runtime and must be unique for
    /// the process lifetime. Indicates a driver bug.
    #[error("connection already registered: {0}")]
    ConnectionAlreadyExists(u64),
}
