//! Best-effort message persistence collaborator.
//!
//! The surrounding system may durably log chat messages; the chat path
//! must never block or fail on it. The engine calls [`MessageSink::persist`]
//! after appending to the room log and downgrades any error to a warning.

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use whisperlink_proto::Message;

/// Error from a persistence sink.
///
/// Always non-fatal: the engine logs it and continues.
#[derive(Debug, Clone)]
pub struct SinkError(pub String);

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink error: {}", self.0)
    }
}

impl std::error::Error for SinkError {}

/// Persistence seam for chat messages.
///
/// Must be `Clone + Send + Sync` and synchronous; implementations that
/// talk to real storage should hand the message off to a background task
/// rather than block here.
pub trait MessageSink: Clone + Send + Sync + 'static {
    /// Persist one message, best-effort.
    fn persist(&self, message: &Message) -> Result<(), SinkError>;
}

/// Sink that discards everything. The production default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl MessageSink for NullSink {
    fn persist(&self, _message: &Message) -> Result<(), SinkError> {
        Ok(())
    }
}

/// In-memory sink for tests and simulation.
///
/// Clones share the same underlying buffer via `Arc`.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Vec<Message>>>,
}

impl MemorySink {
    /// Create a new empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything persisted so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock().expect("mutex poisoned").clone()
    }

    /// Number of persisted messages.
    #[allow(clippy::expect_used)]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("mutex poisoned").len()
    }

    /// Whether nothing has been persisted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MessageSink for MemorySink {
    #[allow(clippy::expect_used)]
    fn persist(&self, message: &Message) -> Result<(), SinkError> {
        self.inner.lock().expect("mutex poisoned").push(message.clone());
        Ok(())
    }
}
