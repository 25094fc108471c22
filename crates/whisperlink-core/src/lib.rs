//! Whisperlink pairing engine.
//!
//! Sans-IO core of the anonymous chat pairing server. The engine consumes
//! [`EngineEvent`]s, mutates its in-memory state (sessions, waiting queue,
//! rooms, partner history), and returns [`EngineAction`]s for a runtime to
//! execute. It never touches a socket, a clock, or an RNG directly; those
//! come in through the [`env::Environment`] abstraction, which is what
//! makes the whole state machine deterministic under test.
//!
//! # Components
//!
//! - [`SessionRegistry`]: connection ↔ participant identity mapping
//! - [`MatchQueue`] + [`PartnerHistory`]: FIFO pairing with best-effort
//!   recent-partner avoidance and lazy stale-entry eviction
//! - [`RoomStore`]: two-party rooms and their message logs
//! - [`PairingEngine`]: the join/leave/disconnect state machine, sole
//!   mutator of all shared state
//! - [`EventRouter`]: message/typing/reaction fan-out and the collaborator
//!   seams ([`Validator`], [`MessageSink`])

#![forbid(unsafe_code)]

pub mod env;
mod engine;
mod error;
mod history;
mod queue;
mod registry;
mod rooms;
mod router;
mod sink;
mod validate;

pub use engine::{EngineAction, EngineConfig, EngineEvent, LogLevel, PairingEngine};
pub use error::EngineError;
pub use history::PartnerHistory;
pub use queue::{MatchQueue, WaitingEntry};
pub use registry::SessionRegistry;
pub use rooms::{Removal, Room, RoomStore};
pub use router::EventRouter;
pub use sink::{MemorySink, MessageSink, NullSink, SinkError};
pub use validate::{LengthValidator, ValidationError, Validator};
