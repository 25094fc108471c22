//! Deterministic test harness for Whisperlink.
//!
//! Provides [`SimEnv`], a seeded implementation of the core
//! `Environment` trait (virtual clock + ChaCha RNG), and helpers for
//! inspecting the action vectors the engine produces. With the same seed
//! and event sequence, every id, timestamp, and action the engine emits
//! is identical across runs.

#![forbid(unsafe_code)]

mod inspect;
mod sim_env;

pub use inspect::{broadcasts, log_messages, sent_to};
pub use sim_env::SimEnv;
