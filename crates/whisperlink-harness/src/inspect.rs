//! Helpers for inspecting engine action vectors in tests.

use whisperlink_core::{EngineAction, LogLevel};
use whisperlink_proto::ServerEvent;

/// Events sent directly to one connection, in order.
pub fn sent_to(actions: &[EngineAction], connection_id: u64) -> Vec<ServerEvent> {
    actions
        .iter()
        .filter_map(|action| match action {
            EngineAction::Send { connection_id: target, event } if *target == connection_id => {
                Some(event.clone())
            },
            _ => None,
        })
        .collect()
}

/// Events broadcast to all connections, in order.
pub fn broadcasts(actions: &[EngineAction]) -> Vec<ServerEvent> {
    actions
        .iter()
        .filter_map(|action| match action {
            EngineAction::Broadcast { event } => Some(event.clone()),
            _ => None,
        })
        .collect()
}

/// Log messages at or above the given level, in order.
pub fn log_messages(actions: &[EngineAction], min_level: LogLevel) -> Vec<String> {
    fn rank(level: LogLevel) -> u8 {
        match level {
            LogLevel::Debug => 0,
            LogLevel::Info => 1,
            LogLevel::Warn => 2,
            LogLevel::Error => 3,
        }
    }

    actions
        .iter()
        .filter_map(|action| match action {
            EngineAction::Log { level, message } if rank(*level) >= rank(min_level) => {
                Some(message.clone())
            },
            _ => None,
        })
        .collect()
}
