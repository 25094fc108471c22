//! Outbound delivery map and engine action execution.
//!
//! Each connection's writer task owns the receiving half of an unbounded
//! channel; [`Peers`] holds the sending halves keyed by connection id.
//! Dropping a sender (via [`Peers::remove`]) ends the writer task, which
//! closes the socket. Delivery failures are logged and swallowed: a peer
//! that went away mid-send is cleaned up by its own read loop.

use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};
use whisperlink_core::{EngineAction, LogLevel};

/// Sending halves of every open connection's outbound channel.
#[derive(Default)]
pub struct Peers {
    senders: RwLock<HashMap<u64, mpsc::UnboundedSender<String>>>,
}

impl Peers {
    /// Create an empty peer map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's outbound sender.
    pub async fn register(&self, connection_id: u64, sender: mpsc::UnboundedSender<String>) {
        self.senders.write().await.insert(connection_id, sender);
    }

    /// Drop a connection's outbound sender, ending its writer task.
    pub async fn remove(&self, connection_id: u64) {
        self.senders.write().await.remove(&connection_id);
    }

    /// Queue a text frame for one connection.
    pub async fn send(&self, connection_id: u64, text: String) {
        let senders = self.senders.read().await;
        match senders.get(&connection_id) {
            Some(sender) => {
                if sender.send(text).is_err() {
                    tracing::debug!("send to {connection_id} failed: writer gone");
                }
            },
            None => {
                tracing::debug!("send to {connection_id} dropped: unknown connection");
            },
        }
    }

    /// Queue a text frame for every open connection.
    pub async fn broadcast(&self, text: &str) {
        let senders = self.senders.read().await;
        for (connection_id, sender) in senders.iter() {
            if sender.send(text.to_string()).is_err() {
                tracing::debug!("broadcast to {connection_id} failed: writer gone");
            }
        }
    }

    /// Number of registered connections.
    pub async fn len(&self) -> usize {
        self.senders.read().await.len()
    }

    /// Whether no connections are registered.
    pub async fn is_empty(&self) -> bool {
        self.senders.read().await.is_empty()
    }
}

/// Execute the actions produced by one engine step.
pub async fn execute_actions(actions: Vec<EngineAction>, peers: &Peers) {
    for action in actions {
        match action {
            EngineAction::Send { connection_id, event } => {
                peers.send(connection_id, event.encode()).await;
            },
            EngineAction::Broadcast { event } => {
                peers.broadcast(&event.encode()).await;
            },
            EngineAction::Close { connection_id, reason } => {
                tracing::info!("closing connection {connection_id}: {reason}");
                peers.remove(connection_id).await;
            },
            EngineAction::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{message}"),
                LogLevel::Info => tracing::info!("{message}"),
                LogLevel::Warn => tracing::warn!("{message}"),
                LogLevel::Error => tracing::error!("{message}"),
            },
        }
    }
}
