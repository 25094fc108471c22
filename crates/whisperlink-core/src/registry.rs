//! Session registry: transport connections and participant identities.
//!
//! Maintains bidirectional mappings: connection → participant (for inbound
//! event resolution) and participant → connection (for outbound sends).
//! A connection exists from transport accept until transport close; a
//! participant identity exists only between `join-chat` and
//! leave/disconnect, and is never reused.

use std::collections::HashMap;

use crate::env::Environment;

/// Registry tracking live connections and their participant identities.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// Connection id → participant id (None until the connection joins).
    connections: HashMap<u64, Option<String>>,
    /// Participant id → connection id (reverse index).
    participants: HashMap<String, u64>,
}

impl SessionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly accepted connection.
    ///
    /// Returns `false` if the connection id is already registered.
    pub fn open(&mut self, connection_id: u64) -> bool {
        if self.connections.contains_key(&connection_id) {
            return false;
        }
        self.connections.insert(connection_id, None);
        true
    }

    /// Remove a connection, returning the participant id it held, if any.
    ///
    /// Returns `None` if the connection was not registered. Closing an
    /// unknown connection is a no-op, keeping disconnect handling
    /// idempotent.
    pub fn close(&mut self, connection_id: u64) -> Option<Option<String>> {
        let participant = self.connections.remove(&connection_id)?;
        if let Some(id) = &participant {
            self.participants.remove(id);
        }
        Some(participant)
    }

    /// Assign a fresh participant id to a connection.
    ///
    /// The id is collision-resistant (UUID v4 from the environment's RNG)
    /// and decoupled from the transport id, so identity management never
    /// leaks transport details. Returns `None` only if the connection is
    /// not registered; for a live connection this always succeeds.
    ///
    /// Any previous identity on the connection must be released by the
    /// caller first; this method replaces the forward mapping
    /// unconditionally.
    pub fn assign<E: Environment>(&mut self, connection_id: u64, env: &E) -> Option<String> {
        if !self.connections.contains_key(&connection_id) {
            return None;
        }

        let participant_id = env.random_uuid().to_string();
        self.connections.insert(connection_id, Some(participant_id.clone()));
        self.participants.insert(participant_id.clone(), connection_id);
        Some(participant_id)
    }

    /// Drop a participant identity while keeping its connection open.
    ///
    /// Used on `leave-chat`: the visitor stays connected and may join
    /// again, receiving a fresh id. Unknown participants are a no-op.
    pub fn release(&mut self, participant_id: &str) -> bool {
        let Some(connection_id) = self.participants.remove(participant_id) else {
            return false;
        };
        if let Some(slot) = self.connections.get_mut(&connection_id) {
            *slot = None;
        }
        true
    }

    /// Participant id currently assigned to a connection.
    pub fn participant_for(&self, connection_id: u64) -> Option<&str> {
        self.connections.get(&connection_id)?.as_deref()
    }

    /// Connection currently backing a participant.
    pub fn connection_for(&self, participant_id: &str) -> Option<u64> {
        self.participants.get(participant_id).copied()
    }

    /// Whether a connection is currently registered.
    ///
    /// This is the liveness check the matching scan uses for lazy eviction
    /// of stale queue entries.
    pub fn is_live(&self, connection_id: u64) -> bool {
        self.connections.contains_key(&connection_id)
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of assigned participant identities.
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// All open connection ids.
    pub fn connections(&self) -> impl Iterator<Item = u64> + '_ {
        self.connections.keys().copied()
    }
}
