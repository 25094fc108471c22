//! Room store: two-party chat rooms and their message logs.
//!
//! Owns room lifecycle. Rooms are created only by a successful match and
//! deleted the moment they become empty; a concurrent second removal on an
//! already-deleted room is a no-op, not an error.

use std::collections::HashMap;

use whisperlink_proto::Message;

use crate::env::Environment;

/// A two-party chat room.
///
/// Holds 1 or 2 active participants for its entire lifetime; a room that
/// would drop to 0 is deleted instead of stored empty.
#[derive(Debug)]
pub struct Room {
    /// Unique room id.
    pub id: String,
    /// Current occupants (1 or 2).
    pub participants: Vec<String>,
    /// Message log in insertion order.
    pub messages: Vec<Message>,
    /// Creation time, Unix milliseconds.
    pub created_at_ms: u64,
}

/// Outcome of removing a participant from a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    /// Room unknown or participant not in it. Keeps leave idempotent.
    NotTracked,
    /// Participant removed and the room became empty; it was deleted.
    RoomDeleted,
    /// Participant removed; one occupant remains and should be notified.
    PartnerRemains {
        /// The remaining occupant.
        remaining: String,
        /// Occupancy after the removal (always 1 today).
        user_count: u32,
    },
}

/// Mapping from room id to room state, with a participant → room index.
#[derive(Debug, Default)]
pub struct RoomStore {
    rooms: HashMap<String, Room>,
    /// Participant id → room id reverse index.
    participant_rooms: HashMap<String, String>,
}

impl RoomStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room for a freshly matched pair. Returns the room id.
    ///
    /// Callers must ensure neither participant currently occupies a room;
    /// the pairing engine's state machine guarantees this.
    pub fn create<E: Environment>(&mut self, env: &E, a: &str, b: &str) -> String {
        let room_id = env.random_uuid().to_string();
        let room = Room {
            id: room_id.clone(),
            participants: vec![a.to_string(), b.to_string()],
            messages: Vec::new(),
            created_at_ms: env.now_ms(),
        };
        self.rooms.insert(room_id.clone(), room);
        self.participant_rooms.insert(a.to_string(), room_id.clone());
        self.participant_rooms.insert(b.to_string(), room_id.clone());
        room_id
    }

    /// Delete a room outright, unindexing all occupants.
    ///
    /// Used by match-race recovery to undo a room whose second occupant
    /// vanished before it was ever announced.
    pub fn destroy(&mut self, room_id: &str) -> bool {
        let Some(room) = self.rooms.remove(room_id) else {
            return false;
        };
        for participant in &room.participants {
            self.participant_rooms.remove(participant);
        }
        true
    }

    /// Room state by id.
    pub fn get(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    /// Room currently occupied by a participant.
    pub fn room_for(&self, participant_id: &str) -> Option<&str> {
        self.participant_rooms.get(participant_id).map(String::as_str)
    }

    /// The other occupant of a participant's room, if there is one.
    pub fn partner_of(&self, participant_id: &str) -> Option<&str> {
        let room_id = self.participant_rooms.get(participant_id)?;
        let room = self.rooms.get(room_id)?;
        room.participants
            .iter()
            .map(String::as_str)
            .find(|p| *p != participant_id)
    }

    /// Remove a participant from a room.
    ///
    /// Deletes the room if it becomes empty. See [`Removal`].
    pub fn remove_participant(&mut self, room_id: &str, participant_id: &str) -> Removal {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return Removal::NotTracked;
        };
        let before = room.participants.len();
        room.participants.retain(|p| p != participant_id);
        if room.participants.len() == before {
            return Removal::NotTracked;
        }
        self.participant_rooms.remove(participant_id);

        if room.participants.is_empty() {
            self.rooms.remove(room_id);
            return Removal::RoomDeleted;
        }

        let remaining = room.participants[0].clone();
        let user_count = room.participants.len() as u32;
        Removal::PartnerRemains { remaining, user_count }
    }

    /// Append a message to a room's log. Returns `false` for unknown rooms.
    pub fn append(&mut self, room_id: &str, message: Message) -> bool {
        match self.rooms.get_mut(room_id) {
            Some(room) => {
                room.messages.push(message);
                true
            },
            None => false,
        }
    }

    /// Attach a reaction to an existing message by id.
    ///
    /// The only mutation ever applied to a stored message. Returns `false`
    /// if the room or message is unknown.
    pub fn attach_reaction(&mut self, room_id: &str, message_id: &str, emoji: &str) -> bool {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return false;
        };
        match room.messages.iter_mut().find(|m| m.id == message_id) {
            Some(message) => {
                message.reaction = Some(emoji.to_string());
                true
            },
            None => false,
        }
    }

    /// All rooms, unordered.
    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Number of rooms currently tracked.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of participants currently occupying any room.
    pub fn paired_count(&self) -> usize {
        self.participant_rooms.len()
    }
}
