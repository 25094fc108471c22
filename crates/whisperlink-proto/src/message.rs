//! Chat message data model.

use serde::{Deserialize, Serialize};

/// A single chat message within a room's log.
///
/// Appended only to the room the sender currently occupies; insertion order
/// within the log is the only ordering guarantee. The sole mutation ever
/// applied to a stored message is attaching a reaction by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message id.
    pub id: String,
    /// Room this message belongs to.
    pub room_id: String,
    /// Participant id of the sender.
    #[serde(rename = "userId")]
    pub sender_id: String,
    /// Message text.
    pub content: String,
    /// Optional image attachment (opaque data URL).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// Emoji reaction attached after the fact, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reaction: Option<String>,
}
