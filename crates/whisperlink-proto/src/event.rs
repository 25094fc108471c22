//! Client and server event envelopes.
//!
//! Event names and payload shapes mirror the deployed transport surface
//! one-for-one so existing clients keep working unmodified.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{error::ProtocolError, message::Message};

/// Payload of `send-message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    /// Message text.
    pub content: String,
    /// Optional image attachment (opaque data URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Payload of `typing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    /// Whether the sender is currently typing.
    pub is_typing: bool,
}

/// Payload of `react` and `message-reaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactPayload {
    /// Message the reaction targets.
    pub message_id: String,
    /// Emoji string to attach.
    pub emoji: String,
}

/// Payload of `report-message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    /// Message being reported.
    pub message_id: String,
    /// Free-form reason supplied by the client.
    pub reason: String,
}

/// Payload of `room-joined`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinedPayload {
    /// Room the participant was placed in.
    pub room_id: String,
    /// Occupancy after the join.
    pub user_count: u32,
}

/// Payload of `user-joined` and `user-left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCountPayload {
    /// Room occupancy after the change.
    pub user_count: u32,
}

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Enter matching. Legacy clients send their previous participant id;
    /// the server ignores it and always assigns a fresh one.
    JoinChat {
        /// Participant id from a previous session, if the client sent one.
        legacy_user_id: Option<String>,
    },
    /// Send a chat message to the current room.
    SendMessage(SendMessagePayload),
    /// Typing indicator state change.
    Typing(TypingPayload),
    /// Attach an emoji reaction to an existing message.
    React(ReactPayload),
    /// Report a message for moderation.
    ReportMessage(ReportPayload),
    /// Leave the current room or waiting queue.
    LeaveChat,
}

impl ClientEvent {
    /// Decode a client event from a WebSocket text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let envelope = Envelope::parse(text)?;
        match envelope.event.as_str() {
            "join-chat" => {
                // Legacy clients pass their old id as a bare string; anything
                // that is not a string is treated as "no id".
                let legacy_user_id = match envelope.data {
                    Some(Value::String(id)) => Some(id),
                    _ => None,
                };
                Ok(Self::JoinChat { legacy_user_id })
            },
            "send-message" => envelope.payload("send-message").map(Self::SendMessage),
            "typing" => envelope.payload("typing").map(Self::Typing),
            "react" => envelope.payload("react").map(Self::React),
            "report-message" => envelope.payload("report-message").map(Self::ReportMessage),
            "leave-chat" => Ok(Self::LeaveChat),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }

    /// Encode this event as a WebSocket text frame.
    ///
    /// Used by test clients; the production server only decodes.
    pub fn encode(&self) -> String {
        let envelope = match self {
            Self::JoinChat { legacy_user_id: Some(id) } => {
                json!({"event": "join-chat", "data": id})
            },
            Self::JoinChat { legacy_user_id: None } => json!({"event": "join-chat"}),
            Self::SendMessage(p) => json!({"event": "send-message", "data": p}),
            Self::Typing(p) => json!({"event": "typing", "data": p}),
            Self::React(p) => json!({"event": "react", "data": p}),
            Self::ReportMessage(p) => json!({"event": "report-message", "data": p}),
            Self::LeaveChat => json!({"event": "leave-chat"}),
        };
        envelope.to_string()
    }
}

/// Events the server sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Assigned participant id for this session.
    YourUserid(String),
    /// The participant was placed in a room.
    RoomJoined(RoomJoinedPayload),
    /// Another participant joined the room.
    UserJoined(UserCountPayload),
    /// A participant left the room.
    UserLeft(UserCountPayload),
    /// A new message was appended to the room log.
    NewMessage(Message),
    /// The partner's typing indicator changed.
    UserTyping(bool),
    /// A reaction was attached to a message.
    MessageReaction(ReactPayload),
    /// The partner disconnected or left.
    PartnerDisconnected,
    /// Process-wide online participant count.
    OnlineUsers(u32),
    /// Acknowledgement of a `report-message`.
    ReportSubmitted {
        /// Whether the report was accepted.
        success: bool,
    },
    /// An operation failed; reported to the originating connection only.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

impl ServerEvent {
    /// Encode this event as a WebSocket text frame.
    pub fn encode(&self) -> String {
        let envelope = match self {
            Self::YourUserid(id) => json!({"event": "your-userid", "data": id}),
            Self::RoomJoined(p) => json!({"event": "room-joined", "data": p}),
            Self::UserJoined(p) => json!({"event": "user-joined", "data": p}),
            Self::UserLeft(p) => json!({"event": "user-left", "data": p}),
            Self::NewMessage(m) => json!({"event": "new-message", "data": m}),
            Self::UserTyping(t) => json!({"event": "user-typing", "data": t}),
            Self::MessageReaction(p) => json!({"event": "message-reaction", "data": p}),
            Self::PartnerDisconnected => json!({"event": "partner-disconnected"}),
            Self::OnlineUsers(n) => json!({"event": "online-users", "data": n}),
            Self::ReportSubmitted { success } => {
                json!({"event": "report-submitted", "data": {"success": success}})
            },
            Self::Error { message } => json!({"event": "error", "data": {"message": message}}),
        };
        envelope.to_string()
    }

    /// Decode a server event from a WebSocket text frame.
    ///
    /// Used by test clients; the production server only encodes.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let envelope = Envelope::parse(text)?;
        match envelope.event.as_str() {
            "your-userid" => envelope.payload("your-userid").map(Self::YourUserid),
            "room-joined" => envelope.payload("room-joined").map(Self::RoomJoined),
            "user-joined" => envelope.payload("user-joined").map(Self::UserJoined),
            "user-left" => envelope.payload("user-left").map(Self::UserLeft),
            "new-message" => envelope.payload("new-message").map(Self::NewMessage),
            "user-typing" => envelope.payload("user-typing").map(Self::UserTyping),
            "message-reaction" => envelope.payload("message-reaction").map(Self::MessageReaction),
            "partner-disconnected" => Ok(Self::PartnerDisconnected),
            "online-users" => envelope.payload("online-users").map(Self::OnlineUsers),
            "report-submitted" => {
                #[derive(Deserialize)]
                struct Ack {
                    success: bool,
                }
                let ack: Ack = envelope.payload("report-submitted")?;
                Ok(Self::ReportSubmitted { success: ack.success })
            },
            "error" => {
                #[derive(Deserialize)]
                struct Failure {
                    message: String,
                }
                let err: Failure = envelope.payload("error")?;
                Ok(Self::Error { message: err.message })
            },
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }
}

/// Raw `{"event", "data"}` envelope.
#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Option<Value>,
}

impl Envelope {
    fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))
    }

    /// Deserialize the `data` member into the payload type for `event`.
    fn payload<T: serde::de::DeserializeOwned>(
        self,
        event: &'static str,
    ) -> Result<T, ProtocolError> {
        let data = self.data.unwrap_or(Value::Null);
        serde_json::from_value(data)
            .map_err(|e| ProtocolError::InvalidPayload { event, reason: e.to_string() })
    }
}
