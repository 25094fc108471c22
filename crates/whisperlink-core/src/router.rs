//! Event router: message, typing, and reaction fan-out.
//!
//! Resolves a sender to their current room and forwards the event to the
//! right occupants. Reads the room store and appends messages; all other
//! state belongs to the pairing engine. Holds the two external
//! collaborators: content validation and the best-effort persistence sink.

use whisperlink_proto::{
    Message, ReactPayload, ReportPayload, SendMessagePayload, ServerEvent, TypingPayload,
};

use crate::{
    engine::{EngineAction, EngineConfig, LogLevel},
    env::Environment,
    registry::SessionRegistry,
    rooms::RoomStore,
    sink::MessageSink,
    validate::{ValidationError, Validator},
};

/// Routes room-scoped events between paired participants.
pub struct EventRouter<V, S>
where
    V: Validator,
    S: MessageSink,
{
    validator: V,
    sink: S,
}

impl<V, S> EventRouter<V, S>
where
    V: Validator,
    S: MessageSink,
{
    /// Create a router with the given collaborators.
    pub fn new(validator: V, sink: S) -> Self {
        Self { validator, sink }
    }

    /// `send-message`: validate, append, persist best-effort, broadcast.
    ///
    /// The sender must be paired; anything else is dropped with a debug
    /// log. On validation failure only the sender hears about it and no
    /// state is mutated. On success `new-message` goes to every occupant,
    /// the sender included, so all clients render from the same event.
    pub fn route_message<E: Environment>(
        &self,
        rooms: &mut RoomStore,
        registry: &SessionRegistry,
        env: &E,
        config: &EngineConfig,
        sender: &str,
        payload: SendMessagePayload,
    ) -> Vec<EngineAction> {
        let Some(room_id) = rooms.room_for(sender).map(str::to_string) else {
            return vec![debug(format!("send-message from unpaired {sender}, dropped"))];
        };

        let Some(sender_conn) = registry.connection_for(sender) else {
            return vec![debug(format!("send-message from {sender} with no connection"))];
        };

        if let Some(image) = &payload.image {
            if image.len() > config.max_image_len {
                return vec![error_to(sender_conn, "image too large")];
            }
        }

        match self.validator.validate(&payload.content, config.max_message_len) {
            Ok(()) => {},
            // An attachment with no caption is a valid message
            Err(ValidationError::Empty) if payload.image.is_some() => {},
            Err(reason) => return vec![error_to(sender_conn, &reason.to_string())],
        }

        let message = Message {
            id: env.random_uuid().to_string(),
            room_id: room_id.clone(),
            sender_id: sender.to_string(),
            content: payload.content,
            image: payload.image,
            timestamp: env.now_ms(),
            reaction: None,
        };

        rooms.append(&room_id, message.clone());

        let mut actions = Vec::new();
        if let Err(e) = self.sink.persist(&message) {
            // Persistence is best-effort; the chat path never fails on it
            actions.push(EngineAction::Log {
                level: LogLevel::Warn,
                message: format!("persist failed for message {}: {e}", message.id),
            });
        }

        if let Some(room) = rooms.get(&room_id) {
            for occupant in &room.participants {
                if let Some(conn) = registry.connection_for(occupant) {
                    actions.push(EngineAction::Send {
                        connection_id: conn,
                        event: ServerEvent::NewMessage(message.clone()),
                    });
                }
            }
        }
        actions
    }

    /// `typing`: forward the indicator to the partner only, never back to
    /// the sender.
    pub fn route_typing(
        &self,
        rooms: &RoomStore,
        registry: &SessionRegistry,
        sender: &str,
        payload: TypingPayload,
    ) -> Vec<EngineAction> {
        let Some(partner) = rooms.partner_of(sender) else {
            return Vec::new();
        };
        let Some(conn) = registry.connection_for(partner) else {
            return Vec::new();
        };
        vec![EngineAction::Send {
            connection_id: conn,
            event: ServerEvent::UserTyping(payload.is_typing),
        }]
    }

    /// `react`: attach an emoji to an existing message, then tell the
    /// partner. Unknown message ids are dropped silently.
    pub fn route_reaction(
        &self,
        rooms: &mut RoomStore,
        registry: &SessionRegistry,
        sender: &str,
        payload: ReactPayload,
    ) -> Vec<EngineAction> {
        let Some(room_id) = rooms.room_for(sender).map(str::to_string) else {
            return vec![debug(format!("react from unpaired {sender}, dropped"))];
        };

        if !rooms.attach_reaction(&room_id, &payload.message_id, &payload.emoji) {
            return vec![debug(format!(
                "react for unknown message {} in room {room_id}, dropped",
                payload.message_id
            ))];
        }

        let mut actions = Vec::new();
        if let Some(partner) = rooms.partner_of(sender) {
            if let Some(conn) = registry.connection_for(partner) {
                actions.push(EngineAction::Send {
                    connection_id: conn,
                    event: ServerEvent::MessageReaction(payload),
                });
            }
        }
        actions
    }

    /// `report-message`: acknowledge and log. Moderation is external.
    pub fn route_report(&self, connection_id: u64, payload: &ReportPayload) -> Vec<EngineAction> {
        vec![
            EngineAction::Log {
                level: LogLevel::Info,
                message: format!(
                    "message {} reported: {}",
                    payload.message_id, payload.reason
                ),
            },
            EngineAction::Send {
                connection_id,
                event: ServerEvent::ReportSubmitted { success: true },
            },
        ]
    }
}

fn debug(message: String) -> EngineAction {
    EngineAction::Log { level: LogLevel::Debug, message }
}

fn error_to(connection_id: u64, message: &str) -> EngineAction {
    EngineAction::Send {
        connection_id,
        event: ServerEvent::Error { message: message.to_string() },
    }
}
