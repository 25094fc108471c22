//! Pairing engine: the core state machine.
//!
//! Consumes [`EngineEvent`]s from the runtime and produces
//! [`EngineAction`]s for it to execute. The engine owns all shared state
//! (registry, queue, rooms, history) and is the sole mutator of it; it
//! performs no I/O and has no await points, so the runtime can serialize
//! access with a single lock.
//!
//! Per participant the states are `Idle → Queued → Paired → Idle`. The
//! state is not stored explicitly: a participant is Queued iff the queue
//! holds their entry and Paired iff the room store indexes them. The
//! engine's transitions keep those two mutually exclusive.

use whisperlink_proto::{ClientEvent, RoomJoinedPayload, ServerEvent, UserCountPayload};

use crate::{
    env::Environment,
    error::EngineError,
    history::PartnerHistory,
    queue::{MatchQueue, WaitingEntry},
    registry::SessionRegistry,
    rooms::{Removal, RoomStore},
    router::EventRouter,
    sink::MessageSink,
    validate::Validator,
};

/// Events the engine processes, produced by the transport runtime.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A new transport connection was accepted.
    ConnectionOpened {
        /// Runtime-assigned connection id, unique for the process lifetime.
        connection_id: u64,
    },
    /// A decoded client event arrived on a connection.
    Client {
        /// Connection that sent the event.
        connection_id: u64,
        /// The decoded event.
        event: ClientEvent,
    },
    /// A connection was closed (by peer or transport error).
    ///
    /// Treated as an implicit `leave-chat` followed by session teardown.
    ConnectionClosed {
        /// Connection that closed.
        connection_id: u64,
    },
}

/// Actions the engine produces, executed by the transport runtime.
#[derive(Debug, Clone)]
pub enum EngineAction {
    /// Send an event to one connection.
    Send {
        /// Target connection.
        connection_id: u64,
        /// Event to deliver.
        event: ServerEvent,
    },
    /// Send an event to every open connection.
    Broadcast {
        /// Event to deliver.
        event: ServerEvent,
    },
    /// Close a connection.
    Close {
        /// Connection to close.
        connection_id: u64,
        /// Reason, for the runtime's logs.
        reason: String,
    },
    /// Emit a log line.
    Log {
        /// Severity.
        level: LogLevel,
        /// Message to log.
        message: String,
    },
}

/// Log levels for [`EngineAction::Log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information.
    Debug,
    /// Informational message.
    Info,
    /// Warning.
    Warn,
    /// Error.
    Error,
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum concurrent connections; further accepts are closed.
    pub max_connections: usize,
    /// Recent partner connections remembered per connection.
    pub history_limit: usize,
    /// Character limit for chat messages.
    pub max_message_len: usize,
    /// Byte limit for image attachments (opaque data URLs).
    pub max_image_len: usize,
    /// Inflate the displayed online count by 1.5x, as legacy deployments
    /// did. Off by default; the true count is reported.
    pub boost_online_count: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
            history_limit: 5,
            max_message_len: 1_000,
            max_image_len: 1_048_576,
            boost_online_count: false,
        }
    }
}

/// The pairing engine.
///
/// Generic over the environment (time/RNG), the content validator, and the
/// persistence sink so tests can substitute deterministic or observable
/// implementations.
pub struct PairingEngine<E, V, S>
where
    E: Environment,
    V: Validator,
    S: MessageSink,
{
    registry: SessionRegistry,
    queue: MatchQueue,
    history: PartnerHistory,
    rooms: RoomStore,
    router: EventRouter<V, S>,
    env: E,
    config: EngineConfig,
}

impl<E, V, S> PairingEngine<E, V, S>
where
    E: Environment,
    V: Validator,
    S: MessageSink,
{
    /// Create a new engine.
    pub fn new(env: E, validator: V, sink: S, config: EngineConfig) -> Self {
        Self {
            registry: SessionRegistry::new(),
            queue: MatchQueue::new(),
            history: PartnerHistory::new(config.history_limit),
            rooms: RoomStore::new(),
            router: EventRouter::new(validator, sink),
            env,
            config,
        }
    }

    /// Process one event and return the actions to execute.
    ///
    /// This is the engine's only entry point. Errors indicate runtime
    /// contract violations (see [`EngineError`]); bad client input never
    /// errors, it is dropped with at most a debug log action.
    pub fn process_event(&mut self, event: EngineEvent) -> Result<Vec<EngineAction>, EngineError> {
        match event {
            EngineEvent::ConnectionOpened { connection_id } => self.handle_opened(connection_id),
            EngineEvent::Client { connection_id, event } => self.handle_client(connection_id, event),
            EngineEvent::ConnectionClosed { connection_id } => self.handle_closed(connection_id),
        }
    }

    fn handle_opened(&mut self, connection_id: u64) -> Result<Vec<EngineAction>, EngineError> {
        if self.registry.connection_count() >= self.config.max_connections {
            return Ok(vec![EngineAction::Close {
                connection_id,
                reason: "max connections exceeded".to_string(),
            }]);
        }

        if !self.registry.open(connection_id) {
            return Err(EngineError::ConnectionAlreadyExists(connection_id));
        }

        let mut actions = vec![debug(format!("connection {connection_id} accepted"))];
        // New visitors see the current count immediately, before joining
        actions.push(self.broadcast_online_count());
        Ok(actions)
    }

    fn handle_client(
        &mut self,
        connection_id: u64,
        event: ClientEvent,
    ) -> Result<Vec<EngineAction>, EngineError> {
        if !self.registry.is_live(connection_id) {
            return Err(EngineError::ConnectionNotFound(connection_id));
        }

        match event {
            ClientEvent::JoinChat { legacy_user_id } => {
                Ok(self.handle_join(connection_id, legacy_user_id))
            },
            ClientEvent::SendMessage(payload) => {
                let Some(sender) = self.participant_on(connection_id) else {
                    return Ok(vec![debug(format!(
                        "send-message from connection {connection_id} with no session, dropped"
                    ))]);
                };
                Ok(self.router.route_message(
                    &mut self.rooms,
                    &self.registry,
                    &self.env,
                    &self.config,
                    &sender,
                    payload,
                ))
            },
            ClientEvent::Typing(payload) => {
                let Some(sender) = self.participant_on(connection_id) else {
                    return Ok(Vec::new());
                };
                Ok(self.router.route_typing(&self.rooms, &self.registry, &sender, payload))
            },
            ClientEvent::React(payload) => {
                let Some(sender) = self.participant_on(connection_id) else {
                    return Ok(Vec::new());
                };
                Ok(self.router.route_reaction(&mut self.rooms, &self.registry, &sender, payload))
            },
            ClientEvent::ReportMessage(payload) => {
                Ok(self.router.route_report(connection_id, &payload))
            },
            ClientEvent::LeaveChat => {
                let Some(participant) = self.participant_on(connection_id) else {
                    return Ok(vec![debug(format!(
                        "leave-chat from connection {connection_id} with no session, dropped"
                    ))]);
                };
                let mut actions = Vec::new();
                self.cleanup_participant(&participant, &mut actions);
                actions.push(self.broadcast_online_count());
                Ok(actions)
            },
        }
    }

    fn handle_closed(&mut self, connection_id: u64) -> Result<Vec<EngineAction>, EngineError> {
        let Some(held) = self.registry.close(connection_id) else {
            // Duplicate close from the runtime; disconnects are idempotent
            return Ok(vec![debug(format!("close for unknown connection {connection_id}"))]);
        };

        let mut actions = vec![debug(format!("connection {connection_id} closed"))];
        if let Some(participant) = held {
            self.cleanup_participant(&participant, &mut actions);
        }
        self.history.forget(connection_id);
        actions.push(self.broadcast_online_count());
        Ok(actions)
    }

    /// `join-chat`: assign a fresh identity and attempt a match.
    fn handle_join(
        &mut self,
        connection_id: u64,
        legacy_user_id: Option<String>,
    ) -> Vec<EngineAction> {
        let mut actions = Vec::new();

        if let Some(legacy) = legacy_user_id {
            actions.push(debug(format!(
                "connection {connection_id} sent legacy id {legacy}, assigning fresh id"
            )));
        }

        // Duplicate-join guard: a participant may not hold two states at
        // once, so an existing session is fully torn down first.
        if let Some(existing) = self.participant_on(connection_id) {
            actions.push(debug(format!(
                "connection {connection_id} re-joined while active, cleaning up {existing}"
            )));
            self.cleanup_participant(&existing, &mut actions);
        }

        // Registered connections always get an id; checked in handle_client
        let Some(participant) = self.registry.assign(connection_id, &self.env) else {
            return actions;
        };
        actions.push(EngineAction::Send {
            connection_id,
            event: ServerEvent::YourUserid(participant.clone()),
        });

        self.try_match(&participant, connection_id, &mut actions);
        actions.push(self.broadcast_online_count());
        actions
    }

    /// The matching scan: pair with the oldest eligible waiter or enqueue.
    fn try_match(&mut self, participant: &str, connection_id: u64, actions: &mut Vec<EngineAction>) {
        // Defensive de-duplication against duplicate joins
        self.queue.remove(participant);

        let requester =
            WaitingEntry { participant_id: participant.to_string(), connection_id };
        let registry = &self.registry;
        let selected =
            self.queue.select(&requester, &self.history, |conn| registry.is_live(conn));

        let Some(candidate) = selected else {
            self.queue.push_back(requester);
            actions.push(debug(format!("participant {participant} queued, no candidates")));
            return;
        };

        let room_id = self.rooms.create(&self.env, &candidate.participant_id, participant);

        // Race recovery: the candidate's connection may have died between
        // selection and room wiring. Undo the room and put the requester at
        // the head of the queue so they win the next match.
        if !self.registry.is_live(candidate.connection_id) {
            self.rooms.destroy(&room_id);
            self.queue.push_front(WaitingEntry {
                participant_id: participant.to_string(),
                connection_id,
            });
            actions.push(EngineAction::Log {
                level: LogLevel::Warn,
                message: format!(
                    "candidate {} vanished mid-match, re-queued {participant} at head",
                    candidate.participant_id
                ),
            });
            return;
        }

        self.history.record(connection_id, candidate.connection_id);

        let joined = ServerEvent::RoomJoined(RoomJoinedPayload {
            room_id: room_id.clone(),
            user_count: 2,
        });
        actions.push(EngineAction::Send { connection_id, event: joined.clone() });
        actions.push(EngineAction::Send {
            connection_id: candidate.connection_id,
            event: joined,
        });
        // The waiting side also learns the occupancy changed
        actions.push(EngineAction::Send {
            connection_id: candidate.connection_id,
            event: ServerEvent::UserJoined(UserCountPayload { user_count: 2 }),
        });
        actions.push(EngineAction::Log {
            level: LogLevel::Info,
            message: format!(
                "matched {participant} with {} in room {room_id}",
                candidate.participant_id
            ),
        });
    }

    /// Full teardown of a participant: dequeue, shrink/destroy their room
    /// with partner notifications, release the identity. Partner history
    /// is untouched; it lives with the connection, not the participant.
    ///
    /// Safe to call for participants in any state; every step is
    /// idempotent, which is what makes leave-then-disconnect a no-op.
    fn cleanup_participant(&mut self, participant: &str, actions: &mut Vec<EngineAction>) {
        self.queue.remove(participant);

        if let Some(room_id) = self.rooms.room_for(participant).map(str::to_string) {
            match self.rooms.remove_participant(&room_id, participant) {
                Removal::PartnerRemains { remaining, user_count } => {
                    if let Some(conn) = self.registry.connection_for(&remaining) {
                        actions.push(EngineAction::Send {
                            connection_id: conn,
                            event: ServerEvent::PartnerDisconnected,
                        });
                        actions.push(EngineAction::Send {
                            connection_id: conn,
                            event: ServerEvent::UserLeft(UserCountPayload { user_count }),
                        });
                    }
                },
                Removal::RoomDeleted => {
                    actions.push(debug(format!("room {room_id} deleted, empty")));
                },
                Removal::NotTracked => {},
            }
        }

        self.registry.release(participant);
        actions.push(debug(format!("participant {participant} cleaned up")));
    }

    /// Current online count: participants queued or paired.
    pub fn online_count(&self) -> u32 {
        (self.queue.len() + self.rooms.paired_count()) as u32
    }

    fn broadcast_online_count(&self) -> EngineAction {
        let count = self.online_count();
        let display = if self.config.boost_online_count { count + count / 2 } else { count };
        EngineAction::Broadcast { event: ServerEvent::OnlineUsers(display) }
    }

    fn participant_on(&self, connection_id: u64) -> Option<String> {
        self.registry.participant_for(connection_id).map(str::to_string)
    }

    /// Read access to the session registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Read access to the waiting queue.
    pub fn queue(&self) -> &MatchQueue {
        &self.queue
    }

    /// Read access to the room store.
    pub fn rooms(&self) -> &RoomStore {
        &self.rooms
    }

    /// Read access to the partner history.
    pub fn history(&self) -> &PartnerHistory {
        &self.history
    }
}

fn debug(message: String) -> EngineAction {
    EngineAction::Log { level: LogLevel::Debug, message }
}
