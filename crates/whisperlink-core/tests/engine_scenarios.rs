//! End-to-end engine scenarios.
//!
//! Each test drives the engine through the same event sequences a real
//! runtime would deliver and asserts on the produced actions and the
//! resulting state.

use whisperlink_core::{
    EngineAction, EngineConfig, EngineEvent, LengthValidator, MemorySink, PairingEngine,
};
use whisperlink_harness::{broadcasts, sent_to, SimEnv};
use whisperlink_proto::{
    ClientEvent, ReactPayload, ReportPayload, RoomJoinedPayload, SendMessagePayload, ServerEvent,
    TypingPayload, UserCountPayload,
};

type TestEngine = PairingEngine<SimEnv, LengthValidator, MemorySink>;

fn engine_with_config(seed: u64, config: EngineConfig) -> (TestEngine, MemorySink) {
    let sink = MemorySink::new();
    let engine = PairingEngine::new(SimEnv::with_seed(seed), LengthValidator, sink.clone(), config);
    (engine, sink)
}

fn engine(seed: u64) -> (TestEngine, MemorySink) {
    engine_with_config(seed, EngineConfig::default())
}

fn open(engine: &mut TestEngine, conn: u64) -> Vec<EngineAction> {
    engine.process_event(EngineEvent::ConnectionOpened { connection_id: conn }).unwrap()
}

fn client(engine: &mut TestEngine, conn: u64, event: ClientEvent) -> Vec<EngineAction> {
    engine.process_event(EngineEvent::Client { connection_id: conn, event }).unwrap()
}

fn close(engine: &mut TestEngine, conn: u64) -> Vec<EngineAction> {
    engine.process_event(EngineEvent::ConnectionClosed { connection_id: conn }).unwrap()
}

/// Open a connection and join, returning the assigned id and the join
/// actions.
fn join(engine: &mut TestEngine, conn: u64) -> (String, Vec<EngineAction>) {
    open(engine, conn);
    let actions = client(engine, conn, ClientEvent::JoinChat { legacy_user_id: None });
    let id = sent_to(&actions, conn)
        .into_iter()
        .find_map(|e| match e {
            ServerEvent::YourUserid(id) => Some(id),
            _ => None,
        })
        .unwrap();
    (id, actions)
}

fn send(engine: &mut TestEngine, conn: u64, content: &str) -> Vec<EngineAction> {
    client(
        engine,
        conn,
        ClientEvent::SendMessage(SendMessagePayload { content: content.to_string(), image: None }),
    )
}

#[test]
fn lone_joiner_is_queued_not_matched() {
    let (mut engine, _) = engine(1);

    let (z, actions) = join(&mut engine, 1);

    let events = sent_to(&actions, 1);
    assert!(events.iter().any(|e| matches!(e, ServerEvent::YourUserid(_))));
    assert!(!events.iter().any(|e| matches!(e, ServerEvent::RoomJoined(_))));

    assert!(engine.queue().contains(&z));
    assert_eq!(engine.rooms().room_count(), 0);
    assert_eq!(engine.online_count(), 1);
}

#[test]
fn second_joiner_matches_the_waiting_one() {
    let (mut engine, _) = engine(2);

    join(&mut engine, 1);
    let (_, actions) = join(&mut engine, 2);

    // Both sides receive room-joined with userCount 2
    let to_y = sent_to(&actions, 2);
    let to_x = sent_to(&actions, 1);
    let room_id = to_y
        .iter()
        .find_map(|e| match e {
            ServerEvent::RoomJoined(RoomJoinedPayload { room_id, user_count: 2 }) => {
                Some(room_id.clone())
            },
            _ => None,
        })
        .unwrap();
    assert!(to_x.contains(&ServerEvent::RoomJoined(RoomJoinedPayload {
        room_id: room_id.clone(),
        user_count: 2
    })));
    assert!(to_x.contains(&ServerEvent::UserJoined(UserCountPayload { user_count: 2 })));

    // Exactly one room, both occupants in it, queue drained
    assert_eq!(engine.rooms().room_count(), 1);
    let room = engine.rooms().get(&room_id).unwrap();
    assert_eq!(room.participants.len(), 2);
    assert!(engine.queue().is_empty());

    // New partner's connection sits at history position 0 for both sides
    assert_eq!(engine.history().recent(1).next(), Some(2));
    assert_eq!(engine.history().recent(2).next(), Some(1));

    assert_eq!(engine.online_count(), 2);
}

#[test]
fn message_reaches_both_occupants_and_the_log() {
    let (mut engine, sink) = engine(3);

    let (x, _) = join(&mut engine, 1);
    join(&mut engine, 2);

    let actions = send(&mut engine, 1, "hi");

    let to_partner = sent_to(&actions, 2);
    let message = to_partner
        .iter()
        .find_map(|e| match e {
            ServerEvent::NewMessage(m) => Some(m.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(message.sender_id, x);
    assert_eq!(message.content, "hi");

    // Sender hears the same event for UI consistency
    assert!(sent_to(&actions, 1).contains(&ServerEvent::NewMessage(message.clone())));

    // Log and best-effort sink both hold the message
    let room = engine.rooms().get(&message.room_id).unwrap();
    assert_eq!(room.messages.len(), 1);
    assert_eq!(sink.messages(), vec![message]);
}

#[test]
fn leave_notifies_partner_then_empty_room_is_deleted() {
    let (mut engine, _) = engine(4);

    let (_, _) = join(&mut engine, 1);
    let (y, _) = join(&mut engine, 2);
    let room_id = engine.rooms().room_for(&y).unwrap().to_string();

    let actions = client(&mut engine, 1, ClientEvent::LeaveChat);

    let to_y = sent_to(&actions, 2);
    assert!(to_y.contains(&ServerEvent::PartnerDisconnected));
    assert!(to_y.contains(&ServerEvent::UserLeft(UserCountPayload { user_count: 1 })));

    // The remaining occupant keeps the room alive
    assert_eq!(engine.rooms().get(&room_id).unwrap().participants, vec![y.clone()]);
    assert_eq!(engine.online_count(), 1);

    // Once the last occupant leaves, the room is gone from the store
    client(&mut engine, 2, ClientEvent::LeaveChat);
    assert!(engine.rooms().get(&room_id).is_none());
    assert_eq!(engine.rooms().room_count(), 0);
    assert_eq!(engine.online_count(), 0);
}

#[test]
fn leave_is_idempotent() {
    let (mut engine, _) = engine(5);

    join(&mut engine, 1);
    join(&mut engine, 2);

    client(&mut engine, 1, ClientEvent::LeaveChat);
    // Second leave finds no session; nothing is sent to anyone
    let actions = client(&mut engine, 1, ClientEvent::LeaveChat);
    assert!(sent_to(&actions, 1).is_empty());
    assert!(sent_to(&actions, 2).is_empty());

    // Disconnect after leave has no further effect on the partner
    let actions = close(&mut engine, 1);
    assert!(sent_to(&actions, 2).is_empty());
    assert_eq!(engine.online_count(), 1);
}

#[test]
fn disconnect_cleans_up_like_leave() {
    let (mut engine, _) = engine(6);

    join(&mut engine, 1);
    let (y, _) = join(&mut engine, 2);

    let actions = close(&mut engine, 1);

    let to_y = sent_to(&actions, 2);
    assert!(to_y.contains(&ServerEvent::PartnerDisconnected));
    assert!(to_y.contains(&ServerEvent::UserLeft(UserCountPayload { user_count: 1 })));
    assert!(!engine.registry().is_live(1));
    assert!(engine.rooms().room_for(&y).is_some());
}

#[test]
fn oversized_message_is_rejected_without_side_effects() {
    let (mut engine, sink) = engine(7);

    join(&mut engine, 1);
    let (y, _) = join(&mut engine, 2);
    let room_id = engine.rooms().room_for(&y).unwrap().to_string();

    let actions = send(&mut engine, 1, &"x".repeat(1001));

    let to_sender = sent_to(&actions, 1);
    assert!(to_sender.iter().any(|e| matches!(e, ServerEvent::Error { .. })));
    // No broadcast to the partner, nothing in the log or sink
    assert!(sent_to(&actions, 2).is_empty());
    assert!(engine.rooms().get(&room_id).unwrap().messages.is_empty());
    assert!(sink.is_empty());
}

#[test]
fn empty_message_is_rejected_but_image_only_is_allowed() {
    let (mut engine, _) = engine(8);

    join(&mut engine, 1);
    join(&mut engine, 2);

    let actions = send(&mut engine, 1, "   ");
    assert!(sent_to(&actions, 1).iter().any(|e| matches!(e, ServerEvent::Error { .. })));

    let actions = client(
        &mut engine,
        1,
        ClientEvent::SendMessage(SendMessagePayload {
            content: String::new(),
            image: Some("data:image/png;base64,AAAA".to_string()),
        }),
    );
    assert!(sent_to(&actions, 2).iter().any(|e| matches!(e, ServerEvent::NewMessage(_))));
}

#[test]
fn typing_reaches_partner_only() {
    let (mut engine, _) = engine(9);

    join(&mut engine, 1);
    join(&mut engine, 2);

    let actions = client(&mut engine, 1, ClientEvent::Typing(TypingPayload { is_typing: true }));

    assert_eq!(sent_to(&actions, 2), vec![ServerEvent::UserTyping(true)]);
    assert!(sent_to(&actions, 1).is_empty());
}

#[test]
fn reaction_is_attached_and_forwarded_to_partner() {
    let (mut engine, _) = engine(10);

    join(&mut engine, 1);
    let (y, _) = join(&mut engine, 2);
    let room_id = engine.rooms().room_for(&y).unwrap().to_string();

    let actions = send(&mut engine, 1, "react to this");
    let message_id = sent_to(&actions, 1)
        .into_iter()
        .find_map(|e| match e {
            ServerEvent::NewMessage(m) => Some(m.id),
            _ => None,
        })
        .unwrap();

    let payload = ReactPayload { message_id: message_id.clone(), emoji: "❤️".to_string() };
    let actions = client(&mut engine, 2, ClientEvent::React(payload.clone()));

    assert_eq!(sent_to(&actions, 1), vec![ServerEvent::MessageReaction(payload)]);
    assert!(sent_to(&actions, 2).is_empty());

    let room = engine.rooms().get(&room_id).unwrap();
    assert_eq!(room.messages[0].reaction.as_deref(), Some("❤️"));
}

#[test]
fn reaction_to_unknown_message_is_dropped() {
    let (mut engine, _) = engine(11);

    join(&mut engine, 1);
    join(&mut engine, 2);

    let actions = client(
        &mut engine,
        1,
        ClientEvent::React(ReactPayload {
            message_id: "missing".to_string(),
            emoji: "🔥".to_string(),
        }),
    );
    assert!(sent_to(&actions, 1).is_empty());
    assert!(sent_to(&actions, 2).is_empty());
}

#[test]
fn freshly_separated_pair_is_not_instantly_rematched() {
    let (mut engine, _) = engine(20);

    join(&mut engine, 1);
    join(&mut engine, 2);
    client(&mut engine, 1, ClientEvent::LeaveChat);
    client(&mut engine, 2, ClientEvent::LeaveChat);

    // Both connections rejoin; recent-partner avoidance keeps them apart
    let actions = client(&mut engine, 1, ClientEvent::JoinChat { legacy_user_id: None });
    assert!(!sent_to(&actions, 1).iter().any(|e| matches!(e, ServerEvent::RoomJoined(_))));
    let actions = client(&mut engine, 2, ClientEvent::JoinChat { legacy_user_id: None });
    assert!(!sent_to(&actions, 2).iter().any(|e| matches!(e, ServerEvent::RoomJoined(_))));
    assert!(sent_to(&actions, 1).is_empty());

    assert_eq!(engine.queue().len(), 2);
    assert_eq!(engine.rooms().room_count(), 0);

    // A newcomer matches the longest waiter, connection 1
    let (_, actions) = join(&mut engine, 3);
    assert!(sent_to(&actions, 1).iter().any(|e| matches!(e, ServerEvent::RoomJoined(_))));
    assert!(sent_to(&actions, 3).iter().any(|e| matches!(e, ServerEvent::RoomJoined(_))));
    assert!(sent_to(&actions, 2).iter().all(|e| !matches!(e, ServerEvent::RoomJoined(_))));
    assert_eq!(engine.queue().len(), 1);
}

#[test]
fn connection_close_drops_its_partner_history() {
    let (mut engine, _) = engine(21);

    join(&mut engine, 1);
    join(&mut engine, 2);

    close(&mut engine, 2);
    assert_eq!(engine.history().recent(2).next(), None);
    // The surviving side still remembers; closed ids are never reused
    assert_eq!(engine.history().recent(1).next(), Some(2));
}

#[test]
fn rejoin_while_paired_tears_down_and_requeues() {
    let (mut engine, _) = engine(12);

    let (x, _) = join(&mut engine, 1);
    join(&mut engine, 2);

    // Duplicate join from the same client forces Idle first, then rejoins
    let actions = client(&mut engine, 1, ClientEvent::JoinChat { legacy_user_id: None });

    let to_partner = sent_to(&actions, 2);
    assert!(to_partner.contains(&ServerEvent::PartnerDisconnected));

    let new_id = sent_to(&actions, 1)
        .into_iter()
        .find_map(|e| match e {
            ServerEvent::YourUserid(id) => Some(id),
            _ => None,
        })
        .unwrap();
    assert_ne!(new_id, x);
    assert!(engine.queue().contains(&new_id));
    assert!(engine.registry().connection_for(&x).is_none());
}

#[test]
fn legacy_join_id_is_ignored() {
    let (mut engine, _) = engine(13);

    open(&mut engine, 1);
    let actions = client(
        &mut engine,
        1,
        ClientEvent::JoinChat { legacy_user_id: Some("old-id".to_string()) },
    );

    let id = sent_to(&actions, 1)
        .into_iter()
        .find_map(|e| match e {
            ServerEvent::YourUserid(id) => Some(id),
            _ => None,
        })
        .unwrap();
    assert_ne!(id, "old-id");
}

#[test]
fn events_without_a_session_are_silently_dropped() {
    let (mut engine, sink) = engine(14);

    open(&mut engine, 1);
    let actions = send(&mut engine, 1, "hello?");

    // No error event, no broadcast; just dropped
    assert!(sent_to(&actions, 1).is_empty());
    assert!(!actions.iter().any(|a| matches!(a, EngineAction::Broadcast { .. })));
    assert!(sink.is_empty());
}

#[test]
fn online_count_follows_joins_and_leaves() {
    let (mut engine, _) = engine(15);

    let actions = open(&mut engine, 1);
    assert_eq!(broadcasts(&actions), vec![ServerEvent::OnlineUsers(0)]);

    // Connection 1 is already open; join directly rather than via the
    // helper, which would open it a second time.
    let actions = client(&mut engine, 1, ClientEvent::JoinChat { legacy_user_id: None });
    assert_eq!(broadcasts(&actions), vec![ServerEvent::OnlineUsers(1)]);

    let (_, actions) = join(&mut engine, 2);
    assert_eq!(broadcasts(&actions), vec![ServerEvent::OnlineUsers(2)]);

    let actions = client(&mut engine, 1, ClientEvent::LeaveChat);
    assert_eq!(broadcasts(&actions), vec![ServerEvent::OnlineUsers(1)]);

    let actions = close(&mut engine, 2);
    assert_eq!(broadcasts(&actions), vec![ServerEvent::OnlineUsers(0)]);
}

#[test]
fn online_count_boost_is_config_gated() {
    let config = EngineConfig { boost_online_count: true, ..EngineConfig::default() };
    let (mut engine, _) = engine_with_config(16, config);

    join(&mut engine, 1);
    join(&mut engine, 2);
    let (_, actions) = join(&mut engine, 3);

    // 3 online, displayed as floor(3 * 1.5) = 4
    assert_eq!(broadcasts(&actions), vec![ServerEvent::OnlineUsers(4)]);
}

#[test]
fn max_connections_closes_further_accepts() {
    let config = EngineConfig { max_connections: 1, ..EngineConfig::default() };
    let (mut engine, _) = engine_with_config(17, config);

    open(&mut engine, 1);
    let actions = open(&mut engine, 2);

    assert!(actions
        .iter()
        .any(|a| matches!(a, EngineAction::Close { connection_id: 2, .. })));
    assert!(!engine.registry().is_live(2));
}

#[test]
fn report_message_is_acknowledged() {
    let (mut engine, _) = engine(18);

    open(&mut engine, 1);
    let actions = client(
        &mut engine,
        1,
        ClientEvent::ReportMessage(ReportPayload {
            message_id: "m1".to_string(),
            reason: "spam".to_string(),
        }),
    );

    assert_eq!(sent_to(&actions, 1), vec![ServerEvent::ReportSubmitted { success: true }]);
}

#[test]
fn events_on_unopened_connections_are_runtime_errors() {
    let (mut engine, _) = engine(19);

    let result = engine.process_event(EngineEvent::Client {
        connection_id: 99,
        event: ClientEvent::LeaveChat,
    });
    assert!(result.is_err());
}
