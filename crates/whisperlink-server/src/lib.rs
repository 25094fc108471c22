//! Whisperlink production server.
//!
//! Production glue that wraps [`whisperlink_core`]'s action-based pairing
//! logic with real I/O: axum WebSockets for transport, Tokio for the async
//! runtime, and system time with cryptographic RNG.
//!
//! # Architecture
//!
//! The [`PairingEngine`] is pure logic with no await points; the runtime
//! serializes access to it with a single async mutex. Each WebSocket
//! connection runs a read loop that decodes frames into engine events and
//! a writer task that drains an outbound channel. The engine's actions
//! are executed against the [`Peers`] map, which owns every connection's
//! outbound sender.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod peers;
mod system_env;

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
pub use error::ServerError;
use futures_util::{SinkExt, StreamExt};
pub use peers::{Peers, execute_actions};
pub use system_env::SystemEnv;
use tokio::sync::{Mutex, mpsc};
use whisperlink_core::{EngineConfig, EngineEvent, LengthValidator, NullSink, PairingEngine};
use whisperlink_proto::{ClientEvent, ServerEvent};

type Engine = PairingEngine<SystemEnv, LengthValidator, NullSink>;

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:3001").
    pub bind_address: String,
    /// Engine configuration (limits, history depth).
    pub engine: EngineConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0:3001".to_string(), engine: EngineConfig::default() }
    }
}

/// Shared state handed to every connection handler.
#[derive(Clone)]
struct AppState {
    engine: Arc<Mutex<Engine>>,
    peers: Arc<Peers>,
    next_connection_id: Arc<AtomicU64>,
}

/// Production Whisperlink server.
///
/// Wraps [`PairingEngine`] with an axum WebSocket transport and the
/// system environment.
pub struct Server {
    listener: tokio::net::TcpListener,
    state: AppState,
}

impl Server {
    /// Create and bind a new server.
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let engine = PairingEngine::new(
            SystemEnv::new(),
            LengthValidator,
            NullSink,
            config.engine,
        );

        let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;

        Ok(Self {
            listener,
            state: AppState {
                engine: Arc::new(Mutex::new(engine)),
                peers: Arc::new(Peers::new()),
                next_connection_id: Arc::new(AtomicU64::new(1)),
            },
        })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the server, accepting connections and processing frames.
    ///
    /// This method runs until the server is shut down or an error occurs.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = Router::new().route("/ws", get(ws_handler)).with_state(self.state);

        axum::serve(self.listener, app)
            .await
            .map_err(|e| ServerError::Transport(e.to_string()))
    }
}

async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one WebSocket connection through its whole lifecycle.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = state.next_connection_id.fetch_add(1, Ordering::Relaxed);
    tracing::debug!("new connection: {connection_id}");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    state.peers.register(connection_id, tx).await;

    // Writer task: drains the outbound channel until every sender is
    // dropped, then closes the socket
    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    dispatch(&state, EngineEvent::ConnectionOpened { connection_id }).await;

    while let Some(Ok(message)) = ws_receiver.next().await {
        match message {
            Message::Text(text) => match ClientEvent::decode(text.as_str()) {
                Ok(event) => {
                    dispatch(&state, EngineEvent::Client { connection_id, event }).await;
                },
                Err(err) => {
                    tracing::debug!("bad frame from {connection_id}: {err}");
                    let reply = ServerEvent::Error { message: err.to_string() };
                    state.peers.send(connection_id, reply.encode()).await;
                },
            },
            Message::Close(_) => break,
            // Binary frames are not part of the protocol; pings are
            // answered by axum automatically
            _ => {},
        }
    }

    tracing::debug!("connection closed: {connection_id}");
    dispatch(&state, EngineEvent::ConnectionClosed { connection_id }).await;
    state.peers.remove(connection_id).await;
    let _ = writer.await;
}

/// Feed one event through the engine and execute the resulting actions.
async fn dispatch(state: &AppState, event: EngineEvent) {
    let actions = {
        let mut engine = state.engine.lock().await;
        match engine.process_event(event) {
            Ok(actions) => actions,
            Err(err) => {
                // Contract violation between runtime and engine; do not
                // take the connection down over it
                tracing::warn!("engine rejected event: {err}");
                return;
            },
        }
    };

    execute_actions(actions, &state.peers).await;
}
