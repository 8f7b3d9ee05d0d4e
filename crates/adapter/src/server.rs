//! TCP server for arena clients
//!
//! One task per connection reads intents and writes replies, one task drives the
//! lobby tick. Everything a room broadcasts goes to the connections currently
//! registered in that room.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Notify, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use tetris_arena_room::{
    ConnectionId, Identity, LeaveResult, Lobby, RoomError, RoomEvent, RoomId,
};

use crate::protocol::{encode_message, parse_message, ClientMessage, ServerMessage};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Longest accepted line; a client sending more is disconnected
    pub max_line_bytes: usize,
    /// Outbound lines queued per client; a client that falls this far behind is
    /// disconnected
    pub max_pending_messages: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            max_line_bytes: 8192,
            max_pending_messages: 256,
        }
    }
}

impl ServerConfig {
    /// Create from `TETRIS_ARENA_HOST`, `TETRIS_ARENA_PORT`,
    /// `TETRIS_ARENA_MAX_LINE_BYTES` and `TETRIS_ARENA_MAX_PENDING_MESSAGES`
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let host = env::var("TETRIS_ARENA_HOST").unwrap_or(defaults.host);
        let port = env::var("TETRIS_ARENA_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);
        let max_line_bytes = env::var("TETRIS_ARENA_MAX_LINE_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(defaults.max_line_bytes);
        let max_pending_messages = env::var("TETRIS_ARENA_MAX_PENDING_MESSAGES")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(defaults.max_pending_messages);

        Self {
            host,
            port,
            max_line_bytes,
            max_pending_messages,
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid socket address {}:{}", self.host, self.port))
    }
}

/// Handle to a connected client
struct ClientHandle {
    identity: Option<Identity>,
    room: Option<RoomId>,
    tx: mpsc::Sender<String>,
    /// Wakes the reader to close a client that stopped draining its queue
    kick: Arc<Notify>,
}

impl ClientHandle {
    fn deliver(&self, connection: ConnectionId, line: String) {
        match self.tx.try_send(line) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(_)) => {
                warn!(connection, "outbound queue full, dropping client");
                self.kick.notify_one();
            }
        }
    }
}

/// Shared server state
struct ServerState {
    config: ServerConfig,
    lobby: Arc<Lobby>,
    clients: RwLock<HashMap<ConnectionId, ClientHandle>>,
}

impl ServerState {
    async fn set_identity(&self, connection: ConnectionId, identity: Identity) {
        if let Some(client) = self.clients.write().await.get_mut(&connection) {
            client.identity = Some(identity);
        }
    }

    async fn set_room(&self, connection: ConnectionId, room: Option<RoomId>) {
        if let Some(client) = self.clients.write().await.get_mut(&connection) {
            client.room = room;
        }
    }

    async fn room_of(&self, connection: ConnectionId) -> Option<RoomId> {
        self.clients
            .read()
            .await
            .get(&connection)
            .and_then(|c| c.room)
    }

    async fn send_to(&self, connection: ConnectionId, message: &ServerMessage) {
        let Some(line) = encode(message) else {
            return;
        };
        if let Some(client) = self.clients.read().await.get(&connection) {
            client.deliver(connection, line);
        }
    }

    /// Send to every connection in `room`, optionally skipping one
    async fn broadcast(&self, room: RoomId, message: &ServerMessage, except: Option<ConnectionId>) {
        let Some(line) = encode(message) else {
            return;
        };
        let clients = self.clients.read().await;
        for (id, client) in clients.iter() {
            if client.room == Some(room) && Some(*id) != except {
                client.deliver(*id, line.clone());
            }
        }
    }
}

fn encode(message: &ServerMessage) -> Option<String> {
    match encode_message(message) {
        Ok(line) => Some(line),
        Err(e) => {
            warn!(error = %e, "failed to encode message");
            None
        }
    }
}

/// Start the TCP server and the lobby tick
///
/// `ready_tx` receives the bound address once the listener is up, which lets tests
/// bind port 0.
pub async fn run_server(
    config: ServerConfig,
    lobby: Arc<Lobby>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let bound = listener.local_addr()?;
    info!(addr = %bound, "arena server listening");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(ServerState {
        config,
        lobby,
        clients: RwLock::new(HashMap::new()),
    });

    tokio::spawn(run_ticks(Arc::clone(&state)));

    let mut connection_counter: ConnectionId = 0;
    loop {
        let (socket, peer) = listener.accept().await?;
        connection_counter += 1;
        let connection = connection_counter;
        info!(connection, peer = %peer, "client connected");

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, connection, Arc::clone(&state)).await {
                warn!(connection, error = %e, "client error");
            }
            disconnect(&state, connection).await;
            info!(connection, "client disconnected");
        });
    }
}

/// Fixed-cadence lobby tick; also reclaims idle rooms on the slower cadence
async fn run_ticks(state: Arc<ServerState>) {
    let mut ticker = interval(state.lobby.timings().tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let now = Instant::now();

        for event in state.lobby.tick(now) {
            dispatch_event(&state, event).await;
        }

        let removed = state.lobby.cleanup(now);
        if removed > 0 {
            info!(removed, "idle rooms reclaimed");
        }
    }
}

async fn dispatch_event(state: &ServerState, event: RoomEvent) {
    match event {
        RoomEvent::ForceStart { room_id, message } => {
            info!(room = %room_id, "forced start");
            state
                .broadcast(room_id, &ServerMessage::ForceStart { message }, None)
                .await;
        }
        RoomEvent::Started { room_id } => {
            state
                .broadcast(room_id, &ServerMessage::Started { room_id }, None)
                .await;
        }
        RoomEvent::Snapshot {
            room_id,
            info,
            game,
        } => {
            state
                .broadcast(room_id, &ServerMessage::RoomUpdated { room: info }, None)
                .await;
            state
                .broadcast(room_id, &ServerMessage::GameState { state: game }, None)
                .await;
        }
        RoomEvent::GameOver {
            room_id,
            winner,
            username,
        } => {
            state
                .broadcast(
                    room_id,
                    &ServerMessage::GameOver {
                        winner,
                        player_name: username,
                    },
                    None,
                )
                .await;
        }
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    connection: ConnectionId,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = tokio::io::split(socket);
    let mut reader = BufReader::new(reader);

    // Channel to send lines to this client
    let (tx, mut rx) = mpsc::channel::<String>(state.config.max_pending_messages);
    let kick = Arc::new(Notify::new());
    state
        .clients
        .write()
        .await
        .insert(
            connection,
            ClientHandle {
                identity: None,
                room: None,
                tx,
                kick: Arc::clone(&kick),
            },
        );

    // Spawn task to write messages to client
    tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if writer.write_all(b"\n").await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    let limit = state.config.max_line_bytes;
    let mut identity: Option<Identity> = None;
    let mut line = String::new();

    loop {
        line.clear();
        let mut bounded = (&mut reader).take(limit as u64 + 1);
        let bytes_read = tokio::select! {
            result = bounded.read_line(&mut line) => result?,
            _ = kick.notified() => break,
        };

        if bytes_read == 0 {
            break;
        }
        if line.len() > limit {
            warn!(connection, limit, "line too long, closing connection");
            state
                .send_to(connection, &ServerMessage::error("Message too large"))
                .await;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let message = match parse_message(trimmed) {
            Ok(message) => message,
            Err(e) => {
                warn!(connection, error = %e, "malformed message");
                state
                    .send_to(connection, &ServerMessage::error("Invalid message"))
                    .await;
                continue;
            }
        };

        if let ClientMessage::Auth { user_id, username } = message {
            info!(connection, user = %user_id, username = %username, "authenticated");
            state
                .send_to(
                    connection,
                    &ServerMessage::AuthSuccess {
                        user_id: user_id.clone(),
                    },
                )
                .await;
            let who = Identity::new(user_id, username);
            state.set_identity(connection, who.clone()).await;
            identity = Some(who);
            continue;
        }

        let Some(who) = identity.as_ref() else {
            state
                .send_to(connection, &ServerMessage::error("Not authenticated"))
                .await;
            continue;
        };

        handle_intent(&state, connection, who, message).await;
    }

    Ok(())
}

async fn handle_intent(
    state: &ServerState,
    connection: ConnectionId,
    who: &Identity,
    message: ClientMessage,
) {
    let lobby = &state.lobby;
    let now = Instant::now();

    match message {
        ClientMessage::Auth { .. } => {}

        ClientMessage::ListRooms => {
            let rooms = lobby.list_rooms(now);
            state
                .send_to(connection, &ServerMessage::RoomList { rooms })
                .await;
        }

        ClientMessage::CreateRoom { name } => {
            match lobby.create_room(who, connection, name.as_deref(), now) {
                Ok(joined) => {
                    if let Some(left) = joined.left {
                        announce_leave(state, connection, who, left).await;
                    }
                    state.set_room(connection, Some(joined.room_id)).await;
                    state
                        .send_to(
                            connection,
                            &ServerMessage::RoomCreated {
                                room: joined.info.clone(),
                            },
                        )
                        .await;
                    state
                        .send_to(connection, &ServerMessage::RoomUpdated { room: joined.info })
                        .await;
                    state
                        .send_to(connection, &ServerMessage::GameState { state: joined.game })
                        .await;
                }
                Err(e) => send_error(state, connection, &e).await,
            }
        }

        ClientMessage::JoinRoom { room_id } => {
            let joined = room_id
                .parse::<RoomId>()
                .map_err(|_| "Room not found".to_string())
                .and_then(|id| {
                    lobby
                        .join_room(who, connection, id, now)
                        .map_err(|e| e.to_string())
                });

            match joined {
                Ok(joined) => {
                    if let Some(left) = joined.left {
                        announce_leave(state, connection, who, left).await;
                    }
                    let room_id = joined.room_id;
                    state.set_room(connection, Some(room_id)).await;
                    state
                        .broadcast(room_id, &ServerMessage::RoomUpdated { room: joined.info }, None)
                        .await;
                    state
                        .broadcast(room_id, &ServerMessage::GameState { state: joined.game }, None)
                        .await;
                    state
                        .send_to(
                            connection,
                            &ServerMessage::JoinResult {
                                success: true,
                                reason: None,
                            },
                        )
                        .await;
                    state
                        .broadcast(
                            room_id,
                            &ServerMessage::PlayerJoined {
                                player_id: who.id.clone(),
                                username: who.username.clone(),
                                is_player: joined.outcome.is_player(),
                            },
                            Some(connection),
                        )
                        .await;
                }
                Err(reason) => {
                    state
                        .send_to(connection, &ServerMessage::error(reason.clone()))
                        .await;
                    state
                        .send_to(
                            connection,
                            &ServerMessage::JoinResult {
                                success: false,
                                reason: Some(reason),
                            },
                        )
                        .await;
                }
            }
        }

        ClientMessage::LeaveRoom => match lobby.leave_room(&who.id, now) {
            Ok(left) => announce_leave(state, connection, who, left).await,
            Err(e) => {
                debug!(connection, error = %e, "leave ignored");
                state.set_room(connection, None).await;
            }
        },

        ClientMessage::PlayerReady { ready } => match lobby.set_ready(&who.id, ready, now) {
            Ok(info) => {
                let room_id = info.id;
                state
                    .broadcast(room_id, &ServerMessage::RoomUpdated { room: info }, None)
                    .await;
            }
            Err(e) => debug!(connection, error = %e, "ready ignored"),
        },

        ClientMessage::GameAction { action } => match lobby.game_action(&who.id, action, now) {
            Ok(result) => {
                if let Some(game) = result.game {
                    state
                        .broadcast(result.room_id, &ServerMessage::GameState { state: game }, None)
                        .await;
                }
                if let Some(over) = result.game_over {
                    state
                        .broadcast(
                            result.room_id,
                            &ServerMessage::GameOver {
                                winner: over.winner,
                                player_name: over.username,
                            },
                            None,
                        )
                        .await;
                }
            }
            Err(e) => debug!(connection, error = %e, "action ignored"),
        },

        ClientMessage::SyncRoomState => {
            if let Ok((info, game)) = lobby.sync(&who.id, now) {
                state
                    .send_to(connection, &ServerMessage::RoomUpdated { room: info })
                    .await;
                state
                    .send_to(connection, &ServerMessage::GameState { state: game })
                    .await;
            }
        }
    }
}

/// Detach the connection from the room it left and tell whoever is still there
async fn announce_leave(
    state: &ServerState,
    connection: ConnectionId,
    who: &Identity,
    left: LeaveResult,
) {
    if state.room_of(connection).await == Some(left.room_id) {
        state.set_room(connection, None).await;
    }
    state
        .broadcast(
            left.room_id,
            &ServerMessage::PlayerLeft {
                player_id: who.id.clone(),
                username: who.username.clone(),
            },
            Some(connection),
        )
        .await;
    state
        .broadcast(
            left.room_id,
            &ServerMessage::RoomUpdated { room: left.info },
            Some(connection),
        )
        .await;
}

async fn send_error(state: &ServerState, connection: ConnectionId, error: &RoomError) {
    state
        .send_to(connection, &ServerMessage::error(error.to_string()))
        .await;
}

/// Drop the connection and leave whatever room it was in
async fn disconnect(state: &ServerState, connection: ConnectionId) {
    let Some(client) = state.clients.write().await.remove(&connection) else {
        return;
    };
    let (Some(who), Some(room_id)) = (client.identity, client.room) else {
        return;
    };
    // A newer connection of the same identity may have moved it elsewhere or
    // taken over its seat.
    if state.lobby.room_of(&who.id) != Some(room_id) {
        return;
    }

    if let Some(left) = state.lobby.disconnect(&who.id, connection, Instant::now()) {
        announce_leave(state, connection, &who, left).await;
    }
}
