//! Adapter - arena clients over TCP with a JSON line protocol
//!
//! This crate puts the lobby on the network. It is deliberately thin: every rule
//! lives in `tetris-arena-room` and `tetris-arena-core`; the adapter only parses
//! lines, calls the lobby and fans the results out to the right connections.
//!
//! # Protocol Overview
//!
//! One JSON object per line, tagged by `type`:
//!
//! 1. **Auth**: the client presents an identity (`auth`), server answers `authSuccess`
//! 2. **Rooms**: `listRooms`, `createRoom`, `joinRoom`, `leaveRoom`, `playerReady`
//! 3. **Play**: `gameAction` carries one intent (`moveLeft`, `rotate`, `hardDrop`, ...)
//! 4. **Streaming**: every tick a playing room receives `roomUpdated` and `gameState`
//!
//! Intents sent before `auth` are answered with an `error`.
//!
//! # Environment Variables
//!
//! - `TETRIS_ARENA_HOST`: Bind address (default: "127.0.0.1")
//! - `TETRIS_ARENA_PORT`: Port number (default: 7878)
//! - `TETRIS_ARENA_MAX_LINE_BYTES`: Longest accepted line (default: 8192)
//! - `RUST_LOG`: log filter (default: "info")
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"auth","userId":"u1","username":"alice"}
//! Server -> Client: {"type":"authSuccess","userId":"u1"}
//! Client -> Server: {"type":"createRoom","name":"friday"}
//! Server -> Client: {"type":"roomCreated","room":{"id":"...","name":"friday","state":"waiting",...}}
//! Client -> Server: {"type":"gameAction","action":{"kind":"rotate","clockwise":false}}
//! ```
//!
//! # Testing
//!
//! ```bash
//! nc 127.0.0.1 7878
//! {"type":"auth","userId":"u1","username":"alice"}
//! {"type":"listRooms"}
//! ```

pub mod protocol;
pub mod server;
pub mod telemetry;

pub use tetris_arena_core as core;
pub use tetris_arena_room as room;
pub use tetris_arena_types as types;

pub use protocol::{encode_message, parse_message, ClientMessage, ServerMessage};
pub use server::{run_server, ServerConfig};
pub use telemetry::init_tracing;
