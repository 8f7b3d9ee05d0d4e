//! Rooms, the lobby and the tick scheduler
//!
//! This crate wraps [`tetris_arena_core::GameSession`] in the room lifecycle that a
//! multiplayer server needs:
//!
//! - [`room`]: roster, spectators, countdown and per-player gravity for one match
//! - [`directory`]: the set of live rooms and idle-room reclamation
//! - [`scheduler`]: the fixed-cadence tick that starts, drops and finishes rooms
//! - [`lobby`]: the boundary facade used by the transport
//! - [`timer`]: clock-agnostic countdown and interval values
//! - [`config`]: timing configuration
//!
//! Nothing here reads the clock on its own. Every time-dependent call takes `now`,
//! so tests can step time forward deterministically.

pub mod config;
pub mod directory;
pub mod error;
pub mod lobby;
pub mod room;
pub mod scheduler;
pub mod timer;

pub use config::RoomTimings;
pub use directory::{RoomDirectory, RoomHandle, DEFAULT_ROOM_NAME};
pub use error::RoomError;
pub use lobby::{ActionResult, Identity, JoinResult, LeaveResult, Lobby};
pub use room::{
    ConnectionId, GameOver, JoinOutcome, Room, RoomId, RoomInfo, RoomPhase, RoomPlayer,
    RoomState, RosterEntry,
};
pub use scheduler::{tick_room, RoomEvent, TickScheduler, FORCE_START_MESSAGE};
pub use timer::{Countdown, Interval};
