use thiserror::Error;

use crate::room::RoomId;

/// Why a lobby intent could not be carried out
///
/// Intents that reach a room but are illegal in its current state (moving while the
/// room is still waiting, acting after topping out) are not errors; they are
/// ignored and reported as "no change".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("Room not found")]
    RoomNotFound(RoomId),

    #[error("Not in a room")]
    NotInRoom,

    #[error("Player is not part of room {0}")]
    NotInThatRoom(RoomId),

    #[error("Only seated players can do that")]
    NotSeated,
}
