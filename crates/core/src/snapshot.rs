//! Outbound game snapshots
//!
//! Owned copies of session state, serialised by the transport layer. Boards are
//! written as integer tags (0 empty, 1-7 piece color, 8 penalty).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pieces::Tetromino;
use crate::player::{PlayerGameState, PlayerId};
use crate::types::{PieceKind, BOARD_HEIGHT, BOARD_WIDTH};

pub type BoardGrid = [[u8; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i8,
    pub y: i8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PieceSnapshot {
    #[serde(rename = "type")]
    pub kind: PieceKind,
    pub position: Position,
    pub rotation: u8,
}

impl From<Tetromino> for PieceSnapshot {
    fn from(value: Tetromino) -> Self {
        Self {
            kind: value.kind,
            position: Position {
                x: value.x,
                y: value.y,
            },
            rotation: value.rotation.index(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub username: String,
    pub board: BoardGrid,
    pub score: u32,
    pub lines_cleared: u32,
    pub combo: u32,
    pub current_piece: Option<PieceSnapshot>,
    pub next_piece: PieceKind,
    pub is_game_over: bool,
    pub penalties_given: u32,
    pub penalties_received: u32,
}

impl From<&PlayerGameState> for PlayerSnapshot {
    fn from(value: &PlayerGameState) -> Self {
        Self {
            id: value.id.clone(),
            username: value.username.clone(),
            board: value.board.to_u8_grid(),
            score: value.score,
            lines_cleared: value.lines_cleared,
            combo: value.combo,
            current_piece: value.current_piece.map(PieceSnapshot::from),
            next_piece: value.next_piece,
            is_game_over: value.is_game_over(),
            penalties_given: value.penalties_given,
            penalties_received: value.penalties_received,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateSnapshot {
    pub players: BTreeMap<PlayerId, PlayerSnapshot>,
    pub active_players: Vec<PlayerId>,
    pub spectators: Vec<PlayerId>,
    /// Unix milliseconds at which the session started
    pub start_time: Option<u64>,
    pub is_active: bool,
    pub winner: Option<PlayerId>,
}

/// Compact summary of a board for opponent thumbnails
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniBoardState {
    /// Filled cells over total cells
    pub density: f64,
    /// Mean column height
    pub height: f64,
    /// Score scaled down by 10000
    pub penalty_level: f64,
}

impl From<&PlayerGameState> for MiniBoardState {
    fn from(value: &PlayerGameState) -> Self {
        let total = f64::from(BOARD_WIDTH) * f64::from(BOARD_HEIGHT);
        let heights = value.board.column_heights();
        let height_sum: u32 = heights.iter().map(|&h| u32::from(h)).sum();
        Self {
            density: value.board.filled_count() as f64 / total,
            height: f64::from(height_sum) / f64::from(BOARD_WIDTH),
            penalty_level: f64::from(value.score) / 10_000.0,
        }
    }
}
