//! Per-player game state
//!
//! A `PlayerGameState` owns its board, its falling piece and its piece queue.
//! Dropping it drops all of them.

use crate::board::Board;
use crate::pieces::Tetromino;
use crate::rng::PieceQueue;
use crate::types::PieceKind;

/// Stable identity of a player, issued by the authentication collaborator
pub type PlayerId = String;

/// Whether a seated player is still placing pieces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlayerStatus {
    #[default]
    Active,
    /// Topped out; the player now watches from the spectator list
    GameOver,
}

#[derive(Debug, Clone)]
pub struct PlayerGameState {
    pub id: PlayerId,
    pub username: String,
    pub board: Board,
    pub score: u32,
    pub lines_cleared: u32,
    /// Consecutive landings that cleared at least one line
    pub combo: u32,
    pub current_piece: Option<Tetromino>,
    pub next_piece: PieceKind,
    pub status: PlayerStatus,
    pub penalties_given: u32,
    pub penalties_received: u32,
    queue: PieceQueue,
}

impl PlayerGameState {
    /// Fresh player with an empty board and a seeded piece queue
    pub fn new(id: PlayerId, username: String, seed: u64) -> Self {
        Self::with_queue(id, username, PieceQueue::new(seed))
    }

    pub fn with_queue(id: PlayerId, username: String, mut queue: PieceQueue) -> Self {
        let next_piece = queue.draw();
        Self {
            id,
            username,
            board: Board::new(),
            score: 0,
            lines_cleared: 0,
            combo: 0,
            current_piece: None,
            next_piece,
            status: PlayerStatus::Active,
            penalties_given: 0,
            penalties_received: 0,
            queue,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.status == PlayerStatus::GameOver
    }

    /// Promote `next_piece` to a freshly spawned current piece and draw a new next piece
    pub fn spawn_next(&mut self) {
        self.current_piece = Some(Tetromino::new(self.next_piece));
        self.next_piece = self.queue.draw();
    }

    /// Whether the current piece overlaps the stack or the walls
    pub fn current_piece_collides(&self) -> bool {
        self.current_piece
            .is_some_and(|piece| self.board.collides(&piece.cells()))
    }
}
