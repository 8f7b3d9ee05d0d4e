//! Core game logic - pure and deterministic
//!
//! Everything needed to run one multiplayer match: boards, pieces, the 7-bag queue,
//! scoring, penalty attacks and the session that ties them together. There is no
//! networking or wall-clock timing here; callers decide when gravity fires.
//!
//! # Module Structure
//!
//! - [`board`]: 10x20 grid with collision, landing, line clearing and penalty rows
//! - [`pieces`]: tetromino shapes, rotation and wall kicks
//! - [`rng`]: 7-bag piece queue
//! - [`scoring`]: line clear table and combo bonus
//! - [`penalty`]: weighted attack targeting and penalty row generation
//! - [`player`]: per-player state
//! - [`session`]: a match between up to eight players
//! - [`snapshot`]: serialisable copies of session state
//!
//! # Example
//!
//! ```
//! use tetris_arena_core::GameSession;
//! use tetris_arena_types::GameAction;
//!
//! let mut session = GameSession::with_seed(12345);
//! session.add_player("a", "alice");
//! session.add_player("b", "bob");
//! assert!(session.start());
//!
//! session.process_action("a", GameAction::MoveRight);
//! session.process_action("a", GameAction::HardDrop);
//!
//! let snapshot = session.snapshot();
//! assert!(snapshot.is_active);
//! assert!(snapshot.players["a"].board[19].iter().any(|&c| c != 0));
//! ```

pub mod board;
pub mod penalty;
pub mod pieces;
pub mod player;
pub mod rng;
pub mod scoring;
pub mod session;
pub mod snapshot;

pub use tetris_arena_types as types;

// Re-export commonly used types for convenience
pub use board::Board;
pub use penalty::{generate_penalty_rows, select_target, target_weight};
pub use pieces::{get_shape, try_rotate, Tetromino};
pub use player::{PlayerGameState, PlayerId, PlayerStatus};
pub use rng::PieceQueue;
pub use scoring::{calculate_score, combo_bonus, score_for, ScoreResult};
pub use session::{GameSession, Seat, SessionStatus};
pub use snapshot::{
    BoardGrid, GameStateSnapshot, MiniBoardState, PieceSnapshot, PlayerSnapshot, Position,
};
