//! Shared types and contract constants for the arena server
//!
//! Everything in here is plain data: piece kinds, rotations, board cells and the
//! closed set of player intents. The constants below are part of the client contract
//! and are mirrored by `RoomTimings::default()` in the room crate.
//!
//! # Board Dimensions
//!
//! - **Width**: 10 columns (indexed 0-9)
//! - **Height**: 20 rows (indexed 0-19, row 0 is the top)
//! - **Spawn anchor**: (4, 0), rotation 0
//!
//! # Timing Constants
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TICK_MS` | 100 | Scheduler cadence |
//! | `AUTO_DROP_MS` | 1000 | Gravity interval per player |
//! | `START_COUNTDOWN_MS` | 5000 | WAITING/STARTING countdown |
//! | `FORCED_START_MS` | 30000 | Forced start after first join |
//! | `IDLE_ROOM_TIMEOUT_MS` | 7200000 | Empty room reclamation threshold |
//! | `CLEANUP_INTERVAL_MS` | 1800000 | Reclamation sweep cadence |
//!
//! # Examples
//!
//! ```
//! use tetris_arena_types::{Cell, GameAction, PieceKind, Rotation, BOARD_WIDTH};
//!
//! assert_eq!(PieceKind::from_str("t"), Some(PieceKind::T));
//! assert_eq!(PieceKind::T.color(), 6);
//! assert_eq!(Rotation::North.rotate_cw(), Rotation::East);
//! assert_eq!(Cell::Penalty.tag(), 8);
//! assert_eq!(
//!     GameAction::from_str("rotate"),
//!     Some(GameAction::Rotate { clockwise: true })
//! );
//! assert_eq!(BOARD_WIDTH, 10);
//! ```

use serde::{Deserialize, Serialize};

/// Board width in cells (10 columns)
pub const BOARD_WIDTH: u8 = 10;

/// Board height in cells (20 rows)
pub const BOARD_HEIGHT: u8 = 20;

/// Maximum number of seated players per room
pub const MAX_SEATED_PLAYERS: usize = 8;

/// Anchor column and row for freshly spawned pieces
pub const SPAWN_POSITION: (i8, i8) = (4, 0);

/// Scheduler cadence in milliseconds
pub const TICK_MS: u64 = 100;

/// Per-player gravity interval in milliseconds
pub const AUTO_DROP_MS: u64 = 1000;

/// Countdown between STARTING and PLAYING in milliseconds
pub const START_COUNTDOWN_MS: u64 = 5000;

/// Time a WAITING room may sit after its first join before it is force-started
pub const FORCED_START_MS: u64 = 30_000;

/// Idle time after which an empty room is reclaimed (2 hours)
pub const IDLE_ROOM_TIMEOUT_MS: u64 = 2 * 60 * 60 * 1000;

/// Cadence of the idle-room sweep (30 minutes)
pub const CLEANUP_INTERVAL_MS: u64 = 30 * 60 * 1000;

/// Line clear score table indexed by lines cleared (0-4)
pub const LINE_SCORES: [u32; 5] = [0, 100, 300, 500, 800];

/// Combo scoring base value (50 points per combo step beyond the first)
pub const COMBO_BASE: u32 = 50;

/// Cap on penalty rows sent by a single landing
pub const MAX_PENALTY_ROWS: usize = 4;

/// Numerator of the penalty target weight `PENALTY_WEIGHT / (|diff| + PENALTY_WEIGHT_BIAS)`
pub const PENALTY_WEIGHT: f64 = 1000.0;

/// Bias added to the score difference in the penalty target weight
pub const PENALTY_WEIGHT_BIAS: f64 = 10.0;

/// Cell tag used for penalty blocks
pub const PENALTY_TAG: u8 = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_timing_defaults() {
        assert_eq!(TICK_MS, 100);
        assert_eq!(AUTO_DROP_MS, 1000);
        assert_eq!(START_COUNTDOWN_MS, 5000);
        assert_eq!(FORCED_START_MS, 30_000);
        assert_eq!(IDLE_ROOM_TIMEOUT_MS, 7_200_000);
        assert_eq!(MAX_SEATED_PLAYERS, 8);
    }

    #[test]
    fn piece_colors_are_distinct_and_in_range() {
        let mut colors: Vec<u8> = PieceKind::ALL.iter().map(|k| k.color()).collect();
        colors.sort_unstable();
        assert_eq!(colors, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn cell_tags() {
        assert_eq!(Cell::Empty.tag(), 0);
        assert_eq!(Cell::Block(PieceKind::I).tag(), 1);
        assert_eq!(Cell::Block(PieceKind::Z).tag(), 7);
        assert_eq!(Cell::Penalty.tag(), PENALTY_TAG);
        assert_eq!(Cell::from_tag(8), Some(Cell::Penalty));
        assert_eq!(Cell::from_tag(4), Some(Cell::Block(PieceKind::O)));
        assert_eq!(Cell::from_tag(9), None);
    }

    #[test]
    fn rotation_index_wraps() {
        assert_eq!(Rotation::from_index(4), Rotation::North);
        assert_eq!(Rotation::from_index(7), Rotation::West);
        for r in [Rotation::North, Rotation::East, Rotation::South, Rotation::West] {
            assert_eq!(Rotation::from_index(r.index()), r);
            assert_eq!(r.rotate_cw().rotate_ccw(), r);
        }
    }

    #[test]
    fn game_action_wire_format() {
        let a: GameAction = serde_json::from_str(r#"{"kind":"moveLeft"}"#).unwrap();
        assert_eq!(a, GameAction::MoveLeft);

        let a: GameAction = serde_json::from_str(r#"{"kind":"rotate"}"#).unwrap();
        assert_eq!(a, GameAction::Rotate { clockwise: true });

        let a: GameAction =
            serde_json::from_str(r#"{"kind":"rotate","clockwise":false}"#).unwrap();
        assert_eq!(a, GameAction::Rotate { clockwise: false });

        assert!(serde_json::from_str::<GameAction>(r#"{"kind":"hold"}"#).is_err());
    }
}

/// The seven tetromino piece kinds
///
/// Each kind maps to a fixed color tag written into the board when it lands:
/// I=1, J=2, L=3, O=4, S=5, T=6, Z=7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PieceKind {
    I,
    J,
    L,
    O,
    S,
    T,
    Z,
}

impl PieceKind {
    /// All kinds, in color-tag order
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::J,
        PieceKind::L,
        PieceKind::O,
        PieceKind::S,
        PieceKind::T,
        PieceKind::Z,
    ];

    /// Color tag (1-7) written into the board on landing
    pub fn color(&self) -> u8 {
        match self {
            PieceKind::I => 1,
            PieceKind::J => 2,
            PieceKind::L => 3,
            PieceKind::O => 4,
            PieceKind::S => 5,
            PieceKind::T => 6,
            PieceKind::Z => 7,
        }
    }

    /// Inverse of [`PieceKind::color`]
    pub fn from_color(tag: u8) -> Option<Self> {
        match tag {
            1..=7 => Some(Self::ALL[(tag - 1) as usize]),
            _ => None,
        }
    }

    /// Parse piece kind from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "i" => Some(PieceKind::I),
            "j" => Some(PieceKind::J),
            "l" => Some(PieceKind::L),
            "o" => Some(PieceKind::O),
            "s" => Some(PieceKind::S),
            "t" => Some(PieceKind::T),
            "z" => Some(PieceKind::Z),
            _ => None,
        }
    }
}

/// Rotation states, indexed 0-3
///
/// The rotation cycle goes: North (0) → East (1) → South (2) → West (3) → North
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    North,
    East,
    South,
    West,
}

impl Rotation {
    /// Rotate clockwise (90°)
    ///
    /// # Examples
    ///
    /// ```
    /// use tetris_arena_types::Rotation;
    ///
    /// assert_eq!(Rotation::North.rotate_cw(), Rotation::East);
    /// assert_eq!(Rotation::West.rotate_cw(), Rotation::North);
    /// ```
    pub fn rotate_cw(&self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// Rotate counter-clockwise, i.e. three clockwise steps
    ///
    /// # Examples
    ///
    /// ```
    /// use tetris_arena_types::Rotation;
    ///
    /// assert_eq!(Rotation::North.rotate_ccw(), Rotation::West);
    /// assert_eq!(Rotation::East.rotate_ccw(), Rotation::North);
    /// ```
    pub fn rotate_ccw(&self) -> Self {
        Self::from_index(self.index() + 3)
    }

    /// Rotation index in `0..4`
    pub fn index(&self) -> u8 {
        match self {
            Rotation::North => 0,
            Rotation::East => 1,
            Rotation::South => 2,
            Rotation::West => 3,
        }
    }

    /// Rotation for `index mod 4`
    pub fn from_index(index: u8) -> Self {
        match index % 4 {
            0 => Rotation::North,
            1 => Rotation::East,
            2 => Rotation::South,
            _ => Rotation::West,
        }
    }
}

/// A cell on a player's board
///
/// Serialized on the wire as its integer tag: 0 empty, 1-7 landed piece color,
/// 8 penalty block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Block(PieceKind),
    Penalty,
}

impl Cell {
    pub fn tag(&self) -> u8 {
        match self {
            Cell::Empty => 0,
            Cell::Block(kind) => kind.color(),
            Cell::Penalty => PENALTY_TAG,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Cell::Empty),
            PENALTY_TAG => Some(Cell::Penalty),
            _ => PieceKind::from_color(tag).map(Cell::Block),
        }
    }

    pub fn is_filled(&self) -> bool {
        !matches!(self, Cell::Empty)
    }
}

/// Player intents accepted by a running game session
///
/// On the wire this is an object tagged by `kind`:
/// `{"kind":"moveLeft"}`, `{"kind":"rotate","clockwise":false}`.
/// A `rotate` without `clockwise` rotates clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GameAction {
    /// Move piece one cell left
    MoveLeft,
    /// Move piece one cell right
    MoveRight,
    /// Move piece one cell down, landing it when blocked
    MoveDown,
    /// Rotate piece 90°, trying wall kicks on collision
    Rotate {
        #[serde(default = "default_clockwise")]
        clockwise: bool,
    },
    /// Drop piece to the lowest free position and land it
    HardDrop,
}

fn default_clockwise() -> bool {
    true
}

impl GameAction {
    /// Parse action from its wire name
    ///
    /// `rotate` parses as a clockwise rotation; `rotateCcw` as counter-clockwise.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "moveleft" => Some(GameAction::MoveLeft),
            "moveright" => Some(GameAction::MoveRight),
            "movedown" => Some(GameAction::MoveDown),
            "rotate" | "rotatecw" => Some(GameAction::Rotate { clockwise: true }),
            "rotateccw" => Some(GameAction::Rotate { clockwise: false }),
            "harddrop" => Some(GameAction::HardDrop),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameAction::MoveLeft => "moveLeft",
            GameAction::MoveRight => "moveRight",
            GameAction::MoveDown => "moveDown",
            GameAction::Rotate { .. } => "rotate",
            GameAction::HardDrop => "hardDrop",
        }
    }
}
