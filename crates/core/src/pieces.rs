//! Pieces module - tetromino shapes, movement and wall kicks
//!
//! Shapes are stored as four offsets relative to the piece anchor. Offsets may be
//! negative: a freshly spawned piece can poke above row 0, which the board treats
//! as free space.

use tetris_arena_types::{PieceKind, Rotation, SPAWN_POSITION};

/// Offset of a single mino relative to the piece anchor
pub type MinoOffset = (i8, i8);

/// Shape of a piece - 4 mino offsets from the anchor
pub type PieceShape = [MinoOffset; 4];

/// Wall kick offsets tried, in order, when a rotation collides
pub const WALL_KICKS: [(i8, i8); 5] = [(1, 0), (-1, 0), (0, -1), (2, 0), (-2, 0)];

/// Get the shape (mino offsets) for a piece kind and rotation
pub fn get_shape(kind: PieceKind, rotation: Rotation) -> PieceShape {
    match kind {
        PieceKind::I => get_i_shape(rotation),
        PieceKind::J => get_j_shape(rotation),
        PieceKind::L => get_l_shape(rotation),
        PieceKind::O => get_o_shape(rotation),
        PieceKind::S => get_s_shape(rotation),
        PieceKind::T => get_t_shape(rotation),
        PieceKind::Z => get_z_shape(rotation),
    }
}

/// I piece shapes (vertical on even rotations, horizontal on odd)
fn get_i_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North | Rotation::South => [(0, 0), (0, -1), (0, 1), (0, 2)],
        Rotation::East | Rotation::West => [(-1, 0), (0, 0), (1, 0), (2, 0)],
    }
}

fn get_j_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(0, 0), (-1, 0), (1, 0), (-1, -1)],
        Rotation::East => [(0, 0), (0, -1), (0, 1), (1, -1)],
        Rotation::South => [(0, 0), (-1, 0), (1, 0), (1, 1)],
        Rotation::West => [(0, 0), (0, -1), (0, 1), (-1, 1)],
    }
}

fn get_l_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(0, 0), (-1, 0), (1, 0), (1, -1)],
        Rotation::East => [(0, 0), (0, -1), (0, 1), (1, 1)],
        Rotation::South => [(0, 0), (-1, 0), (1, 0), (-1, 1)],
        Rotation::West => [(0, 0), (0, -1), (0, 1), (-1, -1)],
    }
}

/// O piece shapes (same for all rotations)
fn get_o_shape(_rotation: Rotation) -> PieceShape {
    [(0, 0), (1, 0), (0, 1), (1, 1)]
}

fn get_s_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(0, 0), (-1, 0), (0, -1), (1, -1)],
        Rotation::East => [(0, 0), (0, -1), (1, 0), (1, 1)],
        Rotation::South => [(0, 0), (1, 0), (0, 1), (-1, 1)],
        Rotation::West => [(0, 0), (0, 1), (-1, 0), (-1, -1)],
    }
}

fn get_t_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(0, 0), (-1, 0), (1, 0), (0, -1)],
        Rotation::East => [(0, 0), (0, -1), (0, 1), (1, 0)],
        Rotation::South => [(0, 0), (-1, 0), (1, 0), (0, 1)],
        Rotation::West => [(0, 0), (0, -1), (0, 1), (-1, 0)],
    }
}

fn get_z_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(0, 0), (1, 0), (0, -1), (-1, -1)],
        Rotation::East => [(0, 0), (0, 1), (1, 0), (1, -1)],
        Rotation::South => [(0, 0), (-1, 0), (0, 1), (1, 1)],
        Rotation::West => [(0, 0), (0, -1), (-1, 0), (-1, 1)],
    }
}

/// A falling piece: kind, anchor position and rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tetromino {
    pub kind: PieceKind,
    pub rotation: Rotation,
    pub x: i8,
    pub y: i8,
}

impl Tetromino {
    /// Create a new tetromino at the spawn anchor
    pub fn new(kind: PieceKind) -> Self {
        Self::at(kind, SPAWN_POSITION.0, SPAWN_POSITION.1, Rotation::North)
    }

    pub fn at(kind: PieceKind, x: i8, y: i8, rotation: Rotation) -> Self {
        Self {
            kind,
            rotation,
            x,
            y,
        }
    }

    /// Get the shape (mino offsets) for current rotation
    pub fn shape(&self) -> PieceShape {
        get_shape(self.kind, self.rotation)
    }

    /// Absolute board coordinates of the four minos
    pub fn cells(&self) -> [(i8, i8); 4] {
        self.shape().map(|(dx, dy)| (self.x + dx, self.y + dy))
    }

    /// Copy of this piece translated by (dx, dy)
    pub fn moved(&self, dx: i8, dy: i8) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Copy of this piece rotated one step; collision is not checked
    pub fn rotated(&self, clockwise: bool) -> Self {
        let rotation = if clockwise {
            self.rotation.rotate_cw()
        } else {
            self.rotation.rotate_ccw()
        };
        Self { rotation, ..*self }
    }
}

/// Try to rotate a piece, falling back to wall kicks
///
/// The unkicked rotation is tried first, then each offset of [`WALL_KICKS`] in order.
/// Returns the first placement for which `collides` is false, or `None` when every
/// candidate collides (the caller keeps the original piece).
pub fn try_rotate(
    piece: &Tetromino,
    clockwise: bool,
    collides: impl Fn(&[(i8, i8); 4]) -> bool,
) -> Option<Tetromino> {
    let rotated = piece.rotated(clockwise);
    if !collides(&rotated.cells()) {
        return Some(rotated);
    }

    WALL_KICKS
        .iter()
        .map(|&(dx, dy)| rotated.moved(dx, dy))
        .find(|candidate| !collides(&candidate.cells()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_anchor() {
        let piece = Tetromino::new(PieceKind::T);
        assert_eq!((piece.x, piece.y), (4, 0));
        assert_eq!(piece.rotation, Rotation::North);
        assert_eq!(piece.cells(), [(4, 0), (3, 0), (5, 0), (4, -1)]);
    }

    #[test]
    fn test_every_shape_has_four_distinct_minos() {
        for kind in PieceKind::ALL {
            for r in 0..4 {
                let shape = get_shape(kind, Rotation::from_index(r));
                for i in 0..4 {
                    for j in (i + 1)..4 {
                        assert_ne!(shape[i], shape[j], "{:?} rotation {}", kind, r);
                    }
                }
            }
        }
    }

    #[test]
    fn test_rotation_index_math() {
        let piece = Tetromino::new(PieceKind::J);
        assert_eq!(piece.rotated(true).rotation.index(), 1);
        assert_eq!(piece.rotated(false).rotation.index(), 3);
        assert_eq!(piece.rotated(true).rotated(false), piece);
    }

    #[test]
    fn test_rotate_without_collision_keeps_anchor() {
        let piece = Tetromino::at(PieceKind::T, 4, 10, Rotation::North);
        let rotated = try_rotate(&piece, true, |_| false).unwrap();
        assert_eq!(rotated.rotation, Rotation::East);
        assert_eq!((rotated.x, rotated.y), (4, 10));
    }

    #[test]
    fn test_kick_order_is_fixed() {
        // Only the (-1, 0) kick is accepted: the first kick tried must be rejected.
        let piece = Tetromino::at(PieceKind::T, 4, 10, Rotation::North);
        let target = piece.rotated(true).moved(-1, 0).cells();
        let rotated = try_rotate(&piece, true, |cells| *cells != target).unwrap();
        assert_eq!((rotated.x, rotated.y), (3, 10));

        // When several kicks would fit, the earliest in the list wins.
        let right = piece.rotated(true).moved(1, 0).cells();
        let up = piece.rotated(true).moved(0, -1).cells();
        let rotated =
            try_rotate(&piece, true, |cells| *cells != right && *cells != up).unwrap();
        assert_eq!((rotated.x, rotated.y), (5, 10));
    }

    #[test]
    fn test_rotation_rejected_when_all_kicks_collide() {
        let piece = Tetromino::at(PieceKind::L, 4, 10, Rotation::North);
        assert_eq!(try_rotate(&piece, false, |_| true), None);
    }
}
