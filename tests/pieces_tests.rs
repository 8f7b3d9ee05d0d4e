//! Pieces tests - shapes, rotation with wall kicks and the 7-bag queue

use std::collections::HashSet;

use tetris_arena::core::pieces::{get_shape, try_rotate, Tetromino, WALL_KICKS};
use tetris_arena::core::{Board, PieceQueue};
use tetris_arena::types::{PieceKind, Rotation, SPAWN_POSITION};

const ROTATIONS: [Rotation; 4] = [
    Rotation::North,
    Rotation::East,
    Rotation::South,
    Rotation::West,
];

// ============== Shape Tests ==============

#[test]
fn test_every_shape_has_four_distinct_cells_around_anchor() {
    for kind in PieceKind::ALL {
        for rotation in ROTATIONS {
            let shape = get_shape(kind, rotation);
            let distinct: HashSet<_> = shape.iter().collect();
            assert_eq!(distinct.len(), 4, "{kind:?} {rotation:?}");
            assert!(shape.contains(&(0, 0)), "{kind:?} {rotation:?}");
        }
    }
}

#[test]
fn test_i_piece_shapes() {
    assert_eq!(
        get_shape(PieceKind::I, Rotation::North),
        [(0, 0), (0, -1), (0, 1), (0, 2)]
    );
    assert_eq!(
        get_shape(PieceKind::I, Rotation::East),
        [(-1, 0), (0, 0), (1, 0), (2, 0)]
    );
}

#[test]
fn test_o_piece_same_for_all_rotations() {
    let north = get_shape(PieceKind::O, Rotation::North);
    for rotation in ROTATIONS {
        assert_eq!(get_shape(PieceKind::O, rotation), north);
    }
}

#[test]
fn test_spawn_at_anchor() {
    let piece = Tetromino::new(PieceKind::T);
    assert_eq!((piece.x, piece.y), SPAWN_POSITION);
    assert_eq!(piece.rotation, Rotation::North);
}

// ============== Rotation Tests ==============

#[test]
fn test_four_rotations_return_to_start() {
    let start = Tetromino::at(PieceKind::L, 4, 10, Rotation::North);
    let mut piece = start;
    for _ in 0..4 {
        piece = piece.rotated(true);
    }
    assert_eq!(piece, start);
    assert_eq!(start.rotated(true).rotated(false), start);
}

#[test]
fn test_free_rotation_needs_no_kick() {
    let board = Board::new();
    let piece = Tetromino::at(PieceKind::T, 4, 10, Rotation::North);

    let rotated = try_rotate(&piece, true, |cells| board.collides(cells)).unwrap();
    assert_eq!(rotated.rotation, Rotation::East);
    assert_eq!((rotated.x, rotated.y), (4, 10));
}

#[test]
fn test_wall_kick_off_left_wall() {
    let board = Board::new();
    // Vertical I against the left wall turns horizontal into the wall.
    let piece = Tetromino::at(PieceKind::I, 0, 5, Rotation::North);

    let rotated = try_rotate(&piece, true, |cells| board.collides(cells)).unwrap();
    assert_eq!(rotated.rotation, Rotation::East);
    assert_eq!((rotated.x, rotated.y), (WALL_KICKS[0].0, 5 + WALL_KICKS[0].1));
    assert!(!board.collides(&rotated.cells()));
}

#[test]
fn test_blocked_rotation_is_rejected() {
    let piece = Tetromino::at(PieceKind::T, 4, 10, Rotation::North);
    assert_eq!(try_rotate(&piece, false, |_| true), None);
}

// ============== Queue Tests ==============

#[test]
fn test_bag_contains_each_kind_once() {
    let mut queue = PieceQueue::new(12345);
    for _ in 0..10 {
        let bag: HashSet<PieceKind> = (0..7).map(|_| queue.draw()).collect();
        assert_eq!(bag.len(), 7);
        assert_eq!(queue.remaining(), 0);
    }
}

#[test]
fn test_queue_is_deterministic_per_seed() {
    let a: Vec<PieceKind> = PieceQueue::new(7).take(21).collect();
    let b: Vec<PieceKind> = PieceQueue::new(7).take(21).collect();
    assert_eq!(a, b);
}
