//! RNG module - 7-bag random piece generation
//!
//! Each bag contains one of each piece (I, J, L, O, S, T, Z), shuffled with
//! Fisher-Yates. Pieces are drawn from the bag until it is empty, then a fresh bag
//! is shuffled. Every 7 draws starting at a refill therefore contain each kind once.

use arrayvec::ArrayVec;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::types::PieceKind;

/// 7-bag piece generator, one per player
#[derive(Debug, Clone)]
pub struct PieceQueue {
    /// Pieces left in the current bag; draws pop from the end
    bag: ArrayVec<PieceKind, 7>,
    rng: StdRng,
}

impl PieceQueue {
    /// Create a new piece queue with the given seed
    pub fn new(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Create a piece queue seeded from the operating system
    pub fn from_os_rng() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            bag: ArrayVec::new(),
            rng,
        }
    }

    /// Generate a new shuffled bag
    fn refill_bag(&mut self) {
        self.bag.clear();
        self.bag.extend(PieceKind::ALL);
        self.bag.shuffle(&mut self.rng);
    }

    /// Draw the next piece, refilling the bag when it is empty
    pub fn draw(&mut self) -> PieceKind {
        if self.bag.is_empty() {
            self.refill_bag();
        }

        match self.bag.pop() {
            Some(piece) => piece,
            // Unreachable after a refill; keep the queue total anyway.
            None => PieceKind::I,
        }
    }

    /// Pieces left before the next refill
    pub fn remaining(&self) -> usize {
        self.bag.len()
    }
}

impl Default for PieceQueue {
    fn default() -> Self {
        Self::from_os_rng()
    }
}

impl Iterator for PieceQueue {
    type Item = PieceKind;

    fn next(&mut self) -> Option<PieceKind> {
        Some(self.draw())
    }
}
