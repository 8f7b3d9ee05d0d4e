//! Penalty module - attack target selection and penalty row generation
//!
//! When a landing clears two or more lines, one opponent receives penalty rows.
//! Opponents with a score close to the attacker's are much more likely to be picked:
//! the weight is `1000 / (|score difference| + 10)`.

use std::collections::HashMap;

use rand::Rng;

use crate::player::{PlayerGameState, PlayerId};
use crate::types::{Cell, PENALTY_WEIGHT, PENALTY_WEIGHT_BIAS};

/// Selection weight of a target relative to the attacker
pub fn target_weight(source_score: u32, target_score: u32) -> f64 {
    let diff = (i64::from(source_score) - i64::from(target_score)).unsigned_abs();
    PENALTY_WEIGHT / (diff as f64 + PENALTY_WEIGHT_BIAS)
}

/// Pick the player who receives an attack from `source`
///
/// Eligible targets are `active_players` without `source`. Selection is a
/// cumulative-weight roulette over [`target_weight`]. Returns `None` when nobody
/// is eligible.
pub fn select_target<R: Rng + ?Sized>(
    source: &str,
    active_players: &[PlayerId],
    players: &HashMap<PlayerId, PlayerGameState>,
    rng: &mut R,
) -> Option<PlayerId> {
    let source_score = players.get(source).map_or(0, |p| p.score);

    let weighted: Vec<(&PlayerId, f64)> = active_players
        .iter()
        .filter(|id| id.as_str() != source)
        .map(|id| {
            let score = players.get(id).map_or(0, |p| p.score);
            (id, target_weight(source_score, score))
        })
        .collect();

    let (fallback, _) = weighted.first()?;
    let total: f64 = weighted.iter().map(|(_, w)| w).sum();
    let roll = rng.random::<f64>() * total;

    let mut cumulative = 0.0;
    for (id, weight) in &weighted {
        cumulative += weight;
        if cumulative >= roll {
            return Some((*id).clone());
        }
    }

    // Floating point drift can leave the roll a hair above the final sum.
    Some((*fallback).clone())
}

/// Generate `count` penalty rows of `width` cells
///
/// Every row is solid penalty blocks except one empty hole, placed uniformly at
/// random and independently per row.
pub fn generate_penalty_rows<R: Rng + ?Sized>(
    count: usize,
    width: usize,
    rng: &mut R,
) -> Vec<Vec<Cell>> {
    if width == 0 {
        return vec![Vec::new(); count];
    }

    (0..count)
        .map(|_| {
            let mut row = vec![Cell::Penalty; width];
            row[rng.random_range(0..width)] = Cell::Empty;
            row
        })
        .collect()
}
