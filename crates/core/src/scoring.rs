//! Scoring module - line clear table and combo bonus
//!
//! A drop that clears lines scores `score_for(lines) + combo_bonus(combo)`, where
//! `combo` counts consecutive clearing drops including this one. A drop that clears
//! nothing resets the combo.

use crate::types::{COMBO_BASE, LINE_SCORES};

/// Score calculation result for one drop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreResult {
    pub line_clear_score: u32,
    pub combo_bonus: u32,
    pub total: u32,
}

/// Line clear score
///
/// 0 for zero or negative input, 100/300/500/800 for 1-4 lines; anything above
/// four scores as four.
pub fn score_for(lines_cleared: i32) -> u32 {
    if lines_cleared <= 0 {
        return 0;
    }
    LINE_SCORES[(lines_cleared as usize).min(LINE_SCORES.len() - 1)]
}

/// Combo bonus: 0 up to a combo of 1, then 50 per additional step (unbounded)
pub fn combo_bonus(combo: i32) -> u32 {
    if combo <= 1 {
        return 0;
    }
    COMBO_BASE.saturating_mul((combo - 1) as u32)
}

/// Calculate the score for one drop
pub fn calculate_score(lines_cleared: usize, combo: u32) -> ScoreResult {
    let lines = i32::try_from(lines_cleared).unwrap_or(i32::MAX);
    let combo = i32::try_from(combo).unwrap_or(i32::MAX);

    let line_clear_score = score_for(lines);
    let combo_bonus = if line_clear_score > 0 {
        combo_bonus(combo)
    } else {
        0
    };

    ScoreResult {
        line_clear_score,
        combo_bonus,
        total: line_clear_score.saturating_add(combo_bonus),
    }
}
