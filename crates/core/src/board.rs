//! Board module - manages one player's grid
//!
//! The board is a 10x20 grid stored as a flat array for cache locality.
//! Coordinates: (x, y) where x ranges 0..9 (left to right), y ranges 0..19 (top to bottom).
//! Rows with y < 0 are the hidden spawn area above the board: they never collide and
//! nothing is ever written there.

use arrayvec::ArrayVec;

use crate::types::{Cell, BOARD_HEIGHT, BOARD_WIDTH};

/// Total number of cells on the board
const BOARD_SIZE: usize = (BOARD_WIDTH as usize) * (BOARD_HEIGHT as usize);

const WIDTH: usize = BOARD_WIDTH as usize;
const HEIGHT: usize = BOARD_HEIGHT as usize;

/// The game board - 10 columns x 20 rows using flat array storage
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    /// Flat array of cells, row-major order (y * WIDTH + x)
    cells: [Cell; BOARD_SIZE],
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Self {
            cells: [Cell::Empty; BOARD_SIZE],
        }
    }

    /// Calculate flat index from (x, y) coordinates
    #[inline(always)]
    fn index(x: i8, y: i8) -> Option<usize> {
        if x < 0 || x >= BOARD_WIDTH as i8 || y < 0 || y >= BOARD_HEIGHT as i8 {
            return None;
        }
        Some((y as usize) * WIDTH + (x as usize))
    }

    pub fn width(&self) -> u8 {
        BOARD_WIDTH
    }

    pub fn height(&self) -> u8 {
        BOARD_HEIGHT
    }

    /// Get cell at position (x, y)
    /// Returns None if out of bounds
    pub fn get(&self, x: i8, y: i8) -> Option<Cell> {
        Self::index(x, y).map(|idx| self.cells[idx])
    }

    /// Set cell at position (x, y)
    /// Returns false if out of bounds
    pub fn set(&mut self, x: i8, y: i8, cell: Cell) -> bool {
        match Self::index(x, y) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    /// Check if position is occupied (within bounds and filled)
    pub fn is_occupied(&self, x: i8, y: i8) -> bool {
        matches!(self.get(x, y), Some(cell) if cell.is_filled())
    }

    /// Collision test for a set of absolute cells
    ///
    /// A cell collides when it is left of column 0, right of the last column, below
    /// the last row, or on an occupied cell. Cells above row 0 only collide with the
    /// side walls.
    pub fn collides(&self, cells: &[(i8, i8)]) -> bool {
        cells.iter().any(|&(x, y)| {
            if x < 0 || x >= BOARD_WIDTH as i8 || y >= BOARD_HEIGHT as i8 {
                return true;
            }
            y >= 0 && self.is_occupied(x, y)
        })
    }

    /// Write `cell` into every in-bounds position of `cells`
    ///
    /// Off-board positions are dropped silently.
    pub fn land(&mut self, cells: &[(i8, i8)], cell: Cell) {
        for &(x, y) in cells {
            self.set(x, y, cell);
        }
    }

    /// Check if a row is completely filled
    pub fn is_row_full(&self, y: usize) -> bool {
        if y >= HEIGHT {
            return false;
        }
        let start = y * WIDTH;
        self.cells[start..start + WIDTH]
            .iter()
            .all(|cell| cell.is_filled())
    }

    /// Clear all full rows and return the row indices that were cleared (top to bottom)
    ///
    /// Remaining rows keep their relative order and settle at the bottom; the rows
    /// freed at the top are zero-filled. Two-pointer compaction, no allocation.
    pub fn clear_full_rows(&mut self) -> ArrayVec<usize, HEIGHT> {
        let mut cleared_rows = ArrayVec::new();
        let mut write_y = HEIGHT;

        // Scan from bottom to top
        for read_y in (0..HEIGHT).rev() {
            if self.is_row_full(read_y) {
                cleared_rows.push(read_y);
            } else {
                write_y -= 1;
                if write_y != read_y {
                    let src_start = read_y * WIDTH;
                    self.cells
                        .copy_within(src_start..src_start + WIDTH, write_y * WIDTH);
                }
            }
        }

        for cell in &mut self.cells[..write_y * WIDTH] {
            *cell = Cell::Empty;
        }

        cleared_rows.reverse();
        cleared_rows
    }

    /// Clear all full rows, returning how many were removed
    pub fn clear_lines(&mut self) -> usize {
        self.clear_full_rows().len()
    }

    /// Push the stack up by `rows.len()` and write `rows` into the bottom rows
    ///
    /// The top `rows.len()` rows fall off the board. Each row is copied verbatim;
    /// a row shorter than the board is padded with empty cells, a longer one truncated.
    pub fn apply_penalty_rows(&mut self, rows: &[Vec<Cell>]) {
        let n = rows.len().min(HEIGHT);
        if n == 0 {
            return;
        }

        self.cells.copy_within(n * WIDTH.., 0);

        for (i, row) in rows[rows.len() - n..].iter().enumerate() {
            let start = (HEIGHT - n + i) * WIDTH;
            for x in 0..WIDTH {
                self.cells[start + x] = row.get(x).copied().unwrap_or_default();
            }
        }
    }

    /// Get a reference to the internal cells array
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// One row as a slice
    pub fn row(&self, y: usize) -> &[Cell] {
        let start = y.min(HEIGHT - 1) * WIDTH;
        &self.cells[start..start + WIDTH]
    }

    /// Number of filled cells
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_filled()).count()
    }

    /// Height of each column's stack (0 for an empty column)
    pub fn column_heights(&self) -> [u8; WIDTH] {
        let mut heights = [0u8; WIDTH];
        for (x, h) in heights.iter_mut().enumerate() {
            if let Some(top) = (0..HEIGHT).find(|&y| self.cells[y * WIDTH + x].is_filled()) {
                *h = (HEIGHT - top) as u8;
            }
        }
        heights
    }

    /// Write the board as integer tags
    pub fn write_u8_grid(&self, out: &mut [[u8; WIDTH]; HEIGHT]) {
        for (y, row) in out.iter_mut().enumerate() {
            for (x, tag) in row.iter_mut().enumerate() {
                *tag = self.cells[y * WIDTH + x].tag();
            }
        }
    }

    /// Board as integer tags
    pub fn to_u8_grid(&self) -> [[u8; WIDTH]; HEIGHT] {
        let mut out = [[0u8; WIDTH]; HEIGHT];
        self.write_u8_grid(&mut out);
        out
    }

    /// Build a board from integer tags; unknown tags become empty cells
    pub fn from_u8_grid(grid: &[[u8; WIDTH]; HEIGHT]) -> Self {
        let mut board = Self::new();
        for (y, row) in grid.iter().enumerate() {
            for (x, &tag) in row.iter().enumerate() {
                board.cells[y * WIDTH + x] = Cell::from_tag(tag).unwrap_or_default();
            }
        }
        board
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
