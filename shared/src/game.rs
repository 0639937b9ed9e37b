//! Pure Connect Four board rules shared by the server and its clients

use serde::{Deserialize, Serialize};

pub const ROWS: usize = 6;
pub const COLS: usize = 7;

/// The two seat identities, also used as piece colors on the board.
///
/// Red always moves first. Serializes as the string tokens `"Red"` and
/// `"Yellow"` on the wire and in persisted records.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Yellow,
}

impl Color {
    /// Returns the opposing color.
    pub fn other(self) -> Self {
        match self {
            Color::Red => Color::Yellow,
            Color::Yellow => Color::Red,
        }
    }
}

/// A 6x7 Connect Four grid. Row 0 is the top row.
///
/// The board enforces gravity: pieces enter through [`Board::drop_piece`]
/// and always come to rest on the lowest empty cell of their column, so a
/// cell is never occupied while a cell below it in the same column is empty.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct Board {
    // Serializes as the bare grid: 6 rows of 7 nullable color tokens
    cells: [[Option<Color>; COLS]; ROWS],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self {
            cells: [[None; COLS]; ROWS],
        }
    }

    /// Returns the piece at `(row, col)`, or `None` for an empty or
    /// out-of-range cell.
    pub fn cell(&self, row: usize, col: usize) -> Option<Color> {
        self.cells.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    /// Returns whether `col` can still accept a piece.
    ///
    /// A column is open while its topmost cell is empty. An out-of-range
    /// column is reported as closed rather than panicking, so bad client
    /// input degrades to an ordinary illegal move.
    pub fn column_is_open(&self, col: usize) -> bool {
        col < COLS && self.cells[0][col].is_none()
    }

    /// Drops a piece into `col`, letting it fall to the lowest empty cell.
    ///
    /// Returns the row the piece landed in, or `None` without mutating the
    /// board when the column is full or out of range.
    pub fn drop_piece(&mut self, col: usize, color: Color) -> Option<usize> {
        if !self.column_is_open(col) {
            return None;
        }

        for row in (0..ROWS).rev() {
            if self.cells[row][col].is_none() {
                self.cells[row][col] = Some(color);
                return Some(row);
            }
        }

        None
    }

    /// Checks whether the piece at `(row, col)` completes a run of four.
    ///
    /// Only the four axes through the given cell are examined: any winning
    /// run must pass through the most recently placed piece, since no other
    /// cell changed. For each axis the count extends from the cell in both
    /// directions; the grid edge terminates a direction without error.
    pub fn has_run_of_four(&self, row: usize, col: usize, color: Color) -> bool {
        // (col step, row step) for horizontal, vertical and both diagonals
        const AXES: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

        AXES.iter()
            .any(|&(dx, dy)| self.count_axis(row, col, color, dx, dy) >= 4)
    }

    /// Counts contiguous `color` cells along one axis through `(row, col)`,
    /// including the cell itself exactly once.
    fn count_axis(&self, row: usize, col: usize, color: Color, dx: isize, dy: isize) -> usize {
        let mut count = 1;
        count += self.count_direction(row, col, color, dx, dy);
        count += self.count_direction(row, col, color, -dx, -dy);
        count
    }

    fn count_direction(&self, row: usize, col: usize, color: Color, dx: isize, dy: isize) -> usize {
        let mut count = 0;

        for step in 1..4 {
            let r = row as isize + step * dy;
            let c = col as isize + step * dx;

            if r < 0 || r >= ROWS as isize || c < 0 || c >= COLS as isize {
                break;
            }

            if self.cells[r as usize][c as usize] == Some(color) {
                count += 1;
            } else {
                break;
            }
        }

        count
    }
}
