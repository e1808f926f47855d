//! Terminal types shared between the session and the presentation layer.

use alacritty_terminal::grid::Dimensions;
use settings::constants::terminal::{DEFAULT_COLUMNS, DEFAULT_ROWS, MIN_COLUMNS, MIN_ROWS};

/// Terminal size in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TermSize {
    pub cols: u16,
    pub rows: u16,
}

impl Default for TermSize {
    fn default() -> Self {
        Self {
            cols: DEFAULT_COLUMNS,
            rows: DEFAULT_ROWS,
        }
    }
}

impl TermSize {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Same size, raised to the minimum grid if smaller.
    pub fn clamped(self) -> Self {
        Self {
            cols: self.cols.max(MIN_COLUMNS),
            rows: self.rows.max(MIN_ROWS),
        }
    }
}

impl Dimensions for TermSize {
    fn total_lines(&self) -> usize {
        self.rows as usize
    }

    fn screen_lines(&self) -> usize {
        self.rows as usize
    }

    fn columns(&self) -> usize {
        self.cols as usize
    }
}

/// Buffer state published after each processed batch of output.
///
/// Captured under the same lock that applied the batch, so listeners never see
/// a count older than the content they are asked to redraw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct BufferChange {
    /// Monotonic counter, bumped once per processed batch.
    pub generation: u64,
    pub history_line_count: usize,
    pub alternate_screen: bool,
}
