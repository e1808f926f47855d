//! Render snapshot builder.
//!
//! Projects a scrolled window of the terminal buffer into a fixed-size grid of
//! fully resolved cells. The buffer lock is held for exactly one walk over the
//! window; the grid is allocated once and handed to the drawing layer as an
//! immutable value.

use crate::colors::{resolve_style, DefaultColors};
use crate::scroll::clamp_scroll_origin;
use bitflags::bitflags;
use terminal::{
    Attributes, BufferView, CursorInfo, EngineError, StyleState, StyledRun, TerminalBuffer,
    CONTINUATION, NUL_FILLER,
};
use theme::{Palette, Rgb};
use unicode_width::UnicodeWidthChar;

bitflags! {
    /// Attributes carried into the drawing layer.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct CellAttrs: u8 {
        const BOLD = 1 << 0;
        const ITALIC = 1 << 1;
        const UNDERLINE = 1 << 2;
        const DIM = 1 << 3;
        const HIDDEN = 1 << 4;
    }
}

impl From<Attributes> for CellAttrs {
    fn from(attrs: Attributes) -> Self {
        let mut cell = CellAttrs::empty();
        cell.set(CellAttrs::BOLD, attrs.contains(Attributes::BOLD));
        cell.set(CellAttrs::ITALIC, attrs.contains(Attributes::ITALIC));
        cell.set(CellAttrs::UNDERLINE, attrs.contains(Attributes::UNDERLINE));
        cell.set(CellAttrs::DIM, attrs.contains(Attributes::DIM));
        cell.set(CellAttrs::HIDDEN, attrs.contains(Attributes::HIDDEN));
        cell
    }
}

/// One fully resolved grid position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    character: char,
    foreground: Rgb,
    background: Rgb,
    attrs: CellAttrs,
    double_width: bool,
}

impl Cell {
    /// Space painted in the default colors.
    pub fn blank(defaults: &DefaultColors) -> Self {
        Self {
            character: ' ',
            foreground: defaults.foreground,
            background: defaults.background,
            attrs: CellAttrs::empty(),
            double_width: false,
        }
    }

    /// The glyph, or [`CONTINUATION`] for the right half of a wide glyph.
    pub fn character(&self) -> char {
        self.character
    }

    pub fn foreground(&self) -> Rgb {
        self.foreground
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    pub fn attrs(&self) -> CellAttrs {
        self.attrs
    }

    pub fn is_bold(&self) -> bool {
        self.attrs.contains(CellAttrs::BOLD)
    }

    pub fn is_italic(&self) -> bool {
        self.attrs.contains(CellAttrs::ITALIC)
    }

    pub fn is_underline(&self) -> bool {
        self.attrs.contains(CellAttrs::UNDERLINE)
    }

    pub fn is_dim(&self) -> bool {
        self.attrs.contains(CellAttrs::DIM)
    }

    pub fn is_hidden(&self) -> bool {
        self.attrs.contains(CellAttrs::HIDDEN)
    }

    /// Glyph occupies this cell and the next one.
    pub fn is_double_width(&self) -> bool {
        self.double_width
    }

    pub fn is_continuation(&self) -> bool {
        self.character == CONTINUATION
    }
}

/// Immutable grid of resolved cells for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSnapshot {
    columns: usize,
    rows: usize,
    default_foreground: Rgb,
    default_background: Rgb,
    cells: Vec<Cell>,
    cursor: Option<CursorInfo>,
    scroll_origin: i32,
}

impl RenderSnapshot {
    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn default_foreground(&self) -> Rgb {
        self.default_foreground
    }

    pub fn default_background(&self) -> Rgb {
        self.default_background
    }

    /// Cell at `(row, column)`, row 0 = top of the view.
    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        if row >= self.rows || column >= self.columns {
            return None;
        }
        self.cells.get(row * self.columns + column)
    }

    /// Cells of one row, or `None` past the bottom of the grid.
    pub fn row(&self, row: usize) -> Option<&[Cell]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.columns;
        self.cells.get(start..start + self.columns)
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks_exact(self.columns)
    }

    /// Row text with continuation placeholders dropped and trailing blanks
    /// trimmed. Empty for rows past the bottom of the grid.
    pub fn row_text(&self, row: usize) -> String {
        let Some(cells) = self.row(row) else {
            return String::new();
        };
        let text: String = cells
            .iter()
            .filter(|cell| !cell.is_continuation())
            .map(Cell::character)
            .collect();
        text.trim_end().to_string()
    }

    /// Cursor to draw, if it is on screen and the view is at the live position.
    pub fn cursor(&self) -> Option<CursorInfo> {
        self.cursor
    }

    /// The clamped origin this snapshot was built with.
    pub fn scroll_origin(&self) -> i32 {
        self.scroll_origin
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("invalid snapshot size {columns}x{rows}")]
    InvalidDimensions { columns: usize, rows: usize },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Build a snapshot of `rows` lines starting at `scroll_origin`.
///
/// `scroll_origin` is clamped into the buffer's history range. Rows the buffer
/// does not deliver stay blank in the default colors.
pub fn build_snapshot<B: TerminalBuffer>(
    buffer: &B,
    style_state: &dyn StyleState,
    columns: usize,
    rows: usize,
    scroll_origin: i32,
    palette: &Palette,
) -> Result<RenderSnapshot, RenderError> {
    if columns == 0 || rows == 0 {
        return Err(RenderError::InvalidDimensions { columns, rows });
    }

    let defaults = DefaultColors::resolve(style_state, palette);
    let mut cells = vec![Cell::blank(&defaults); columns * rows];

    let view = buffer.lock()?;
    let origin = clamp_scroll_origin(scroll_origin, view.history_line_count());
    view.for_each_styled_run(origin, rows, &mut |run| {
        write_run(&mut cells, columns, rows, &run, &defaults, palette);
    });
    let cursor = if origin == 0 {
        visible_cursor(view.cursor(), &cells, columns, rows)
    } else {
        None
    };
    drop(view);

    Ok(RenderSnapshot {
        columns,
        rows,
        default_foreground: defaults.foreground,
        default_background: defaults.background,
        cells,
        cursor,
        scroll_origin: origin,
    })
}

fn write_run(
    cells: &mut [Cell],
    columns: usize,
    rows: usize,
    run: &StyledRun<'_>,
    defaults: &DefaultColors,
    palette: &Palette,
) {
    if run.row >= rows {
        return;
    }
    let resolved = resolve_style(run.style, defaults, palette);
    let attrs = CellAttrs::from(run.style.attrs);
    let hidden = attrs.contains(CellAttrs::HIDDEN);
    let row_start = run.row * columns;

    for (i, &raw) in run.text.iter().enumerate() {
        let column = run.column + i;
        if column >= columns {
            break;
        }
        let followed_by_placeholder = run.text.get(i + 1) == Some(&CONTINUATION);
        let double_width = raw != CONTINUATION
            && raw.width() == Some(2)
            && (followed_by_placeholder || column == columns - 1);
        let character = match raw {
            _ if hidden => ' ',
            NUL_FILLER => ' ',
            other => other,
        };
        cells[row_start + column] = Cell {
            character,
            foreground: resolved.foreground,
            background: resolved.background,
            attrs,
            double_width,
        };
    }
}

fn visible_cursor(
    cursor: CursorInfo,
    cells: &[Cell],
    columns: usize,
    rows: usize,
) -> Option<CursorInfo> {
    if !cursor.visible || cursor.row >= rows || cursor.column >= columns {
        return None;
    }
    // A cursor on the right half of a wide glyph is drawn over the glyph
    let on_placeholder = cells[cursor.row * columns + cursor.column].is_continuation();
    if on_placeholder && cursor.column > 0 {
        return Some(CursorInfo {
            column: cursor.column - 1,
            ..cursor
        });
    }
    Some(cursor)
}
