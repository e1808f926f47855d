//! `alacritty_terminal` adapter for the engine interface.
//!
//! Groups grid cells into same-style runs and maps alacritty colors into
//! [`TermColor`]s. Palette entries the program overrode (OSC 4) come out as
//! true colors; everything else stays indexed so the view's palette applies.

use crate::buffer::{
    Attributes, Blink, BufferView, CursorInfo, CursorShape, EngineError, StyledRun, TermColor,
    TerminalBuffer, TextStyle, CONTINUATION,
};
use alacritty_terminal::event::EventListener;
use alacritty_terminal::grid::Dimensions;
use alacritty_terminal::index::{Column, Line};
use alacritty_terminal::term::cell::{Cell, Flags as CellFlags};
use alacritty_terminal::term::color::Colors as TermColors;
use alacritty_terminal::term::{Term, TermMode};
use alacritty_terminal::vte::ansi::{Color, CursorShape as AnsiCursorShape, NamedColor, Rgb};
use parking_lot::{Mutex, MutexGuard};
use settings::constants::timing::LOCK_TIMEOUT;
use std::sync::Arc;

/// Terminal state shared between the VT thread and readers.
pub type SharedTerm<L> = Arc<Mutex<Term<L>>>;

/// [`TerminalBuffer`] over a shared alacritty terminal.
pub struct AlacrittyBuffer<L: EventListener> {
    term: SharedTerm<L>,
}

impl<L: EventListener> AlacrittyBuffer<L> {
    pub fn new(term: SharedTerm<L>) -> Self {
        Self { term }
    }

    pub fn term(&self) -> &SharedTerm<L> {
        &self.term
    }
}

impl<L: EventListener> Clone for AlacrittyBuffer<L> {
    fn clone(&self) -> Self {
        Self {
            term: self.term.clone(),
        }
    }
}

impl<L> TerminalBuffer for AlacrittyBuffer<L>
where
    L: EventListener + Send,
{
    type View<'a>
        = AlacrittyView<'a, L>
    where
        Self: 'a;

    fn lock(&self) -> Result<Self::View<'_>, EngineError> {
        self.term
            .try_lock_for(LOCK_TIMEOUT)
            .map(|term| AlacrittyView { term })
            .ok_or(EngineError::LockTimeout(LOCK_TIMEOUT))
    }
}

/// Locked view of an alacritty terminal. Unlocks on drop.
pub struct AlacrittyView<'a, L: EventListener> {
    term: MutexGuard<'a, Term<L>>,
}

impl<L: EventListener> BufferView for AlacrittyView<'_, L> {
    fn width(&self) -> usize {
        self.term.columns()
    }

    fn height(&self) -> usize {
        self.term.screen_lines()
    }

    fn history_line_count(&self) -> usize {
        self.term.grid().history_size()
    }

    fn is_using_alternate_screen(&self) -> bool {
        self.term.mode().contains(TermMode::ALT_SCREEN)
    }

    fn cursor(&self) -> CursorInfo {
        let point = self.term.grid().cursor.point;
        let style = self.term.cursor_style();
        let blink = if style.blinking {
            Blink::Blinking
        } else {
            Blink::Steady
        };
        let shape = match style.shape {
            AnsiCursorShape::Underline => CursorShape::Underline(blink),
            AnsiCursorShape::Beam => CursorShape::VerticalBar(blink),
            AnsiCursorShape::Block | AnsiCursorShape::HollowBlock | AnsiCursorShape::Hidden => {
                CursorShape::Block(blink)
            }
        };
        CursorInfo {
            row: point.line.0.max(0) as usize,
            column: point.column.0,
            visible: self.term.mode().contains(TermMode::SHOW_CURSOR)
                && style.shape != AnsiCursorShape::Hidden,
            shape,
        }
    }

    fn for_each_styled_run(
        &self,
        scroll_origin: i32,
        max_lines: usize,
        visitor: &mut dyn FnMut(StyledRun<'_>),
    ) {
        let grid = self.term.grid();
        let colors = self.term.colors();
        let columns = grid.columns();
        let top = -(grid.history_size() as i32);
        let bottom = grid.screen_lines() as i32;

        let mut text: Vec<char> = Vec::with_capacity(columns);
        for window_row in 0..max_lines {
            let line = scroll_origin + window_row as i32;
            if line < top {
                continue;
            }
            if line >= bottom {
                break;
            }

            let row = &grid[Line(line)];
            let mut run_start = 0;
            let mut run_style: Option<TextStyle> = None;
            text.clear();

            for col in 0..columns {
                let cell = &row[Column(col)];
                let style = text_style(cell, colors);
                if let Some(current) = run_style.filter(|current| *current != style) {
                    visitor(StyledRun {
                        column: run_start,
                        row: window_row,
                        style: &current,
                        text: &text,
                    });
                    text.clear();
                    run_start = col;
                }
                run_style = Some(style);
                text.push(cell_char(cell));
            }

            if let Some(current) = run_style {
                visitor(StyledRun {
                    column: run_start,
                    row: window_row,
                    style: &current,
                    text: &text,
                });
            }
        }
    }
}

fn cell_char(cell: &Cell) -> char {
    if cell.flags.contains(CellFlags::WIDE_CHAR_SPACER) {
        CONTINUATION
    } else if cell.flags.contains(CellFlags::LEADING_WIDE_CHAR_SPACER) {
        // Padding left at the end of a line when a wide glyph wrapped
        ' '
    } else {
        cell.c
    }
}

fn text_style(cell: &Cell, colors: &TermColors) -> TextStyle {
    TextStyle {
        foreground: map_color(cell.fg, colors),
        background: map_color(cell.bg, colors),
        attrs: map_flags(cell.flags),
    }
}

fn map_flags(flags: CellFlags) -> Attributes {
    let mut attrs = Attributes::empty();
    attrs.set(Attributes::BOLD, flags.contains(CellFlags::BOLD));
    attrs.set(Attributes::ITALIC, flags.contains(CellFlags::ITALIC));
    attrs.set(
        Attributes::UNDERLINE,
        flags.intersects(CellFlags::ALL_UNDERLINES),
    );
    attrs.set(Attributes::DIM, flags.contains(CellFlags::DIM));
    attrs.set(Attributes::HIDDEN, flags.contains(CellFlags::HIDDEN));
    attrs.set(Attributes::INVERSE, flags.contains(CellFlags::INVERSE));
    attrs
}

/// Map an alacritty color. `None` means "use the default style".
fn map_color(color: Color, colors: &TermColors) -> Option<TermColor> {
    match color {
        Color::Spec(rgb) => Some(TermColor::Rgb(convert_rgb(rgb))),
        Color::Indexed(idx) => Some(indexed(idx, colors)),
        Color::Named(named) => {
            let value = named as usize;
            if value < 16 {
                Some(indexed(value as u8, colors))
            } else if let Some(base) = dim_base_index(named) {
                Some(indexed(base, colors))
            } else {
                // Foreground, Background, Cursor and friends: only concrete
                // when the program set them explicitly (OSC 10/11/12).
                colors[named].map(|rgb| TermColor::Rgb(convert_rgb(rgb)))
            }
        }
    }
}

fn indexed(idx: u8, colors: &TermColors) -> TermColor {
    match colors[idx as usize] {
        Some(rgb) => TermColor::Rgb(convert_rgb(rgb)),
        None => TermColor::Indexed(idx),
    }
}

fn dim_base_index(named: NamedColor) -> Option<u8> {
    let base = match named {
        NamedColor::DimBlack => 0,
        NamedColor::DimRed => 1,
        NamedColor::DimGreen => 2,
        NamedColor::DimYellow => 3,
        NamedColor::DimBlue => 4,
        NamedColor::DimMagenta => 5,
        NamedColor::DimCyan => 6,
        NamedColor::DimWhite => 7,
        _ => return None,
    };
    Some(base)
}

fn convert_rgb(rgb: Rgb) -> theme::Rgb {
    theme::Rgb::new(rgb.r, rgb.g, rgb.b)
}
