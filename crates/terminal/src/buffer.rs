//! Engine-facing interface consumed by the presentation layer.
//!
//! The VT engine owns the buffer. The presentation layer only reads it,
//! through a lock guard that stays held for one whole snapshot walk.

use bitflags::bitflags;
use parking_lot::RwLock;
use std::time::Duration;
use theme::Rgb;

/// Character stored in the cell to the right of a double-width glyph.
pub const CONTINUATION: char = '\u{E000}';

/// Character the engine uses for never-written cells.
pub const NUL_FILLER: char = '\0';

/// Faults surfaced by the terminal engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("timed out after {0:?} waiting for the terminal buffer lock")]
    LockTimeout(Duration),
    #[error("default text style is not available")]
    StyleUnavailable,
}

/// A color as the engine stores it, before palette resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TermColor {
    Indexed(u8),
    Rgb(Rgb),
}

bitflags! {
    /// Text attributes of a styled run.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Attributes: u8 {
        const BOLD = 1 << 0;
        const ITALIC = 1 << 1;
        const UNDERLINE = 1 << 2;
        const DIM = 1 << 3;
        const HIDDEN = 1 << 4;
        const INVERSE = 1 << 5;
    }
}

/// Style shared by every character of a run. `None` channels use the
/// buffer's default style.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct TextStyle {
    pub foreground: Option<TermColor>,
    pub background: Option<TermColor>,
    pub attrs: Attributes,
}

impl TextStyle {
    pub fn with_attrs(mut self, attrs: Attributes) -> Self {
        self.attrs = attrs;
        self
    }
}

/// Contiguous same-style characters on one visible row.
#[derive(Clone, Copy, Debug)]
pub struct StyledRun<'a> {
    /// Starting column.
    pub column: usize,
    /// Row relative to the requested window (0 = first line at the scroll origin).
    pub row: usize,
    pub style: &'a TextStyle,
    pub text: &'a [char],
}

/// Whether a cursor blinks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Blink {
    Blinking,
    Steady,
}

/// Cursor shapes the engine can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CursorShape {
    Block(Blink),
    Underline(Blink),
    VerticalBar(Blink),
}

impl Default for CursorShape {
    fn default() -> Self {
        CursorShape::Block(Blink::Blinking)
    }
}

/// Cursor position on the live screen (row 0 = top of the screen, not of history).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CursorInfo {
    pub row: usize,
    pub column: usize,
    pub visible: bool,
    pub shape: CursorShape,
}

/// Read access to a locked terminal buffer.
///
/// Lines are addressed relative to the top of the live screen: 0 is the first
/// screen line, negative values reach into scrollback.
pub trait BufferView {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn history_line_count(&self) -> usize;
    fn is_using_alternate_screen(&self) -> bool;
    fn cursor(&self) -> CursorInfo;

    /// Visit the styled runs of up to `max_lines` lines starting at
    /// `scroll_origin`. Lines that do not exist are skipped.
    fn for_each_styled_run(
        &self,
        scroll_origin: i32,
        max_lines: usize,
        visitor: &mut dyn FnMut(StyledRun<'_>),
    );
}

/// A terminal buffer mutated by the engine and read by the presentation layer.
pub trait TerminalBuffer: Send + Sync {
    type View<'a>: BufferView
    where
        Self: 'a;

    /// Acquire the buffer for reading. The returned guard releases the lock
    /// on drop.
    fn lock(&self) -> Result<Self::View<'_>, EngineError>;
}

/// Source of the buffer's default text style.
pub trait StyleState: Send + Sync {
    fn default_foreground(&self) -> Result<TermColor, EngineError>;
    fn default_background(&self) -> Result<TermColor, EngineError>;
}

/// Owned default style. Each channel is unavailable until set.
#[derive(Debug, Default)]
pub struct DefaultStyle {
    foreground: RwLock<Option<TermColor>>,
    background: RwLock<Option<TermColor>>,
}

impl DefaultStyle {
    pub fn new(foreground: TermColor, background: TermColor) -> Self {
        Self {
            foreground: RwLock::new(Some(foreground)),
            background: RwLock::new(Some(background)),
        }
    }

    /// Default style taken from the configured palette indices.
    pub fn from_config(config: &settings::Config) -> Self {
        Self::new(
            TermColor::Indexed(config.default_foreground),
            TermColor::Indexed(config.default_background),
        )
    }

    pub fn set_foreground(&self, color: Option<TermColor>) {
        *self.foreground.write() = color;
    }

    pub fn set_background(&self, color: Option<TermColor>) {
        *self.background.write() = color;
    }
}

impl StyleState for DefaultStyle {
    fn default_foreground(&self) -> Result<TermColor, EngineError> {
        (*self.foreground.read()).ok_or(EngineError::StyleUnavailable)
    }

    fn default_background(&self) -> Result<TermColor, EngineError> {
        (*self.background.read()).ok_or(EngineError::StyleUnavailable)
    }
}
