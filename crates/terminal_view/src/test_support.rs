//! In-memory terminal buffer for unit tests.

use parking_lot::{Mutex, MutexGuard};
use terminal::{BufferView, CursorInfo, EngineError, StyledRun, TerminalBuffer, TextStyle};

struct Run {
    column: usize,
    style: TextStyle,
    text: Vec<char>,
}

/// Buffer with explicit runs per line. Line `-history` is the oldest
/// scrollback line, line 0 the top of the screen.
pub struct FakeBuffer {
    width: usize,
    height: usize,
    history: usize,
    lines: Vec<Vec<Run>>,
    stray: Vec<(usize, Run)>,
    cursor: CursorInfo,
    fail_lock: bool,
    lock: Mutex<()>,
}

pub struct FakeView<'a> {
    buffer: &'a FakeBuffer,
    _guard: MutexGuard<'a, ()>,
}

impl FakeBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            history: 0,
            lines: (0..height).map(|_| Vec::new()).collect(),
            stray: Vec::new(),
            cursor: CursorInfo {
                visible: true,
                ..Default::default()
            },
            fail_lock: false,
            lock: Mutex::new(()),
        }
    }

    pub fn with_history(mut self, lines: usize) -> Self {
        let mut all: Vec<Vec<Run>> = (0..lines).map(|_| Vec::new()).collect();
        all.append(&mut self.lines);
        self.lines = all;
        self.history += lines;
        self
    }

    /// Add a run at `line` (negative = scrollback).
    pub fn write(&mut self, line: i32, column: usize, style: TextStyle, text: &str) {
        let index = (line + self.history as i32) as usize;
        self.lines[index].push(Run {
            column,
            style,
            text: text.chars().collect(),
        });
    }

    /// Add a run delivered verbatim with an explicit window row.
    pub fn write_stray(&mut self, row: usize, column: usize, text: &str) {
        self.stray.push((
            row,
            Run {
                column,
                style: TextStyle::default(),
                text: text.chars().collect(),
            },
        ));
    }

    pub fn set_cursor(&mut self, cursor: CursorInfo) {
        self.cursor = cursor;
    }

    pub fn fail_lock(&mut self) {
        self.fail_lock = true;
    }

    pub fn is_locked(&self) -> bool {
        self.lock.try_lock().is_none()
    }
}

impl TerminalBuffer for FakeBuffer {
    type View<'a>
        = FakeView<'a>
    where
        Self: 'a;

    fn lock(&self) -> Result<Self::View<'_>, EngineError> {
        if self.fail_lock {
            return Err(EngineError::LockTimeout(std::time::Duration::ZERO));
        }
        Ok(FakeView {
            buffer: self,
            _guard: self.lock.lock(),
        })
    }
}

impl BufferView for FakeView<'_> {
    fn width(&self) -> usize {
        self.buffer.width
    }

    fn height(&self) -> usize {
        self.buffer.height
    }

    fn history_line_count(&self) -> usize {
        self.buffer.history
    }

    fn is_using_alternate_screen(&self) -> bool {
        false
    }

    fn cursor(&self) -> CursorInfo {
        self.buffer.cursor
    }

    fn for_each_styled_run(
        &self,
        scroll_origin: i32,
        max_lines: usize,
        visitor: &mut dyn FnMut(StyledRun<'_>),
    ) {
        let history = self.buffer.history as i32;
        for window_row in 0..max_lines {
            let line = scroll_origin + window_row as i32;
            if line < -history {
                continue;
            }
            if line >= self.buffer.height as i32 {
                break;
            }
            for run in &self.buffer.lines[(line + history) as usize] {
                visitor(StyledRun {
                    column: run.column,
                    row: window_row,
                    style: &run.style,
                    text: &run.text,
                });
            }
        }
        for (row, run) in &self.buffer.stray {
            visitor(StyledRun {
                column: run.column,
                row: *row,
                style: &run.style,
                text: &run.text,
            });
        }
    }
}
