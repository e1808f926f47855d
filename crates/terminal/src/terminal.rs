//! Terminal emulation core.
//!
//! Engine interface consumed by the presentation layer, the alacritty_terminal
//! adapter behind it, transport connectors, and the session that ties a
//! connector to the VT processing thread. This crate has no UI dependencies.

pub mod alacritty;
pub mod buffer;
pub mod connector;
pub mod session;
pub mod types;
pub mod vt_processor;

pub use alacritty::{AlacrittyBuffer, AlacrittyView, SharedTerm};
pub use buffer::{
    Attributes, Blink, BufferView, CursorInfo, CursorShape, DefaultStyle, EngineError,
    StyleState, StyledRun, TermColor, TerminalBuffer, TextStyle, CONTINUATION, NUL_FILLER,
};
pub use connector::{EchoConnector, TtyConnector};
pub use session::{EventProxy, ListenerId, TerminalSession};
pub use types::{BufferChange, TermSize};
pub use vt_processor::TerminalProcessor;
