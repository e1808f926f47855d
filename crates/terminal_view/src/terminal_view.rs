//! Terminal presentation and input layer.
//!
//! Projects the engine buffer into renderable grids and turns key and
//! input-method events into bytes for the remote process.

mod colors;
mod ime;
mod keys;
mod pane;
mod presentation;
mod scroll;
mod snapshot;

#[cfg(test)]
mod test_support;

pub use colors::{
    resolve_color, resolve_style, DefaultColors, ResolvedStyle, FALLBACK_BACKGROUND,
    FALLBACK_FOREGROUND,
};
pub use ime::{
    normalize_newlines, Accumulator, ComposingSession, EditorAction, ImeReconciler, ImeResponse,
    Outgoing,
};
pub use keys::{
    binding_for, encode_key, KeyBinding, KeyBytes, KeyCode, KeyEncoding, KeyEvent, LogicalKey,
    LogicalKeyEncoder, Modifiers, TermwizKeyEncoder,
};
pub use pane::{TerminalPane, ViewState};
pub use presentation::{PresentationContext, PresentationHandle};
pub use scroll::{clamp_scroll_origin, ScrollState};
pub use snapshot::{build_snapshot, Cell, CellAttrs, RenderError, RenderSnapshot};
