//! Palette & style resolution.
//!
//! Turns engine colors into concrete [`Rgb`] values:
//! - Unset channels take the buffer's default style
//! - Indexed colors go through the 256-entry palette, true colors pass through
//! - INVERSE swaps the resolved pair, then HIDDEN paints foreground as background

use settings::constants::terminal::{DEFAULT_BACKGROUND_INDEX, DEFAULT_FOREGROUND_INDEX};
use terminal::{Attributes, StyleState, TermColor, TextStyle};
use theme::{Palette, Rgb};

/// Used when the buffer cannot report its default foreground.
pub const FALLBACK_FOREGROUND: TermColor = TermColor::Indexed(DEFAULT_FOREGROUND_INDEX);
/// Used when the buffer cannot report its default background.
pub const FALLBACK_BACKGROUND: TermColor = TermColor::Indexed(DEFAULT_BACKGROUND_INDEX);

/// Concrete color for an engine color.
#[inline]
pub fn resolve_color(color: TermColor, palette: &Palette) -> Rgb {
    match color {
        TermColor::Indexed(index) => palette.resolve(index),
        TermColor::Rgb(rgb) => rgb,
    }
}

/// The buffer's default colors, resolved once per snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DefaultColors {
    pub foreground: Rgb,
    pub background: Rgb,
}

impl DefaultColors {
    /// Read the default style, falling back to fixed indices when unavailable.
    pub fn resolve(style: &dyn StyleState, palette: &Palette) -> Self {
        let foreground = style.default_foreground().unwrap_or_else(|e| {
            tracing::debug!("Default foreground unavailable ({}), using fallback", e);
            FALLBACK_FOREGROUND
        });
        let background = style.default_background().unwrap_or_else(|e| {
            tracing::debug!("Default background unavailable ({}), using fallback", e);
            FALLBACK_BACKGROUND
        });
        Self {
            foreground: resolve_color(foreground, palette),
            background: resolve_color(background, palette),
        }
    }
}

/// Colors a run is painted with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedStyle {
    pub foreground: Rgb,
    pub background: Rgb,
}

/// Resolve a run style to painted colors.
pub fn resolve_style(
    style: &TextStyle,
    defaults: &DefaultColors,
    palette: &Palette,
) -> ResolvedStyle {
    let mut foreground = style
        .foreground
        .map_or(defaults.foreground, |color| resolve_color(color, palette));
    let mut background = style
        .background
        .map_or(defaults.background, |color| resolve_color(color, palette));

    if style.attrs.contains(Attributes::INVERSE) {
        std::mem::swap(&mut foreground, &mut background);
    }
    if style.attrs.contains(Attributes::HIDDEN) {
        foreground = background;
    }

    ResolvedStyle {
        foreground,
        background,
    }
}
