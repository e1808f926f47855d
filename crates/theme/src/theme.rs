//! Color palettes for termbridge.
//!
//! # Modules
//!
//! - `rgb` - Concrete 24-bit colors and `#rrggbb` parsing
//! - `palette` - 256-entry indexed palettes and the built-in themes

mod palette;
mod rgb;

pub use palette::{palette_for, Palette, PaletteTheme, CUBE_LEVELS};
pub use rgb::{ParseRgbError, Rgb};
