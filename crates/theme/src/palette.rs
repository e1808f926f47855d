//! 256-entry indexed color palettes.
//!
//! Layout:
//! - 0-15: base ANSI colors (theme dependent)
//! - 16-231: 6x6x6 color cube
//! - 232-255: 24-step grayscale

use crate::Rgb;
use once_cell::sync::Lazy;

/// Channel intensities used by the xterm 6x6x6 color cube.
pub const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

const XTERM_BASE: [u32; 16] = [
    0x000000, 0xcd0000, 0x00cd00, 0xcdcd00, 0x1e90ff, 0xcd00cd, 0x00cdcd, 0xe5e5e5, //
    0x4c4c4c, 0xff0000, 0x00ff00, 0xffff00, 0x4682b4, 0xff00ff, 0x00ffff, 0xffffff,
];

const WINDOWS_BASE: [u32; 16] = [
    0x000000, 0x800000, 0x008000, 0x808000, 0x000080, 0x800080, 0x008080, 0xc0c0c0, //
    0x808080, 0xff0000, 0x00ff00, 0xffff00, 0x4682b4, 0xff00ff, 0x00ffff, 0xffffff,
];

static XTERM: Lazy<Palette> = Lazy::new(|| Palette::from_base(base_colors(&XTERM_BASE)));
static WINDOWS: Lazy<Palette> = Lazy::new(|| Palette::from_base(base_colors(&WINDOWS_BASE)));

fn base_colors(packed: &[u32; 16]) -> [Rgb; 16] {
    packed.map(Rgb::from_u32)
}

/// Built-in palette themes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaletteTheme {
    #[default]
    Xterm,
    Windows,
}

impl PaletteTheme {
    /// Look up a theme by its config name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "xterm" => Some(Self::Xterm),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    pub fn palette(self) -> &'static Palette {
        match self {
            Self::Xterm => &XTERM,
            Self::Windows => &WINDOWS,
        }
    }
}

/// Fixed mapping from color index to concrete color.
#[derive(Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgb; 256],
}

impl std::fmt::Debug for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Palette")
            .field("base", &&self.colors[..16])
            .finish_non_exhaustive()
    }
}

impl Default for Palette {
    fn default() -> Self {
        XTERM.clone()
    }
}

impl Palette {
    /// Build a full palette from 16 base colors.
    pub fn from_base(base: [Rgb; 16]) -> Self {
        let mut colors = [Rgb::BLACK; 256];
        colors[..16].copy_from_slice(&base);
        for (i, slot) in colors[16..232].iter_mut().enumerate() {
            *slot = Rgb::new(
                CUBE_LEVELS[i / 36],
                CUBE_LEVELS[(i / 6) % 6],
                CUBE_LEVELS[i % 6],
            );
        }
        for (i, slot) in colors[232..].iter_mut().enumerate() {
            let level = 8 + 10 * i as u8;
            *slot = Rgb::new(level, level, level);
        }
        Self { colors }
    }

    pub fn xterm() -> Self {
        XTERM.clone()
    }

    pub fn windows() -> Self {
        WINDOWS.clone()
    }

    /// Concrete color for a palette index.
    #[inline]
    pub fn resolve(&self, index: u8) -> Rgb {
        self.colors[index as usize]
    }

    /// Replace base colors from `#rrggbb` strings, in index order.
    ///
    /// Invalid entries keep the existing color and are logged; entries past
    /// index 15 are ignored.
    pub fn with_overrides<S: AsRef<str>>(mut self, overrides: &[S]) -> Self {
        if overrides.len() > 16 {
            tracing::warn!(
                "Palette override has {} entries, only the first 16 are used",
                overrides.len()
            );
        }
        for (index, entry) in overrides.iter().take(16).enumerate() {
            match entry.as_ref().parse::<Rgb>() {
                Ok(color) => self.colors[index] = color,
                Err(e) => tracing::warn!("Ignoring palette entry {}: {}", index, e),
            }
        }
        self
    }
}

/// Palette selected by the user's config, with base-color overrides applied.
pub fn palette_for(config: &settings::Config) -> Palette {
    let theme = PaletteTheme::from_name(&config.theme).unwrap_or_else(|| {
        tracing::warn!("Unknown palette theme {:?}, using xterm", config.theme);
        PaletteTheme::Xterm
    });
    theme.palette().clone().with_overrides(&config.palette)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case(0, 0x000000 ; "black")]
    #[test_case(1, 0xcd0000 ; "red")]
    #[test_case(4, 0x1e90ff ; "blue")]
    #[test_case(8, 0x4c4c4c ; "bright black")]
    #[test_case(12, 0x4682b4 ; "bright blue")]
    #[test_case(15, 0xffffff ; "bright white")]
    fn xterm_base_colors(index: u8, packed: u32) {
        assert_eq!(Palette::xterm().resolve(index), Rgb::from_u32(packed));
    }

    #[test_case(1, 0x800000 ; "red")]
    #[test_case(7, 0xc0c0c0 ; "white")]
    #[test_case(8, 0x808080 ; "bright black")]
    fn windows_base_colors(index: u8, packed: u32) {
        assert_eq!(Palette::windows().resolve(index), Rgb::from_u32(packed));
    }

    #[test_case(16, Rgb::new(0, 0, 0) ; "cube origin")]
    #[test_case(17, Rgb::new(0, 0, 95) ; "first blue step")]
    #[test_case(21, Rgb::new(0, 0, 255) ; "full blue")]
    #[test_case(196, Rgb::new(255, 0, 0) ; "full red")]
    #[test_case(231, Rgb::new(255, 255, 255) ; "cube end")]
    #[test_case(232, Rgb::new(8, 8, 8) ; "first gray")]
    #[test_case(244, Rgb::new(128, 128, 128) ; "mid gray")]
    #[test_case(255, Rgb::new(238, 238, 238) ; "last gray")]
    fn extended_colors(index: u8, expected: Rgb) {
        assert_eq!(Palette::xterm().resolve(index), expected);
    }

    #[test]
    fn extended_range_is_theme_independent() {
        let xterm = Palette::xterm();
        let windows = Palette::windows();
        for index in 16..=255u8 {
            assert_eq!(xterm.resolve(index), windows.resolve(index));
        }
    }

    #[test_case("xterm", Some(PaletteTheme::Xterm) ; "xterm")]
    #[test_case("Windows", Some(PaletteTheme::Windows) ; "case insensitive")]
    #[test_case("solarized", None ; "unknown")]
    fn theme_lookup(name: &str, expected: Option<PaletteTheme>) {
        assert_eq!(PaletteTheme::from_name(name), expected);
    }

    #[test]
    fn overrides_replace_base_colors_and_skip_invalid() {
        let palette = Palette::xterm().with_overrides(&["#010203", "nonsense", "#0a0b0c"]);
        assert_eq!(palette.resolve(0), Rgb::new(1, 2, 3));
        assert_eq!(palette.resolve(1), Rgb::from_u32(0xcd0000));
        assert_eq!(palette.resolve(2), Rgb::new(10, 11, 12));
        assert_eq!(palette.resolve(3), Rgb::from_u32(0xcdcd00));
    }

    #[test]
    fn overrides_never_touch_extended_range() {
        let overrides: Vec<String> = (0..20).map(|_| "#123456".to_string()).collect();
        let palette = Palette::xterm().with_overrides(&overrides);
        assert_eq!(palette.resolve(15), Rgb::from_u32(0x123456));
        assert_eq!(palette.resolve(16), Rgb::BLACK);
    }

    #[test]
    fn palette_for_unknown_theme_falls_back_to_xterm() {
        let config = settings::Config {
            theme: "nope".into(),
            ..Default::default()
        };
        assert_eq!(palette_for(&config), Palette::xterm());
    }

    #[test]
    fn palette_for_applies_config_overrides() {
        let config = settings::Config {
            theme: "windows".into(),
            palette: vec!["#ffffff".into()],
            ..Default::default()
        };
        let palette = palette_for(&config);
        assert_eq!(palette.resolve(0), Rgb::WHITE);
        assert_eq!(palette.resolve(1), Rgb::from_u32(0x800000));
    }

    proptest! {
        #[test]
        fn grayscale_channels_are_equal(index in 232u8..=255) {
            let c = Palette::xterm().resolve(index);
            prop_assert!(c.r == c.g && c.g == c.b);
        }

        #[test]
        fn cube_channels_use_cube_levels(index in 16u8..=231) {
            let c = Palette::xterm().resolve(index);
            for channel in [c.r, c.g, c.b] {
                prop_assert!(CUBE_LEVELS.contains(&channel));
            }
        }
    }
}
