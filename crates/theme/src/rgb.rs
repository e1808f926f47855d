//! Concrete 24-bit colors.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// A concrete 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(0xff, 0xff, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from a packed `0xRRGGBB` value.
    pub const fn from_u32(packed: u32) -> Self {
        Self {
            r: ((packed >> 16) & 0xff) as u8,
            g: ((packed >> 8) & 0xff) as u8,
            b: (packed & 0xff) as u8,
        }
    }

    /// Packed `0xRRGGBB` value.
    pub const fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseRgbError {
    #[error("color must look like #rrggbb, got {0:?}")]
    Format(String),
    #[error("invalid hex digits in {0:?}")]
    Digits(String),
}

impl FromStr for Rgb {
    type Err = ParseRgbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ParseRgbError::Format(s.to_string()));
        }
        // from_str_radix tolerates a leading sign
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseRgbError::Digits(s.to_string()));
        }
        let packed =
            u32::from_str_radix(hex, 16).map_err(|_| ParseRgbError::Digits(s.to_string()))?;
        Ok(Rgb::from_u32(packed))
    }
}

impl TryFrom<String> for Rgb {
    type Error = ParseRgbError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("#000000", Rgb::BLACK ; "black")]
    #[test_case("#ffffff", Rgb::WHITE ; "white")]
    #[test_case("#1E90FF", Rgb::new(0x1e, 0x90, 0xff) ; "uppercase")]
    #[test_case("4682b4", Rgb::new(0x46, 0x82, 0xb4) ; "no hash")]
    #[test_case("  #cd0000 ", Rgb::new(0xcd, 0, 0) ; "surrounding whitespace")]
    fn parses_hex(input: &str, expected: Rgb) {
        assert_eq!(input.parse::<Rgb>(), Ok(expected));
    }

    #[test_case("" ; "empty")]
    #[test_case("#fff" ; "short form")]
    #[test_case("#12345g" ; "bad digit")]
    #[test_case("#1234567" ; "too long")]
    #[test_case("#+12345" ; "sign")]
    #[test_case("#ééé" ; "non ascii")]
    fn rejects_bad_hex(input: &str) {
        assert!(input.parse::<Rgb>().is_err());
    }

    #[test]
    fn deserializes_from_toml_string() {
        #[derive(Deserialize)]
        struct Wrapper {
            color: Rgb,
        }
        let w: Wrapper = toml::from_str(r##"color = "#4c4c4c""##).unwrap();
        assert_eq!(w.color, Rgb::new(0x4c, 0x4c, 0x4c));
    }

    proptest! {
        #[test]
        fn display_then_parse_is_identity(r: u8, g: u8, b: u8) {
            let color = Rgb::new(r, g, b);
            prop_assert_eq!(color.to_string().parse::<Rgb>(), Ok(color));
        }

        #[test]
        fn packed_value_is_identity(packed in 0u32..=0xff_ffff) {
            prop_assert_eq!(Rgb::from_u32(packed).to_u32(), packed);
        }
    }
}
