//! Hex color parsing for reminder lists.
//!
//! Lists carry an RGB color. Tools accept `#RGB`, `#RRGGBB` (with or
//! without the leading `#`) and always report `#RRGGBB` in uppercase.
//! The native store may shift channels slightly when it converts between
//! color spaces, so round-trips are only approximately exact.

use std::fmt;
use std::str::FromStr;

use crate::error::RemindersError;

/// An sRGB color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from floating channel components in `0.0..=1.0`.
    ///
    /// Out-of-range components are clamped.
    pub fn from_unit(r: f64, g: f64, b: f64) -> Self {
        fn channel(v: f64) -> u8 {
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        Self::new(channel(r), channel(g), channel(b))
    }

    /// Channel components in `0.0..=1.0`, for native color constructors.
    pub fn to_unit(self) -> (f64, f64, f64) {
        (
            f64::from(self.r) / 255.0,
            f64::from(self.g) / 255.0,
            f64::from(self.b) / 255.0,
        )
    }

    /// Largest per-channel difference to `other`.
    pub fn max_channel_delta(self, other: Rgb) -> u8 {
        [
            self.r.abs_diff(other.r),
            self.g.abs_diff(other.g),
            self.b.abs_diff(other.b),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// Uppercase `#RRGGBB`.
    pub fn to_hex(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = RemindersError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(RemindersError::InvalidInput(format!(
                "color must contain valid hex digits, got {s:?}"
            )));
        }

        let expanded = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 => hex.to_owned(),
            _ => {
                return Err(RemindersError::InvalidInput(format!(
                    "color must be 3 or 6 hex digits, got {s:?}"
                )));
            }
        };

        let channel = |i: usize| {
            u8::from_str_radix(&expanded[i..i + 2], 16)
                .map_err(|e| RemindersError::InvalidInput(format!("invalid color {s:?}: {e}")))
        };

        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn parses_six_digit_with_hash() {
        let c: Rgb = "#FF5733".parse().unwrap();
        assert_eq!(c, Rgb::new(0xFF, 0x57, 0x33));
    }

    #[test]
    fn parses_lowercase_without_hash() {
        let c: Rgb = "ff5733".parse().unwrap();
        assert_eq!(c.to_hex(), "#FF5733");
    }

    #[test]
    fn expands_three_digit_shorthand() {
        let c: Rgb = " #0af ".parse().unwrap();
        assert_eq!(c.to_hex(), "#00AAFF");
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("#FF57".parse::<Rgb>().is_err());
        assert!("".parse::<Rgb>().is_err());
    }

    #[test]
    fn rejects_non_hex() {
        let err = "#GG5733".parse::<Rgb>().unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn unit_components_round_trip() {
        let c = Rgb::new(255, 87, 51);
        let (r, g, b) = c.to_unit();
        assert_eq!(Rgb::from_unit(r, g, b), c);
    }

    #[test]
    fn from_unit_clamps() {
        assert_eq!(Rgb::from_unit(1.2, -0.1, 0.5), Rgb::new(255, 0, 128));
    }

    #[test]
    fn channel_delta() {
        let a = Rgb::new(255, 87, 51);
        let b = Rgb::new(250, 90, 51);
        assert_eq!(a.max_channel_delta(b), 5);
    }
}
