//! Star display colors.
//!
//! Stars are tinted from their B-V color index using six buckets that follow
//! the Harvard spectral sequence, then washed out toward white as they get
//! fainter, approximating how the eye loses color perception for dim targets.
//!
//! | B-V range        | Bucket       | Typical class | Color     |
//! |------------------|--------------|---------------|-----------|
//! | `< -0.3`         | Blue-white   | O, B          | `#9bb0ff` |
//! | `-0.3 .. 0.0`    | White        | A             | `#cad7ff` |
//! | `0.0 .. 0.3`     | Yellow-white | F             | `#fff4ea` |
//! | `0.3 .. 0.6`     | Yellow       | G             | `#fffaf0` |
//! | `0.6 .. 1.4`     | Orange       | K             | `#ffd2a1` |
//! | `>= 1.4`         | Red          | M             | `#ff7f00` |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Magnitude at which desaturation toward white begins.
pub const DESATURATION_START_MAG: f64 = 3.5;

/// Magnitude at which a star is drawn fully white.
pub const DESATURATION_FULL_MAG: f64 = 6.0;

/// An opaque 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#rrggbb` string.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(digits.get(range)?, 16).ok();
        Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Linear blend toward `other`; `t = 0` keeps `self`, `t = 1` gives `other`.
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    pub fn with_alpha(self, alpha: f64) -> Rgba {
        Rgba::new(self.r, self.g, self.b, alpha)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// An RGB color with a straight (non-premultiplied) alpha in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 0.0,
    };

    pub fn new(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self {
            r,
            g,
            b,
            a: a.clamp(0.0, 1.0),
        }
    }

    pub fn rgb(&self) -> Rgb {
        Rgb::new(self.r, self.g, self.b)
    }
}

impl From<Rgb> for Rgba {
    fn from(color: Rgb) -> Self {
        color.with_alpha(1.0)
    }
}

/// Display color bucket derived from the B-V index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarColorClass {
    /// Hot O and B stars
    BlueWhite,
    /// A stars
    White,
    /// F stars
    YellowWhite,
    /// G stars
    Yellow,
    /// K stars
    Orange,
    /// M stars
    Red,
}

impl StarColorClass {
    /// Bucket a B-V color index.
    pub fn from_bv(bv: f64) -> Self {
        if bv < -0.3 {
            StarColorClass::BlueWhite
        } else if bv < 0.0 {
            StarColorClass::White
        } else if bv < 0.3 {
            StarColorClass::YellowWhite
        } else if bv < 0.6 {
            StarColorClass::Yellow
        } else if bv < 1.4 {
            StarColorClass::Orange
        } else {
            StarColorClass::Red
        }
    }

    pub fn base_color(&self) -> Rgb {
        match self {
            StarColorClass::BlueWhite => Rgb::new(0x9b, 0xb0, 0xff),
            StarColorClass::White => Rgb::new(0xca, 0xd7, 0xff),
            StarColorClass::YellowWhite => Rgb::new(0xff, 0xf4, 0xea),
            StarColorClass::Yellow => Rgb::new(0xff, 0xfa, 0xf0),
            StarColorClass::Orange => Rgb::new(0xff, 0xd2, 0xa1),
            StarColorClass::Red => Rgb::new(0xff, 0x7f, 0x00),
        }
    }
}

/// Fraction of the blend toward white for a star of the given magnitude.
pub fn desaturation(vmag: f64) -> f64 {
    ((vmag - DESATURATION_START_MAG) / (DESATURATION_FULL_MAG - DESATURATION_START_MAG))
        .clamp(0.0, 1.0)
}

/// Display color of a star. A missing B-V index is treated as 0.0.
pub fn star_color(bv: Option<f64>, vmag: f64) -> Rgb {
    let base = StarColorClass::from_bv(bv.unwrap_or(0.0)).base_color();
    base.lerp(Rgb::WHITE, desaturation(vmag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-0.5, StarColorClass::BlueWhite)]
    #[case(-0.3, StarColorClass::White)]
    #[case(-0.1, StarColorClass::White)]
    #[case(0.0, StarColorClass::YellowWhite)]
    #[case(0.3, StarColorClass::Yellow)]
    #[case(0.6, StarColorClass::Orange)]
    #[case(1.39, StarColorClass::Orange)]
    #[case(1.4, StarColorClass::Red)]
    #[case(1.5, StarColorClass::Red)]
    fn test_bv_buckets(#[case] bv: f64, #[case] expected: StarColorClass) {
        assert_eq!(StarColorClass::from_bv(bv), expected);
    }

    #[test]
    fn test_bright_stars_keep_their_color() {
        let color = star_color(Some(1.5), 0.5);
        assert_eq!(color, Rgb::new(0xff, 0x7f, 0x00));
        assert_eq!(star_color(Some(1.5), 3.5), color);
    }

    #[test]
    fn test_faint_stars_fade_to_white() {
        assert_eq!(star_color(Some(1.5), 6.0), Rgb::WHITE);
        assert_eq!(star_color(Some(-0.5), 8.0), Rgb::WHITE);

        let halfway = star_color(Some(1.5), 4.75);
        assert_eq!(halfway, Rgb::new(255, 191, 128));
    }

    #[test]
    fn test_missing_bv_uses_yellow_white() {
        assert_eq!(star_color(None, 1.0), StarColorClass::YellowWhite.base_color());
    }

    #[test]
    fn test_hex_round_trip() {
        let color = Rgb::from_hex("#ffd2a1").unwrap();
        assert_eq!(color, StarColorClass::Orange.base_color());
        assert_eq!(color.to_string(), "#ffd2a1");
        assert!(Rgb::from_hex("ffd2a1").is_none());
        assert!(Rgb::from_hex("#ffd2").is_none());
        assert!(Rgb::from_hex("#aééb").is_none());
    }

    #[test]
    fn test_rgba_clamps_alpha() {
        assert_eq!(Rgb::WHITE.with_alpha(1.7).a, 1.0);
        assert_eq!(Rgb::WHITE.with_alpha(-0.2).a, 0.0);
    }
}
