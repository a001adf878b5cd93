//! Entity identity colors.
//!
//! Every continent, province and tile is identified by the exact RGB color it
//! is painted with. Colors are packed into a 24-bit integer once per pixel so
//! identity comparisons and hash lookups never touch floating point channels.

use std::fmt;
use std::str::FromStr;

use image::Rgba;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Packed 24-bit RGB identity color (alpha is not part of identity).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColorCode(pub u32);

impl ColorCode {
    /// Identity used for sentinel parents when hierarchy resolution fails.
    pub const SENTINEL: ColorCode = ColorCode(0x000000);

    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        ColorCode(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub fn from_pixel(pixel: &Rgba<u8>) -> Self {
        Self::from_rgb(pixel[0], pixel[1], pixel[2])
    }

    pub fn r(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn g(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn b(&self) -> u8 {
        self.0 as u8
    }

    /// Opaque pixel carrying this color.
    pub fn to_pixel(&self) -> Rgba<u8> {
        Rgba([self.r(), self.g(), self.b(), 255])
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }

    /// Canonical uppercase hex form, e.g. `3762AB`.
    pub fn to_hex(&self) -> String {
        format!("{:06X}", self.0 & 0x00FF_FFFF)
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06X}", self.0 & 0x00FF_FFFF)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color code {0:?}: expected six hex digits")]
pub struct ParseColorError(pub String);

impl FromStr for ColorCode {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('#');
        if trimmed.len() != 6 {
            return Err(ParseColorError(s.to_string()));
        }
        u32::from_str_radix(trimmed, 16)
            .map(ColorCode)
            .map_err(|_| ParseColorError(s.to_string()))
    }
}

impl Serialize for ColorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ColorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
