//! Thread colors
//!
//! Every derived color goes through [`clamp_channel`]: clamp to `[0, 255]`
//! first, then round to the nearest integer. Any other order produces
//! out-of-range or fractional channels that encode to malformed hex.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EngineError;

/// An opaque RGB thread color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ThreadColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ThreadColor {
    pub const BLACK: ThreadColor = ThreadColor::new(0, 0, 0);
    pub const WHITE: ThreadColor = ThreadColor::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`, `rrggbb`, `#rgb` or `rgb(r, g, b)`.
    ///
    /// `rgb()` channels may be fractional or out of range; they are clamped
    /// and rounded. Non-numeric input is rejected.
    pub fn from_hex(input: &str) -> Result<Self, EngineError> {
        let s = input.trim();
        if let Some(body) = s
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::parse_rgb_function(input, body);
        }

        let digits = s.strip_prefix('#').unwrap_or(s);
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(EngineError::invalid_color(input, "non-hex character"));
        }
        match digits.len() {
            6 => {
                let channel = |i: usize| {
                    u8::from_str_radix(&digits[i..i + 2], 16)
                        .map_err(|e| EngineError::invalid_color(input, e.to_string()))
                };
                Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
            }
            3 => {
                let channel = |i: usize| {
                    u8::from_str_radix(&digits[i..i + 1], 16)
                        .map(|v| v * 17)
                        .map_err(|e| EngineError::invalid_color(input, e.to_string()))
                };
                Ok(Self::new(channel(0)?, channel(1)?, channel(2)?))
            }
            n => Err(EngineError::invalid_color(
                input,
                format!("expected 3 or 6 hex digits, found {}", n),
            )),
        }
    }

    fn parse_rgb_function(input: &str, body: &str) -> Result<Self, EngineError> {
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(EngineError::invalid_color(input, "rgb() needs 3 channels"));
        }
        let mut channels = [0u8; 3];
        for (slot, part) in channels.iter_mut().zip(&parts) {
            let value: f64 = part
                .parse()
                .map_err(|_| EngineError::invalid_color(input, "rgb() channel is not a number"))?;
            *slot = clamp_channel(value)
                .ok_or_else(|| EngineError::invalid_color(input, "rgb() channel is not finite"))?;
        }
        Ok(Self::new(channels[0], channels[1], channels[2]))
    }

    /// Parse, falling back to `fallback` (with a warning) on malformed input.
    pub fn parse_or(input: &str, fallback: ThreadColor) -> ThreadColor {
        match Self::from_hex(input) {
            Ok(color) => color,
            Err(err) => {
                tracing::warn!("{}; using {}", err, fallback);
                fallback
            }
        }
    }

    /// Lower-case `#rrggbb`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Brightness-shifted copy. Malformed results fall back to `self`.
    pub fn adjusted(&self, amount: f64) -> ThreadColor {
        ThreadColor::parse_or(&adjust_brightness(*self, amount), *self)
    }

    /// RGBA bytes with the given opacity in `[0, 1]`.
    pub fn rgba8(&self, opacity: f32) -> [u8; 4] {
        let alpha = clamp_channel(f64::from(opacity) * 255.0).unwrap_or(255);
        [self.r, self.g, self.b, alpha]
    }
}

impl fmt::Display for ThreadColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ThreadColor {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for ThreadColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ThreadColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ThreadColor::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Clamp to `[0, 255]`, then round to the nearest integer.
///
/// Returns `None` for NaN or infinite input.
pub fn clamp_channel(value: f64) -> Option<u8> {
    if !value.is_finite() {
        return None;
    }
    Some(value.clamp(0.0, 255.0).round() as u8)
}

/// Shift every channel by `amount` and encode as `#rrggbb`.
///
/// A non-finite amount leaves the channel unchanged.
pub fn adjust_brightness(color: ThreadColor, amount: f64) -> String {
    let shift = |c: u8| clamp_channel(f64::from(c) + amount).unwrap_or(c);
    ThreadColor::new(shift(color.r), shift(color.g), shift(color.b)).to_hex()
}
