use crate::{clamp, Scalar};
use std::{
    fmt,
    ops::{Add, Mul},
    str::FromStr,
};

/// RGBA color with real-valued channels in the `0..=255` range.
///
/// Corner colors stay un-rounded through every subdivision level so repeated
/// halving does not compound rounding error; conversion to 8-bit happens only
/// at the moment a pixel is written.
#[derive(Clone, Copy, PartialEq, Default)]
pub struct Color(pub [Scalar; 4]);

impl Color {
    pub fn new(r: Scalar, g: Scalar, b: Scalar, a: Scalar) -> Self {
        Self([r, g, b, a])
    }

    /// Override alpha channel with an opacity value in the `0..=1` range
    pub fn with_opacity(self, opacity: Scalar) -> Self {
        let Self([r, g, b, _]) = self;
        Self([r, g, b, (opacity * 255.0).trunc()])
    }

    /// Arithmetic mean of two colors, channel by channel
    pub fn mid(self, other: Self) -> Self {
        (self + other) * 0.5
    }

    /// Round and clamp channels to an 8-bit pixel
    pub fn to_rgba(self) -> Rgba {
        let Self([r, g, b, a]) = self;
        let quant = |v: Scalar| clamp(v.round(), 0.0, 255.0) as u8;
        Rgba([quant(r), quant(g), quant(b), quant(a)])
    }

    /// All channels are finite (not NaN and not infinite)
    pub fn is_finite(self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl Add for Color {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self::Output {
        let Self([r0, g0, b0, a0]) = self;
        let Self([r1, g1, b1, a1]) = other;
        Self([r0 + r1, g0 + g1, b0 + b1, a0 + a1])
    }
}

impl Mul<Scalar> for Color {
    type Output = Self;

    #[inline]
    fn mul(self, scale: Scalar) -> Self::Output {
        let Self([r, g, b, a]) = self;
        Self([r * scale, g * scale, b * scale, a * scale])
    }
}

impl From<Rgba> for Color {
    fn from(rgba: Rgba) -> Self {
        let Rgba([r, g, b, a]) = rgba;
        Self([r as Scalar, g as Scalar, b as Scalar, a as Scalar])
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Rgba([r, g, b, a]) = self.to_rgba();
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)?;
        if a != 255 {
            write!(f, "{:02x}", a)?;
        }
        Ok(())
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(color: &str) -> Result<Self, Self::Err> {
        if color.starts_with('#') && (color.len() == 7 || color.len() == 9) {
            // #RRGGBB(AA)
            let bytes: &[u8] = color[1..].as_ref();
            let digit = |byte| match byte {
                b'A'..=b'F' => Ok(byte - b'A' + 10),
                b'a'..=b'f' => Ok(byte - b'a' + 10),
                b'0'..=b'9' => Ok(byte - b'0'),
                _ => Err(ColorError::HexExpected),
            };
            let mut hex = bytes
                .chunks(2)
                .map(|pair| Ok((digit(pair[0])? << 4 | digit(pair[1])?) as Scalar));
            Ok(Color::new(
                hex.next().unwrap_or(Ok(0.0))?,
                hex.next().unwrap_or(Ok(0.0))?,
                hex.next().unwrap_or(Ok(0.0))?,
                hex.next().unwrap_or(Ok(255.0))?,
            ))
        } else {
            Err(ColorError::HexExpected)
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let color = std::borrow::Cow::<'de, str>::deserialize(deserializer)?;
        color.parse().map_err(serde::de::Error::custom)
    }
}

/// 8-bit RGBA pixel, the element type of the raster buffer.
///
/// `Pod` so a finished image can be handed to the embedding layer as plain
/// bytes via `bytemuck::cast_slice`.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Rgba(pub [u8; 4]);

impl fmt::Debug for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Rgba([r, g, b, a]) = self;
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
    }
}

#[derive(Debug, Clone)]
pub enum ColorError {
    HexExpected,
}

impl fmt::Display for ColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorError::HexExpected => {
                write!(f, "Color expected to be #RRGGBB(AA) in hexadecimal format")
            }
        }
    }
}

impl std::error::Error for ColorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() -> Result<(), ColorError> {
        assert_eq!(
            Color::new(1.0, 2.0, 3.0, 4.0),
            "#01020304".parse::<Color>()?
        );
        assert_eq!(
            Color::new(170.0, 187.0, 204.0, 255.0),
            "#aabbcc".parse::<Color>()?
        );
        assert!("aabbcc".parse::<Color>().is_err());
        assert!("#aabbc".parse::<Color>().is_err());
        Ok(())
    }

    #[test]
    fn test_display_parse() -> Result<(), ColorError> {
        let color: Color = "#01020304".parse()?;
        assert_eq!(color.to_string(), "#01020304");
        let color: Color = "#010203".parse()?;
        assert_eq!(color.to_string(), "#010203");
        Ok(())
    }

    #[test]
    fn test_quantize() {
        let color = Color::new(0.4, 0.5, 254.6, 300.0);
        assert_eq!(color.to_rgba(), Rgba([0, 1, 255, 255]));
        let color = Color::new(-3.0, 17.0, 0.0, 255.0);
        assert_eq!(color.to_rgba(), Rgba([0, 17, 0, 255]));
    }

    #[test]
    fn test_mid_idempotence() {
        let color = Color::new(12.0, 34.0, 56.0, 78.0);
        // averaging equal inputs must not drift
        let mut mixed = color;
        for _ in 0..64 {
            mixed = mixed.mid(color);
        }
        assert_eq!(mixed, color);
    }

    #[test]
    fn test_opacity() {
        let color = Color::new(10.0, 20.0, 30.0, 255.0).with_opacity(0.5);
        // opacity scaling truncates, matching 8-bit canvas semantics
        assert_eq!(color.0[3], 127.0);
        assert_eq!(Color::default().with_opacity(1.0).0[3], 255.0);
    }
}
