//! The closed pixel type universe.
//!
//! Every image carries exactly one of eleven element representations. The
//! order of [`PixelType::ALL`] is significant: dispatch scans it front to back
//! and listings present it in that order.
//!
//! ## Supported Types
//! | tag         | Rust type          | channels |
//! |-------------|--------------------|----------|
//! | `GRAY8`     | `u8`               | 1        |
//! | `GRAYA8`    | `[u8; 2]`          | 2        |
//! | `GRAY16`    | `u16`              | 1        |
//! | `GRAY32`    | `u32`              | 1        |
//! | `GRAY64`    | `u64`              | 1        |
//! | `FLOAT`     | `f32`              | 1        |
//! | `DOUBLE`    | `f64`              | 1        |
//! | `RGB8`      | `[u8; 3]`          | 3        |
//! | `RGBA8`     | `[u8; 4]`          | 4        |
//! | `COMPLEX_F` | `Complex<f32>`     | 2        |
//! | `COMPLEX_D` | `Complex<f64>`     | 2        |

use std::fmt;
use std::str::FromStr;

use num_complex::Complex;
use num_traits::{Float as FloatTrait, PrimInt, Unsigned};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub type Gray8 = u8;
pub type GrayA8 = [u8; 2];
pub type Gray16 = u16;
pub type Gray32 = u32;
pub type Gray64 = u64;
pub type Float = f32;
pub type Double = f64;
pub type Rgb8 = [u8; 3];
pub type Rgba8 = [u8; 4];
pub type ComplexF = Complex<f32>;
pub type ComplexD = Complex<f64>;

/// Runtime tag naming one member of the pixel type universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PixelType {
    Gray8,
    GrayA8,
    Gray16,
    Gray32,
    Gray64,
    Float,
    Double,
    Rgb8,
    Rgba8,
    ComplexF,
    ComplexD,
}

impl PixelType {
    pub const ALL: [PixelType; 11] = [
        PixelType::Gray8,
        PixelType::GrayA8,
        PixelType::Gray16,
        PixelType::Gray32,
        PixelType::Gray64,
        PixelType::Float,
        PixelType::Double,
        PixelType::Rgb8,
        PixelType::Rgba8,
        PixelType::ComplexF,
        PixelType::ComplexD,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PixelType::Gray8 => "GRAY8",
            PixelType::GrayA8 => "GRAYA8",
            PixelType::Gray16 => "GRAY16",
            PixelType::Gray32 => "GRAY32",
            PixelType::Gray64 => "GRAY64",
            PixelType::Float => "FLOAT",
            PixelType::Double => "DOUBLE",
            PixelType::Rgb8 => "RGB8",
            PixelType::Rgba8 => "RGBA8",
            PixelType::ComplexF => "COMPLEX_F",
            PixelType::ComplexD => "COMPLEX_D",
        }
    }

    /// Size of one element in bytes.
    pub fn size_of(self) -> usize {
        match self {
            PixelType::Gray8 => 1,
            PixelType::GrayA8 => 2,
            PixelType::Gray16 => 2,
            PixelType::Gray32 => 4,
            PixelType::Gray64 => 8,
            PixelType::Float => 4,
            PixelType::Double => 8,
            PixelType::Rgb8 => 3,
            PixelType::Rgba8 => 4,
            PixelType::ComplexF => 8,
            PixelType::ComplexD => 16,
        }
    }

    pub fn channels(self) -> usize {
        match self {
            PixelType::GrayA8 | PixelType::ComplexF | PixelType::ComplexD => 2,
            PixelType::Rgb8 => 3,
            PixelType::Rgba8 => 4,
            _ => 1,
        }
    }

    pub fn is_complex(self) -> bool {
        matches!(self, PixelType::ComplexF | PixelType::ComplexD)
    }

    /// Single channel types: the integer grays and the two float widths.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            PixelType::Gray8
                | PixelType::Gray16
                | PixelType::Gray32
                | PixelType::Gray64
                | PixelType::Float
                | PixelType::Double
        )
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PixelType::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::unsupported(format!("unknown pixel type '{s}'")))
    }
}

impl TryFrom<String> for PixelType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PixelType> for String {
    fn from(value: PixelType) -> Self {
        value.name().to_string()
    }
}

/// Compile-time side of the `PixelType` bijection.
///
/// `channel` and `from_channels` expose a pixel as a small vector of `f64`
/// samples so numeric kernels can be written once for every representation.
/// Integer channels round and saturate on the way back.
pub trait Pixel: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const TYPE: PixelType;
    const CHANNELS: usize;

    fn channel(self, c: usize) -> f64;

    fn from_channels(values: &[f64]) -> Self;
}

macro_rules! impl_int_pixel {
    ($($t:ty => $tag:ident),* $(,)?) => {$(
        impl Pixel for $t {
            const TYPE: PixelType = PixelType::$tag;
            const CHANNELS: usize = 1;

            #[inline]
            fn channel(self, _c: usize) -> f64 {
                self as f64
            }

            #[inline]
            fn from_channels(values: &[f64]) -> Self {
                // float to int casts saturate, NaN maps to 0
                values[0].round() as $t
            }
        }
    )*};
}

impl_int_pixel!(u8 => Gray8, u16 => Gray16, u32 => Gray32, u64 => Gray64);

macro_rules! impl_float_pixel {
    ($($t:ty => $tag:ident),* $(,)?) => {$(
        impl Pixel for $t {
            const TYPE: PixelType = PixelType::$tag;
            const CHANNELS: usize = 1;

            #[inline]
            fn channel(self, _c: usize) -> f64 {
                self as f64
            }

            #[inline]
            fn from_channels(values: &[f64]) -> Self {
                values[0] as $t
            }
        }
    )*};
}

impl_float_pixel!(f32 => Float, f64 => Double);

macro_rules! impl_byte_array_pixel {
    ($($n:literal => $tag:ident),* $(,)?) => {$(
        impl Pixel for [u8; $n] {
            const TYPE: PixelType = PixelType::$tag;
            const CHANNELS: usize = $n;

            #[inline]
            fn channel(self, c: usize) -> f64 {
                self[c] as f64
            }

            #[inline]
            fn from_channels(values: &[f64]) -> Self {
                let mut out = [0u8; $n];
                for (dst, v) in out.iter_mut().zip(values) {
                    *dst = v.round() as u8;
                }
                out
            }
        }
    )*};
}

impl_byte_array_pixel!(2 => GrayA8, 3 => Rgb8, 4 => Rgba8);

macro_rules! impl_complex_pixel {
    ($($t:ty => $tag:ident),* $(,)?) => {$(
        impl Pixel for Complex<$t> {
            const TYPE: PixelType = PixelType::$tag;
            const CHANNELS: usize = 2;

            #[inline]
            fn channel(self, c: usize) -> f64 {
                if c == 0 { self.re as f64 } else { self.im as f64 }
            }

            #[inline]
            fn from_channels(values: &[f64]) -> Self {
                Complex::new(values[0] as $t, values[1] as $t)
            }
        }
    )*};
}

impl_complex_pixel!(f32 => ComplexF, f64 => ComplexD);

// ============================================================================
// Pixel families
// ============================================================================

/// Unsigned integer gray levels.
pub trait GrayPixel: Pixel + PrimInt + Unsigned {
    const BITS: u32;

    fn widen(self) -> u64;

    /// Truncating conversion, keeps the low `BITS` bits.
    fn truncate(v: u64) -> Self;

    fn max_f64() -> f64 {
        Self::max_value().channel(0)
    }
}

macro_rules! impl_gray_pixel {
    ($($t:ty),*) => {$(
        impl GrayPixel for $t {
            const BITS: u32 = <$t>::BITS;

            #[inline]
            fn widen(self) -> u64 {
                self as u64
            }

            #[inline]
            fn truncate(v: u64) -> Self {
                v as $t
            }
        }
    )*};
}

impl_gray_pixel!(u8, u16, u32, u64);

/// Real valued pixels, nominally in `[0, 1]`.
pub trait FloatPixel: Pixel + FloatTrait {
    type Complex: ComplexPixel<Real = Self>;

    fn from_f64(v: f64) -> Self;
}

impl FloatPixel for f32 {
    type Complex = ComplexF;

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl FloatPixel for f64 {
    type Complex = ComplexD;

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
}

/// Complex pixels of either precision.
pub trait ComplexPixel: Pixel {
    type Real: FloatPixel<Complex = Self>;

    fn re(self) -> Self::Real;
    fn im(self) -> Self::Real;
    fn from_parts(re: Self::Real, im: Self::Real) -> Self;
    fn to_complex64(self) -> ComplexD;
    fn from_complex64(v: ComplexD) -> Self;
}

impl ComplexPixel for ComplexF {
    type Real = f32;

    fn re(self) -> f32 {
        self.re
    }

    fn im(self) -> f32 {
        self.im
    }

    fn from_parts(re: f32, im: f32) -> Self {
        Complex::new(re, im)
    }

    fn to_complex64(self) -> ComplexD {
        Complex::new(self.re as f64, self.im as f64)
    }

    fn from_complex64(v: ComplexD) -> Self {
        Complex::new(v.re as f32, v.im as f32)
    }
}

impl ComplexPixel for ComplexD {
    type Real = f64;

    fn re(self) -> f64 {
        self.re
    }

    fn im(self) -> f64 {
        self.im
    }

    fn from_parts(re: f64, im: f64) -> Self {
        Complex::new(re, im)
    }

    fn to_complex64(self) -> ComplexD {
        self
    }

    fn from_complex64(v: ComplexD) -> Self {
        v
    }
}

// ============================================================================
// Dispatch helper
// ============================================================================

/// Expand `$body` once per pixel type, with `$T` bound to the matching Rust
/// type inside each arm.
macro_rules! with_pixel_type {
    ($ty:expr, $T:ident => $body:expr) => {
        match $ty {
            $crate::image::PixelType::Gray8 => { type $T = $crate::image::Gray8; $body }
            $crate::image::PixelType::GrayA8 => { type $T = $crate::image::GrayA8; $body }
            $crate::image::PixelType::Gray16 => { type $T = $crate::image::Gray16; $body }
            $crate::image::PixelType::Gray32 => { type $T = $crate::image::Gray32; $body }
            $crate::image::PixelType::Gray64 => { type $T = $crate::image::Gray64; $body }
            $crate::image::PixelType::Float => { type $T = $crate::image::Float; $body }
            $crate::image::PixelType::Double => { type $T = $crate::image::Double; $body }
            $crate::image::PixelType::Rgb8 => { type $T = $crate::image::Rgb8; $body }
            $crate::image::PixelType::Rgba8 => { type $T = $crate::image::Rgba8; $body }
            $crate::image::PixelType::ComplexF => { type $T = $crate::image::ComplexF; $body }
            $crate::image::PixelType::ComplexD => { type $T = $crate::image::ComplexD; $body }
        }
    };
}

pub(crate) use with_pixel_type;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for t in PixelType::ALL {
            assert_eq!(t.name().parse::<PixelType>().unwrap(), t);
        }
        assert!("GRAY12".parse::<PixelType>().unwrap_err().is_unsupported());
    }

    #[test]
    fn test_sizes_match_rust_types() {
        for t in PixelType::ALL {
            let size = with_pixel_type!(t, P => std::mem::size_of::<P>());
            assert_eq!(size, t.size_of(), "{t}");
            let tag = with_pixel_type!(t, P => P::TYPE);
            assert_eq!(tag, t);
        }
    }

    #[test]
    fn test_from_channels_saturates() {
        assert_eq!(u8::from_channels(&[300.0]), 255);
        assert_eq!(u8::from_channels(&[-4.0]), 0);
        assert_eq!(u16::from_channels(&[2.5]), 3);
        assert_eq!(<[u8; 3]>::from_channels(&[1.4, 255.9, -1.0]), [1, 255, 0]);
    }

    #[test]
    fn test_complex_channels() {
        let c = ComplexF::new(1.5, -2.0);
        assert_eq!(c.channel(0), 1.5);
        assert_eq!(c.channel(1), -2.0);
        assert_eq!(ComplexD::from_channels(&[3.0, 4.0]), ComplexD::new(3.0, 4.0));
    }

    #[test]
    fn test_gray_truncation() {
        assert_eq!(u8::truncate(0x1234), 0x34);
        assert_eq!(u16::max_f64(), 65535.0);
    }
}
