//! Pixel type conversion graph.
//!
//! Any type converts to any other by routing through three hubs:
//! - **gray**: integer depths rescale by bit shifting, floats scale by the
//!   maximum gray value,
//! - **GRAY8**: colour and alpha types reduce to or expand from it,
//! - **float**: complex types enter and leave through their real precision.
//!
//! ## Conversion Rules
//! - gray -> gray: shift by the depth difference, or a truncating cast when
//!   rescaling is off
//! - float -> gray: `round(f * max)`, gray -> float: `g / max`; without
//!   rescaling both are plain saturating casts
//! - GRAYA8 -> gray: alpha composite on the gray background
//! - RGB8 -> gray: `round(r*wr + g*wg + b*wb)`
//! - RGBA8 -> RGB8: per channel composite on the RGB background
//! - RGBA8 -> GRAYA8: weighted gray, alpha kept
//! - GRAYA8 -> RGB8: composite on the gray background, then replicate
//! - real -> complex: `(v, 0)` at the complex's precision
//! - complex -> real: real part, then as from the matching float type

use tracing::trace;

use crate::error::{Error, Result};
use crate::image::{
    ComplexD, ComplexF, ComplexPixel, ErasedArray, FloatPixel, GrayA8,
    GrayPixel, Pixel, PixelType, Rgb8, Rgba8, TypedArray,
};
use crate::options::Options;

/// Parameters steering lossy conversions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionParams {
    /// Rescale between gray depths instead of truncating.
    pub rescale: bool,
    pub gray_bg: u8,
    pub rgb_bg: [u8; 3],
    /// Red, green, blue weights for RGB -> gray.
    pub weights: [f64; 3],
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self {
            rescale: true,
            gray_bg: 255,
            rgb_bg: [255, 255, 255],
            weights: [0.299, 0.587, 0.114],
        }
    }
}

impl ConversionParams {
    /// Read the `rescale`, `*_bg` and `*_mult` options.
    pub fn from_options(options: &Options) -> Result<Self> {
        let byte = |key: &str| -> Result<u8> {
            let v = options.get_int(key)?;
            u8::try_from(v)
                .map_err(|_| Error::unsupported(format!("option '{key}' must be in 0..=255")))
        };
        Ok(Self {
            rescale: options.get_bool("rescale")?,
            gray_bg: byte("gray_bg")?,
            rgb_bg: [byte("red_bg")?, byte("green_bg")?, byte("blue_bg")?],
            weights: [
                options.get_double("red_mult")?,
                options.get_double("green_mult")?,
                options.get_double("blue_mult")?,
            ],
        })
    }
}

// ============================================================================
// Scalar hub
// ============================================================================

/// A single-channel sample in its widest lossless form.
#[derive(Debug, Clone, Copy)]
pub enum Scalar {
    Int { value: u64, bits: u32 },
    Real(f64),
}

/// Single-channel pixel types: the integer grays and the two floats.
pub trait ScalarPixel: Pixel {
    fn to_scalar(self) -> Scalar;
    fn from_scalar(s: Scalar, rescale: bool) -> Self;
}

fn gray_max(bits: u32) -> f64 {
    if bits >= 64 {
        u64::MAX as f64
    } else {
        ((1u64 << bits) - 1) as f64
    }
}

macro_rules! impl_scalar_gray {
    ($($t:ty),*) => {$(
        impl ScalarPixel for $t {
            fn to_scalar(self) -> Scalar {
                Scalar::Int { value: self.widen(), bits: <$t as GrayPixel>::BITS }
            }

            fn from_scalar(s: Scalar, rescale: bool) -> Self {
                match s {
                    Scalar::Int { value, bits } if rescale => {
                        let own = <$t as GrayPixel>::BITS;
                        if bits > own {
                            Self::truncate(value >> (bits - own))
                        } else {
                            Self::truncate(value << (own - bits))
                        }
                    }
                    Scalar::Int { value, .. } => Self::truncate(value),
                    Scalar::Real(v) if rescale => Self::from_channels(&[v * Self::max_f64()]),
                    // saturating, truncates toward zero
                    Scalar::Real(v) => v as $t,
                }
            }
        }
    )*};
}

impl_scalar_gray!(u8, u16, u32, u64);

macro_rules! impl_scalar_float {
    ($($t:ty),*) => {$(
        impl ScalarPixel for $t {
            fn to_scalar(self) -> Scalar {
                Scalar::Real(self as f64)
            }

            fn from_scalar(s: Scalar, rescale: bool) -> Self {
                match s {
                    Scalar::Int { value, bits } if rescale => {
                        <$t>::from_f64(value as f64 / gray_max(bits))
                    }
                    Scalar::Int { value, .. } => <$t>::from_f64(value as f64),
                    Scalar::Real(v) => <$t>::from_f64(v),
                }
            }
        }
    )*};
}

impl_scalar_float!(f32, f64);

/// Like `with_pixel_type!` restricted to the scalar types; any other type
/// evaluates `$other`.
macro_rules! with_scalar_type {
    ($ty:expr, $T:ident => $body:expr, _ => $other:expr) => {
        match $ty {
            PixelType::Gray8 => { type $T = u8; $body }
            PixelType::Gray16 => { type $T = u16; $body }
            PixelType::Gray32 => { type $T = u32; $body }
            PixelType::Gray64 => { type $T = u64; $body }
            PixelType::Float => { type $T = f32; $body }
            PixelType::Double => { type $T = f64; $body }
            _ => $other,
        }
    };
}

pub fn scalar_to_scalar<S: ScalarPixel, D: ScalarPixel>(
    src: &TypedArray<S>,
    rescale: bool,
) -> TypedArray<D> {
    src.map(move |v| D::from_scalar(v.to_scalar(), rescale))
}

// ============================================================================
// Colour hub (GRAY8)
// ============================================================================

pub fn graya_to_gray8(src: &TypedArray<GrayA8>, bg: u8) -> TypedArray<u8> {
    src.map(move |[g, a]| {
        let alpha = a as f64 / 255.0;
        (g as f64 * alpha + bg as f64 * (1.0 - alpha)).round() as u8
    })
}

pub fn rgb_to_gray8(src: &TypedArray<Rgb8>, weights: [f64; 3]) -> TypedArray<u8> {
    src.map(move |[r, g, b]| {
        u8::from_channels(&[r as f64 * weights[0] + g as f64 * weights[1] + b as f64 * weights[2]])
    })
}

/// Weighted gray of the colour channels, alpha kept as is.
pub fn rgba_to_graya(src: &TypedArray<Rgba8>, weights: [f64; 3]) -> TypedArray<GrayA8> {
    src.map(move |[r, g, b, a]| {
        let gray = u8::from_channels(&[r as f64 * weights[0] + g as f64 * weights[1] + b as f64 * weights[2]]);
        [gray, a]
    })
}

pub fn rgba_to_rgb(src: &TypedArray<Rgba8>, bg: [u8; 3]) -> TypedArray<Rgb8> {
    src.map(move |[r, g, b, a]| {
        let alpha = a as f64 / 255.0;
        let blend = |c: u8, bg: u8| (c as f64 * alpha + bg as f64 * (1.0 - alpha)).round() as u8;
        [blend(r, bg[0]), blend(g, bg[1]), blend(b, bg[2])]
    })
}

fn expand_gray8(src: &TypedArray<u8>, target: PixelType) -> Result<ErasedArray> {
    Ok(match target {
        PixelType::GrayA8 => src.map(|g| [g, 255]).erase(),
        PixelType::Rgb8 => src.map(|g| [g, g, g]).erase(),
        PixelType::Rgba8 => src.map(|g| [g, g, g, 255]).erase(),
        other => return Err(Error::unsupported(format!("GRAY8 does not expand to {other}"))),
    })
}

// ============================================================================
// Complex hub
// ============================================================================

fn complex_to_real<C: ComplexPixel>(src: &TypedArray<C>) -> ErasedArray {
    src.map(|c| c.re()).erase()
}

fn real_to_complex<F: FloatPixel>(src: &TypedArray<F>) -> ErasedArray {
    src.map(|v| F::Complex::from_parts(v, F::zero())).erase()
}

fn complex_to_complex<S: ComplexPixel, D: ComplexPixel>(src: &TypedArray<S>) -> ErasedArray {
    src.map(|c| D::from_complex64(c.to_complex64())).erase()
}

fn complex_precision(t: PixelType) -> PixelType {
    if t == PixelType::ComplexF {
        PixelType::Float
    } else {
        PixelType::Double
    }
}

// ============================================================================
// Router
// ============================================================================

/// Convert `src` to `target`.
///
/// Converting to the array's own type returns a shallow clone of it.
pub fn convert(src: &ErasedArray, target: PixelType, params: &ConversionParams) -> Result<ErasedArray> {
    let from = src.pixel_type();
    if from == target {
        return Ok(src.clone());
    }
    trace!(%from, %target, "converting");

    match (from, target) {
        (PixelType::ComplexF, PixelType::ComplexD) => {
            Ok(complex_to_complex::<ComplexF, ComplexD>(&src.typed()))
        }
        (PixelType::ComplexD, PixelType::ComplexF) => {
            Ok(complex_to_complex::<ComplexD, ComplexF>(&src.typed()))
        }
        (PixelType::ComplexF, _) => convert(&complex_to_real::<ComplexF>(&src.typed()), target, params),
        (PixelType::ComplexD, _) => convert(&complex_to_real::<ComplexD>(&src.typed()), target, params),
        (_, PixelType::ComplexF | PixelType::ComplexD) => {
            let real = convert(src, complex_precision(target), params)?;
            Ok(if target == PixelType::ComplexF {
                real_to_complex::<f32>(&real.typed())
            } else {
                real_to_complex::<f64>(&real.typed())
            })
        }
        (PixelType::Rgba8, PixelType::Rgb8) => Ok(rgba_to_rgb(&src.typed(), params.rgb_bg).erase()),
        (PixelType::Rgba8, PixelType::GrayA8) => Ok(rgba_to_graya(&src.typed(), params.weights).erase()),
        (PixelType::Rgba8, _) => {
            let rgb = rgba_to_rgb(&src.typed(), params.rgb_bg).erase();
            convert(&rgb, target, params)
        }
        (PixelType::Rgb8, PixelType::Rgba8) => {
            Ok(src.typed::<Rgb8>().map(|[r, g, b]| [r, g, b, 255]).erase())
        }
        (PixelType::Rgb8, _) => {
            let gray = rgb_to_gray8(&src.typed(), params.weights).erase();
            convert(&gray, target, params)
        }
        (PixelType::GrayA8, PixelType::Rgba8) => {
            Ok(src.typed::<GrayA8>().map(|[g, a]| [g, g, g, a]).erase())
        }
        (PixelType::GrayA8, PixelType::Rgb8) => {
            let gray = graya_to_gray8(&src.typed(), params.gray_bg);
            expand_gray8(&gray, target)
        }
        (PixelType::GrayA8, _) => {
            let gray = graya_to_gray8(&src.typed(), params.gray_bg).erase();
            convert(&gray, target, params)
        }
        (_, PixelType::GrayA8 | PixelType::Rgb8 | PixelType::Rgba8) => {
            let gray = convert(src, PixelType::Gray8, params)?;
            expand_gray8(&gray.typed(), target)
        }
        _ => with_scalar_type!(from, S => {
            let typed = src.typed::<S>();
            with_scalar_type!(target, D => {
                Ok(scalar_to_scalar::<S, D>(&typed, params.rescale).erase())
            }, _ => Err(Error::unsupported(format!("no conversion from {from} to {target}"))))
        }, _ => Err(Error::unsupported(format!("no conversion from {from} to {target}")))),
    }
}

/// Convert a typed array into another statically known type.
pub fn convert_typed<S: Pixel, D: Pixel>(
    src: &TypedArray<S>,
    params: &ConversionParams,
) -> Result<TypedArray<D>> {
    let erased = convert(&src.clone().erase(), D::TYPE, params)?;
    Ok(erased.typed())
}
