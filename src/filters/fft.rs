//! FFT pipeline: conversion to complex, optional centring and normalisation.
//!
//! ## Supported Types
//! - `FLOAT`, `COMPLEX_F`: output is `FLOAT` or `COMPLEX_F`
//! - `DOUBLE`, `COMPLEX_D`: output is `DOUBLE` or `COMPLEX_D`
//!
//! The output is real when every imaginary part is within [`REAL_EPSILON`] of
//! zero, complex otherwise.

use num_complex::Complex64;
use tracing::debug;

use super::convert::{convert, ConversionParams};
use super::fourier::{fft_nd, Direction};
use super::single_input;
use crate::error::{Error, Result};
use crate::image::{ComplexD, ComplexF, LabeledArray, Pixel, PixelType, TypedArray};
use crate::options::Options;
use crate::registry::{pixel_dispatch, Algorithm};

/// Largest imaginary magnitude still treated as zero.
pub const REAL_EPSILON: f64 = 1e-6;

/// Pixel types the transform accepts, with the output types of their precision.
pub trait SpectralPixel: Pixel {
    const REAL: PixelType;
    const COMPLEX: PixelType;

    fn to_complex64(self) -> Complex64;
}

impl SpectralPixel for f32 {
    const REAL: PixelType = PixelType::Float;
    const COMPLEX: PixelType = PixelType::ComplexF;

    fn to_complex64(self) -> Complex64 {
        Complex64::new(self as f64, 0.0)
    }
}

impl SpectralPixel for f64 {
    const REAL: PixelType = PixelType::Double;
    const COMPLEX: PixelType = PixelType::ComplexD;

    fn to_complex64(self) -> Complex64 {
        Complex64::new(self, 0.0)
    }
}

impl SpectralPixel for ComplexF {
    const REAL: PixelType = PixelType::Float;
    const COMPLEX: PixelType = PixelType::ComplexF;

    fn to_complex64(self) -> Complex64 {
        Complex64::new(self.re as f64, self.im as f64)
    }
}

impl SpectralPixel for ComplexD {
    const REAL: PixelType = PixelType::Double;
    const COMPLEX: PixelType = PixelType::ComplexD;

    fn to_complex64(self) -> Complex64 {
        self
    }
}

/// Move index 0 of every axis to its midpoint.
pub fn fft_shift(image: &TypedArray<Complex64>) {
    for axis in 0..image.rank() {
        let half = image.shape()[axis] / 2;
        image.for_each_row_mut(axis, |mut row| row.rotate_right(half));
    }
}

/// Undo [`fft_shift`]: move every axis midpoint back to index 0.
pub fn ifft_shift(image: &TypedArray<Complex64>) {
    for axis in 0..image.rank() {
        let half = image.shape()[axis] / 2;
        image.for_each_row_mut(axis, |mut row| row.rotate_left(half));
    }
}

/// Run the full pipeline on one image, returning a fresh complex array.
pub fn transform<T: SpectralPixel>(
    image: &TypedArray<T>,
    direction: Direction,
    shift: bool,
    normalize: bool,
) -> TypedArray<Complex64> {
    let spectrum = image.map(T::to_complex64);
    if shift && direction == Direction::Backward {
        ifft_shift(&spectrum);
    }
    fft_nd(&spectrum, direction);
    if normalize {
        let scale = 1.0 / (spectrum.len() as f64).sqrt();
        for v in spectrum.write().iter_mut() {
            *v *= scale;
        }
    }
    if shift && direction == Direction::Forward {
        fft_shift(&spectrum);
    }
    spectrum
}

pub fn is_effectively_real(values: &[Complex64]) -> bool {
    values.iter().all(|v| v.im.abs() < REAL_EPSILON)
}

/// Forward or backward N-dimensional FFT.
pub struct Fft;

impl Fft {
    pub fn apply<T: SpectralPixel>(images: &[TypedArray<T>], options: &Options) -> Result<Vec<LabeledArray>> {
        let image = single_input(images)?;
        let direction = match options.get_text("direction")? {
            "forward" => Direction::Forward,
            "backward" => Direction::Backward,
            other => return Err(Error::unsupported(format!("unknown FFT direction '{other}'"))),
        };
        let shift = options.get_bool("shift")?;
        let normalize = options.get_bool("normalize")?;

        let spectrum = transform(image, direction, shift, normalize);
        let target = if is_effectively_real(&spectrum.read()) {
            T::REAL
        } else {
            T::COMPLEX
        };
        debug!(?direction, %target, "fft done");
        let out = convert(&spectrum.erase(), target, &ConversionParams::default())?;
        Ok(vec![LabeledArray::unlabeled(out)])
    }
}

impl Algorithm for Fft {
    const NAME: &'static str = "fft";

    fn image_count_supported(count: usize) -> bool {
        count == 1
    }

    fn image_dims_supported(dims: &[usize]) -> bool {
        !dims.is_empty()
    }

    fn same_dims_required() -> bool {
        true
    }

    pixel_dispatch!(Float, Double, ComplexF, ComplexD);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(direction: &str, shift: bool, normalize: bool) -> Options {
        Options::new()
            .with("direction", direction)
            .with("shift", shift)
            .with("normalize", normalize)
    }

    #[test]
    fn test_round_trip_with_normalisation() {
        let input: Vec<f64> = (1..=8).map(f64::from).collect();
        let image = TypedArray::<f64>::from_vec(&[8], input.clone());
        let forward = Fft::apply(&[image], &options("forward", false, true)).unwrap();
        assert_eq!(forward[0].image.pixel_type(), PixelType::ComplexD);

        let spectrum = forward[0].image.typed::<ComplexD>();
        let back = Fft::apply(&[spectrum], &options("backward", false, true)).unwrap();
        assert_eq!(back[0].image.pixel_type(), PixelType::Double);
        for (a, e) in back[0].image.typed::<f64>().to_vec().iter().zip(&input) {
            assert!((a - e).abs() < 1e-9);
        }
    }

    #[test]
    fn test_round_trip_with_shift_2d() {
        let image = TypedArray::<f64>::from_fn(&[5, 4], |c| (c[0] * 3 + c[1] * c[1]) as f64);
        let forward = Fft::apply(&[image.clone()], &options("forward", true, true)).unwrap();
        let spectrum = forward[0].image.typed::<ComplexD>();
        let back = Fft::apply(&[spectrum], &options("backward", true, true)).unwrap();
        let restored = back[0].image.typed::<f64>().to_vec();
        for (a, e) in restored.iter().zip(image.to_vec()) {
            assert!((a - e).abs() < 1e-9);
        }
    }

    #[test]
    fn test_shift_centres_dc() {
        let image = TypedArray::<f32>::from_vec(&[4], vec![1.0; 4]);
        let out = Fft::apply(&[image], &options("forward", true, false)).unwrap();
        assert_eq!(out[0].image.pixel_type(), PixelType::Float);
        let values = out[0].image.typed::<f32>().to_vec();
        assert_eq!(values, vec![0.0, 0.0, 4.0, 0.0]);
    }

    #[test]
    fn test_input_is_not_modified() {
        let spectrum = TypedArray::<ComplexD>::from_vec(&[2], vec![ComplexD::new(1.0, 1.0); 2]);
        Fft::apply(&[spectrum.clone()], &options("forward", false, false)).unwrap();
        assert_eq!(spectrum.get(&[1]), ComplexD::new(1.0, 1.0));
    }

    #[test]
    fn test_bad_direction() {
        let image = TypedArray::<f64>::new(&[2]);
        let err = Fft::apply(&[image], &options("sideways", false, false)).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_shift_helpers_are_inverse() {
        let image = TypedArray::<Complex64>::from_fn(&[3, 4], |c| Complex64::new((c[0] + 5 * c[1]) as f64, 0.0));
        let before = image.to_vec();
        fft_shift(&image);
        assert_ne!(image.to_vec(), before);
        ifft_shift(&image);
        assert_eq!(image.to_vec(), before);
    }
}
