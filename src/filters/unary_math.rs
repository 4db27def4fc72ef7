//! Pointwise math on single-channel and complex images.
//!
//! ## Functions
//! - `identity`: the input itself
//! - `linear_stretch`: map the observed `[min, max]` onto `[0, 1]` (floats) or
//!   `[0, type max]` (integers); complex input is returned as is
//! - `abs`: absolute value; unsigned input is returned as is, complex input
//!   yields the magnitude as `FLOAT`/`DOUBLE`
//! - `negative`: `max - x` with `max = 1.0` for floats; complex input is
//!   returned as is

use super::single_input;
use crate::error::{Error, Result};
use crate::image::{ComplexD, ComplexF, ErasedArray, LabeledArray, Pixel, TypedArray};
use crate::options::Options;
use crate::registry::{pixel_dispatch, Algorithm};

pub trait UnaryPixel: Pixel {
    /// Upper end of the nominal value range, `None` for complex types.
    const NOMINAL_MAX: Option<f64>;

    fn negative(self) -> Self;

    /// Absolute value image, `None` when it equals the input.
    fn abs_image(image: &TypedArray<Self>) -> Option<ErasedArray>;
}

macro_rules! impl_unary_gray {
    ($($t:ty),*) => {$(
        impl UnaryPixel for $t {
            const NOMINAL_MAX: Option<f64> = Some(<$t>::MAX as f64);

            fn negative(self) -> Self {
                <$t>::MAX - self
            }

            fn abs_image(_image: &TypedArray<Self>) -> Option<ErasedArray> {
                None
            }
        }
    )*};
}

impl_unary_gray!(u8, u16, u32, u64);

macro_rules! impl_unary_float {
    ($($t:ty),*) => {$(
        impl UnaryPixel for $t {
            const NOMINAL_MAX: Option<f64> = Some(1.0);

            fn negative(self) -> Self {
                1.0 - self
            }

            fn abs_image(image: &TypedArray<Self>) -> Option<ErasedArray> {
                Some(image.map(<$t>::abs).erase())
            }
        }
    )*};
}

impl_unary_float!(f32, f64);

macro_rules! impl_unary_complex {
    ($($t:ty),*) => {$(
        impl UnaryPixel for $t {
            const NOMINAL_MAX: Option<f64> = None;

            fn negative(self) -> Self {
                self
            }

            fn abs_image(image: &TypedArray<Self>) -> Option<ErasedArray> {
                Some(image.map(|c| c.norm()).erase())
            }
        }
    )*};
}

impl_unary_complex!(ComplexF, ComplexD);

/// Affine map of `[min, max]` onto `[0, top]`.
///
/// A constant image has no range to stretch and comes back as an unchanged
/// copy.
pub fn linear_stretch<T: Pixel>(image: &TypedArray<T>, top: f64) -> TypedArray<T> {
    let (lo, hi) = image
        .read()
        .iter()
        .map(|p| p.channel(0))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(hi > lo) {
        return image.deep_copy();
    }
    let scale = top / (hi - lo);
    image.map(move |p| T::from_channels(&[(p.channel(0) - lo) * scale]))
}

/// Identity, linear stretch, absolute value or negative.
pub struct UnaryMath;

impl UnaryMath {
    pub fn apply<T: UnaryPixel>(images: &[TypedArray<T>], options: &Options) -> Result<Vec<LabeledArray>> {
        let image = single_input(images)?;
        let unchanged = || image.clone().erase();

        let out = match options.get_text("function")? {
            "identity" => unchanged(),
            "linear_stretch" => match T::NOMINAL_MAX {
                Some(top) => linear_stretch(image, top).erase(),
                None => unchanged(),
            },
            "abs" => T::abs_image(image).unwrap_or_else(unchanged),
            "negative" => match T::NOMINAL_MAX {
                Some(_) => image.map(T::negative).erase(),
                None => unchanged(),
            },
            other => return Err(Error::unsupported(format!("unknown function '{other}'"))),
        };
        Ok(vec![LabeledArray::unlabeled(out)])
    }
}

impl Algorithm for UnaryMath {
    const NAME: &'static str = "unary_math";

    fn image_count_supported(count: usize) -> bool {
        count == 1
    }

    fn image_dims_supported(dims: &[usize]) -> bool {
        !dims.is_empty() && dims.iter().all(|&d| d > 0)
    }

    fn same_dims_required() -> bool {
        true
    }

    pixel_dispatch!(Gray8, Gray16, Gray32, Gray64, Float, Double, ComplexF, ComplexD);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::PixelType;

    fn run<T: UnaryPixel>(image: &TypedArray<T>, function: &str) -> ErasedArray {
        let options = Options::new().with("function", function);
        UnaryMath::apply(&[image.clone()], &options).unwrap().remove(0).image
    }

    #[test]
    fn test_identity_aliases_input() {
        let image = TypedArray::<u8>::from_vec(&[3], vec![1, 2, 3]);
        let out = run(&image, "identity");
        assert!(out.typed::<u8>().shares_buffer_with(&image));
    }

    #[test]
    fn test_linear_stretch_integers() {
        let image = TypedArray::<u8>::from_vec(&[3], vec![10, 20, 30]);
        let out = run(&image, "linear_stretch").typed::<u8>().to_vec();
        assert_eq!(out, vec![0, 128, 255]);
    }

    #[test]
    fn test_linear_stretch_floats() {
        let image = TypedArray::<f64>::from_vec(&[3], vec![-2.0, 0.0, 2.0]);
        let out = run(&image, "linear_stretch").typed::<f64>().to_vec();
        assert_eq!(out, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_linear_stretch_constant_is_copy() {
        let image = TypedArray::<u16>::from_vec(&[2], vec![7, 7]);
        let out = run(&image, "linear_stretch").typed::<u16>();
        assert_eq!(out.to_vec(), vec![7, 7]);
        assert!(!out.shares_buffer_with(&image));
    }

    #[test]
    fn test_abs() {
        let floats = TypedArray::<f32>::from_vec(&[2], vec![-0.5, 0.25]);
        assert_eq!(run(&floats, "abs").typed::<f32>().to_vec(), vec![0.5, 0.25]);

        let gray = TypedArray::<u32>::from_vec(&[1], vec![5]);
        assert!(run(&gray, "abs").typed::<u32>().shares_buffer_with(&gray));

        let complex = TypedArray::<ComplexD>::from_vec(&[1], vec![ComplexD::new(3.0, -4.0)]);
        let magnitude = run(&complex, "abs");
        assert_eq!(magnitude.pixel_type(), PixelType::Double);
        assert_eq!(magnitude.typed::<f64>().to_vec(), vec![5.0]);

        let complex = TypedArray::<ComplexF>::from_vec(&[1], vec![ComplexF::new(0.0, 2.0)]);
        assert_eq!(run(&complex, "abs").pixel_type(), PixelType::Float);
    }

    #[test]
    fn test_negative() {
        let gray = TypedArray::<u8>::from_vec(&[2], vec![0, 200]);
        assert_eq!(run(&gray, "negative").typed::<u8>().to_vec(), vec![255, 55]);
        let floats = TypedArray::<f64>::from_vec(&[1], vec![0.25]);
        assert_eq!(run(&floats, "negative").typed::<f64>().to_vec(), vec![0.75]);
        let complex = TypedArray::<ComplexF>::from_vec(&[1], vec![ComplexF::new(1.0, 1.0)]);
        assert!(run(&complex, "negative").typed::<ComplexF>().shares_buffer_with(&complex));
    }

    #[test]
    fn test_unknown_function() {
        let image = TypedArray::<u8>::new(&[1]);
        let options = Options::new().with("function", "sqrt");
        assert!(UnaryMath::apply(&[image], &options).unwrap_err().is_unsupported());
    }
}
