//! Separable blur for N-dimensional images.
//!
//! The kernel is symmetric and stored as its right half: `right[0]` weighs the
//! centre sample, `right[i]` the two samples at distance `i`. Kernels are
//! normalised so `right[0] + 2 * sum(right[1..]) == 1`.
//!
//! ## Supported Types
//! Every pixel type. Multi-channel pixels are blurred per channel, complex
//! pixels per component. Sums are accumulated in `f64`; integer channels are
//! rounded and saturated on output.
//!
//! ## Boundary Conditions
//! - `zero`: taps outside the line contribute nothing
//! - `mirror`: taps reflect across the nearest edge (`-1 -> 0`, `n -> n-1`)
//! - `nearest`: taps clamp to the edge sample

use std::str::FromStr;

use super::single_input;
use crate::error::{Error, Result};
use crate::image::{LabeledArray, Pixel, RowProxy, RowProxyMut, TypedArray};
use crate::options::Options;
use crate::registry::{pixel_dispatch, Algorithm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundCondition {
    Zero,
    Mirror,
    Nearest,
}

impl FromStr for BoundCondition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zero" => Ok(Self::Zero),
            "mirror" => Ok(Self::Mirror),
            "nearest" => Ok(Self::Nearest),
            other => Err(Error::unsupported(format!("unknown boundary condition '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelShape {
    Box,
    Gauss,
}

impl FromStr for KernelShape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "box" => Ok(Self::Box),
            "gauss" => Ok(Self::Gauss),
            other => Err(Error::unsupported(format!("unknown blur filter '{other}'"))),
        }
    }
}

impl KernelShape {
    pub fn half_kernel(self, intensity: f64) -> Vec<f64> {
        match self {
            KernelShape::Box => box_kernel(intensity),
            KernelShape::Gauss => gaussian_kernel(intensity),
        }
    }
}

/// Uniform half kernel of odd full width `floor(intensity)` rounded down to odd.
pub fn box_kernel(intensity: f64) -> Vec<f64> {
    let width = intensity.max(0.0).floor() as usize / 2 * 2 + 1;
    let k = width / 2 + 1;
    vec![1.0 / (2 * k - 1) as f64; k]
}

/// Gaussian half kernel with `ceil(3 sigma) + 1` samples.
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    if sigma.abs() < 1e-9 {
        return vec![1.0];
    }
    let len = (3.0 * sigma.abs()).ceil() as usize + 1;
    let mut right: Vec<f64> = (0..len)
        .map(|i| (-((i * i) as f64) / (2.0 * sigma * sigma)).exp())
        .collect();
    let total = right[0] + 2.0 * right[1..].iter().sum::<f64>();
    for w in &mut right {
        *w /= total;
    }
    right
}

fn convolve_line<T: Pixel>(
    src: RowProxy<'_, T>,
    mut dst: RowProxyMut<'_, T>,
    right: &[f64],
    bound: BoundCondition,
) {
    let n = src.len() as isize;
    let channels = T::CHANNELS;
    for i in 0..n {
        let original = src.get(i as usize);
        let mut acc = [0.0f64; 4];
        let reach = right.len() as isize;
        for offset in (1 - reach)..reach {
            let weight = right[offset.unsigned_abs()];
            let pos = i + offset;
            let sample = if (0..n).contains(&pos) {
                src.get(pos as usize)
            } else {
                match bound {
                    BoundCondition::Zero => continue,
                    BoundCondition::Nearest => src.get(pos.clamp(0, n - 1) as usize),
                    BoundCondition::Mirror => {
                        let reflected = if pos < 0 { -pos - 1 } else { 2 * n - pos - 1 };
                        if (0..n).contains(&reflected) {
                            src.get(reflected as usize)
                        } else {
                            original
                        }
                    }
                }
            };
            for (c, a) in acc.iter_mut().enumerate().take(channels) {
                *a += weight * sample.channel(c);
            }
        }
        dst.set(i as usize, T::from_channels(&acc[..channels]));
    }
}

/// Blur along one axis into a new array.
pub fn blur_axis<T: Pixel>(
    image: &TypedArray<T>,
    axis: usize,
    right: &[f64],
    bound: BoundCondition,
) -> TypedArray<T> {
    image.transform_rows(axis, |src, dst| convolve_line(src, dst, right, bound))
}

/// Blur along each of `axes` in turn.
pub fn blur_axes<T: Pixel>(
    image: &TypedArray<T>,
    axes: &[usize],
    right: &[f64],
    bound: BoundCondition,
) -> TypedArray<T> {
    let mut out = image.deep_copy();
    for &axis in axes {
        out = blur_axis(&out, axis, right, bound);
    }
    out
}

/// Blur with a box or Gaussian kernel along every axis or a single one.
pub struct Blur;

impl Blur {
    pub fn apply<T: Pixel>(images: &[TypedArray<T>], options: &Options) -> Result<Vec<LabeledArray>> {
        let image = single_input(images)?;
        let intensity = options.get_double("intensity")?;
        let shape: KernelShape = options.get_text("filter")?.parse()?;
        let bound: BoundCondition = options.get_text("bound_condition")?.parse()?;

        let axes: Vec<usize> = if options.get_bool("one_dim")? {
            let axis = options.get_int("dim_idx")?;
            match usize::try_from(axis) {
                Ok(axis) if axis < image.rank() => vec![axis],
                _ => {
                    return Err(Error::unsupported(format!(
                        "dim_idx {axis} out of range for rank {}",
                        image.rank()
                    )))
                }
            }
        } else {
            (0..image.rank()).collect()
        };

        let right = shape.half_kernel(intensity);
        let out = blur_axes(image, &axes, &right, bound);
        Ok(vec![LabeledArray::unlabeled(out)])
    }
}

impl Algorithm for Blur {
    const NAME: &'static str = "blur";

    fn image_count_supported(count: usize) -> bool {
        count == 1
    }

    fn image_dims_supported(dims: &[usize]) -> bool {
        !dims.is_empty() && dims.iter().all(|&d| d > 0)
    }

    fn same_dims_required() -> bool {
        true
    }

    pixel_dispatch!(
        Gray8, GrayA8, Gray16, Gray32, Gray64, Float, Double, Rgb8, Rgba8, ComplexF, ComplexD
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ComplexD, PixelType};

    fn options(filter: &str, intensity: f64, bound: &str) -> Options {
        Options::new()
            .with("intensity", intensity)
            .with("filter", filter)
            .with("bound_condition", bound)
            .with("one_dim", false)
    }

    fn normalisation(right: &[f64]) -> f64 {
        right[0] + 2.0 * right[1..].iter().sum::<f64>()
    }

    #[test]
    fn test_kernels_are_normalised() {
        for sigma in [0.3, 1.0, 2.5, 7.0] {
            let k = gaussian_kernel(sigma);
            assert_eq!(k.len(), (3.0 * sigma).ceil() as usize + 1);
            assert!((normalisation(&k) - 1.0).abs() < 1e-9);
        }
        for intensity in [0.0, 1.0, 3.0, 4.9, 10.0] {
            assert!((normalisation(&box_kernel(intensity)) - 1.0).abs() < 1e-9);
        }
        assert_eq!(gaussian_kernel(0.0), vec![1.0]);
        assert_eq!(box_kernel(3.0), vec![1.0 / 3.0; 2]);
        assert_eq!(box_kernel(4.0).len(), 3);
    }

    #[test]
    fn test_constant_image_stays_constant() {
        let image = TypedArray::<f64>::from_vec(&[5, 4], vec![0.7; 20]);
        for bound in ["nearest", "mirror"] {
            let out = Blur::apply(&[image.clone()], &options("gauss", 1.5, bound)).unwrap();
            let values = out[0].image.typed::<f64>().to_vec();
            assert!(values.iter().all(|v| (v - 0.7).abs() < 1e-12), "{bound}");
        }
    }

    #[test]
    fn test_zero_boundary_darkens_edges() {
        let image = TypedArray::<f64>::from_vec(&[5], vec![1.0; 5]);
        let out = Blur::apply(&[image], &options("box", 3.0, "zero")).unwrap();
        let values = out[0].image.typed::<f64>().to_vec();
        assert!((values[0] - 2.0 / 3.0).abs() < 1e-12);
        assert!((values[2] - 1.0).abs() < 1e-12);
        assert!((values[4] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_box_blur_of_impulse() {
        let image = TypedArray::<u8>::from_vec(&[5], vec![0, 0, 90, 0, 0]);
        let out = Blur::apply(&[image.clone()], &options("box", 3.0, "zero")).unwrap();
        assert_eq!(out[0].image.typed::<u8>().to_vec(), vec![0, 30, 30, 30, 0]);
        assert_eq!(image.to_vec(), vec![0, 0, 90, 0, 0]);
    }

    #[test]
    fn test_mirror_reflects_edge_samples() {
        let image = TypedArray::<f64>::from_vec(&[3], vec![3.0, 0.0, 0.0]);
        let out = Blur::apply(&[image], &options("box", 3.0, "mirror")).unwrap();
        let values = out[0].image.typed::<f64>().to_vec();
        // left tap of sample 0 reflects onto sample 0 itself
        assert!((values[0] - 2.0).abs() < 1e-12);
        assert!((values[1] - 1.0).abs() < 1e-12);
        assert!(values[2].abs() < 1e-12);
    }

    #[test]
    fn test_one_dim_blurs_single_axis() {
        let image = TypedArray::<f64>::from_fn(&[3, 3], |c| if c[0] == 1 { 3.0 } else { 0.0 });
        let opts = options("box", 3.0, "zero").with("one_dim", true).with("dim_idx", 1);
        let out = Blur::apply(&[image.clone()], &opts).unwrap();
        let blurred = out[0].image.typed::<f64>();
        // columns are constant along axis 1 away from the edges, axis 0 untouched
        assert!((blurred.get(&[1, 1]) - 3.0).abs() < 1e-12);
        assert!(blurred.get(&[0, 1]).abs() < 1e-12);

        let bad = options("box", 3.0, "zero").with("one_dim", true).with("dim_idx", 2);
        assert!(Blur::apply(&[image], &bad).unwrap_err().is_unsupported());
    }

    #[test]
    fn test_multichannel_and_complex() {
        let rgb = TypedArray::<[u8; 3]>::from_vec(&[3], vec![[0, 30, 60], [90, 30, 60], [0, 30, 60]]);
        let out = Blur::apply(&[rgb], &options("box", 3.0, "nearest")).unwrap();
        assert_eq!(out[0].image.pixel_type(), PixelType::Rgb8);
        assert_eq!(out[0].image.typed::<[u8; 3]>().get(&[1]), [30, 30, 60]);

        let c = TypedArray::<ComplexD>::from_vec(&[3], vec![ComplexD::new(0.0, 3.0); 3]);
        let out = Blur::apply(&[c], &options("gauss", 1.0, "nearest")).unwrap();
        let v = out[0].image.typed::<ComplexD>().get(&[0]);
        assert!((v.im - 3.0).abs() < 1e-12 && v.re.abs() < 1e-12);
    }

    #[test]
    fn test_unknown_filter_is_unsupported() {
        let image = TypedArray::<u8>::new(&[3]);
        let err = Blur::apply(&[image], &options("median", 3.0, "zero")).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_dims_predicate() {
        assert!(Blur::image_dims_supported(&[3, 1]));
        assert!(!Blur::image_dims_supported(&[]));
        assert!(!Blur::image_dims_supported(&[3, 0]));
    }
}
