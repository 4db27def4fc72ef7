//! Resize with optional antialiasing.
//!
//! ## Target Size
//! `scale_factor` multiplies every axis (`max(1, round(dim * factor))`) unless
//! `exact_res` lists the target extents, e.g. `"640,480"`. A `0` entry means
//! "keep the aspect ratio of the single non-zero entry".
//!
//! ## Antialiasing
//! Applied to the source on every axis that shrinks.
//! - `fast`: Gaussian blur with `sigma = (source/target - 1) / 2` and mirror
//!   boundaries
//! - `clever`: per-channel spectral low-pass, frequencies above the target's
//!   Nyquist band are zeroed
//!
//! ## Interpolation
//! `nearest neighbour`: target coordinate `c` samples `floor(c * source / target)`.

use ndarray::{ArrayD, Dimension, IxDyn, ShapeBuilder};
use num_complex::Complex64;
use tracing::debug;

use super::blur::{blur_axis, gaussian_kernel, BoundCondition};
use super::fourier::{fft_nd, Direction};
use super::single_input;
use crate::error::{Error, Result};
use crate::image::{LabeledArray, Pixel, TypedArray};
use crate::options::Options;
use crate::registry::{pixel_dispatch, Algorithm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntiAliasing {
    None,
    Fast,
    Clever,
}

impl std::str::FromStr for AntiAliasing {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "fast" => Ok(Self::Fast),
            "clever" => Ok(Self::Clever),
            other => Err(Error::unsupported(format!("unknown anti-aliasing '{other}'"))),
        }
    }
}

fn scale_dims(dims: &[usize], factor: f64) -> Vec<usize> {
    dims.iter()
        .map(|&d| ((d as f64 * factor).round() as usize).max(1))
        .collect()
}

/// Target extents from `scale_factor` or an explicit `exact_res` list.
pub fn target_dims(dims: &[usize], factor: f64, exact_res: &str) -> Result<Vec<usize>> {
    if exact_res.trim() == "auto" {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(Error::unsupported(format!("invalid scale factor {factor}")));
        }
        return Ok(scale_dims(dims, factor));
    }

    let requested = exact_res
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| Error::unsupported(format!("invalid resolution entry '{part}'")))
        })
        .collect::<Result<Vec<_>>>()?;
    if requested.len() != dims.len() {
        return Err(Error::unsupported(format!(
            "resolution '{exact_res}' has {} entries for a rank {} image",
            requested.len(),
            dims.len()
        )));
    }

    let nonzero: Vec<usize> = (0..requested.len()).filter(|&i| requested[i] != 0).collect();
    if nonzero.len() == requested.len() {
        return Ok(requested);
    }
    match nonzero.as_slice() {
        [axis] => {
            let ratio = requested[*axis] as f64 / dims[*axis] as f64;
            let mut out = scale_dims(dims, ratio);
            out[*axis] = requested[*axis];
            Ok(out)
        }
        _ => Err(Error::unsupported(format!(
            "resolution '{exact_res}' needs exactly one non-zero entry to keep the aspect ratio"
        ))),
    }
}

/// Gaussian prefilter on every shrinking axis.
pub fn fast_antialias<T: Pixel>(image: &TypedArray<T>, target: &[usize]) -> TypedArray<T> {
    let mut out = image.clone();
    for (axis, (&s, &t)) in image.shape().iter().zip(target).enumerate() {
        if t >= s {
            continue;
        }
        let sigma = (s as f64 / t as f64 - 1.0) / 2.0;
        out = blur_axis(&out, axis, &gaussian_kernel(sigma), BoundCondition::Mirror);
    }
    out
}

/// Spectral low-pass keeping `|k| <= (target - 1) / 2` on every shrinking axis.
pub fn clever_antialias<T: Pixel>(image: &TypedArray<T>, target: &[usize]) -> TypedArray<T> {
    let shape = image.shape().to_vec();
    // per shrinking axis: the highest kept frequency
    let bands: Vec<Option<usize>> = shape
        .iter()
        .zip(target)
        .map(|(&s, &t)| (t < s).then(|| (t.saturating_sub(1)) / 2))
        .collect();
    if bands.iter().all(Option::is_none) {
        return image.clone();
    }

    let total = image.len() as f64;
    let channels: Vec<Vec<f64>> = (0..T::CHANNELS)
        .map(|c| {
            let spectrum = image.map(move |p| Complex64::new(p.channel(c), 0.0));
            fft_nd(&spectrum, Direction::Forward);
            let filtered = spectrum.map_with_coords(|v, coords| {
                let outside = coords.iter().zip(&shape).zip(&bands).any(|((&k, &n), band)| {
                    band.is_some_and(|h| k > h && k < n - h)
                });
                if outside {
                    Complex64::new(0.0, 0.0)
                } else {
                    v
                }
            });
            fft_nd(&filtered, Direction::Backward);
            let values: Vec<f64> = filtered.read().iter().map(|v| v.re / total).collect();
            values
        })
        .collect();

    let data = (0..image.len())
        .map(|i| {
            let mut sample = [0.0f64; 4];
            for (c, values) in channels.iter().enumerate() {
                sample[c] = values[i];
            }
            T::from_channels(&sample[..T::CHANNELS])
        })
        .collect();
    TypedArray::from_vec(&shape, data)
}

/// Nearest neighbour resampling onto `target`.
pub fn nearest_neighbour<T: Pixel>(image: &TypedArray<T>, target: &[usize]) -> TypedArray<T> {
    let maps: Vec<Vec<usize>> = image
        .shape()
        .iter()
        .zip(target)
        .map(|(&s, &t)| {
            (0..t)
                .map(|c| ((c as f64 * s as f64 / t as f64).floor() as usize).min(s - 1))
                .collect()
        })
        .collect();

    let source = image.to_ndarray();
    let resized = ArrayD::from_shape_fn(IxDyn(target).f(), |index| {
        let coords: Vec<usize> = index
            .slice()
            .iter()
            .zip(&maps)
            .map(|(&c, map)| map[c])
            .collect();
        source[coords.as_slice()]
    });
    TypedArray::from_ndarray(&resized)
}

/// Resize to a scale factor or exact resolution.
pub struct Resize;

impl Resize {
    pub fn apply<T: Pixel>(images: &[TypedArray<T>], options: &Options) -> Result<Vec<LabeledArray>> {
        let image = single_input(images)?;
        let target = target_dims(
            image.shape(),
            options.get_double("scale_factor")?,
            options.get_text("exact_res")?,
        )?;
        let antialiasing: AntiAliasing = options.get_text("anti_aliasing")?.parse()?;
        let interpolation = options.get_text("interpolation")?;
        if interpolation != "nearest neighbour" {
            return Err(Error::unsupported(format!("unknown interpolation '{interpolation}'")));
        }
        debug!(from = ?image.shape(), to = ?target, ?antialiasing, "resizing");

        let filtered = match antialiasing {
            AntiAliasing::None => image.clone(),
            AntiAliasing::Fast => fast_antialias(image, &target),
            AntiAliasing::Clever => clever_antialias(image, &target),
        };
        let out = nearest_neighbour(&filtered, &target);
        Ok(vec![LabeledArray::unlabeled(out)])
    }
}

impl Algorithm for Resize {
    const NAME: &'static str = "resize";

    fn image_count_supported(count: usize) -> bool {
        count == 1
    }

    fn image_dims_supported(dims: &[usize]) -> bool {
        !dims.is_empty() && dims.iter().all(|&d| d > 0)
    }

    fn same_dims_required() -> bool {
        true
    }

    pixel_dispatch!(Gray8, GrayA8, Gray16, Gray32, Gray64, Float, Double, Rgb8, Rgba8);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::PixelType;

    fn options(factor: f64, exact: &str, aa: &str) -> Options {
        Options::new()
            .with("scale_factor", factor)
            .with("exact_res", exact)
            .with("anti_aliasing", aa)
            .with("interpolation", "nearest neighbour")
    }

    #[test]
    fn test_target_dims() {
        assert_eq!(target_dims(&[200, 50], 0.5, "auto").unwrap(), vec![100, 25]);
        assert_eq!(target_dims(&[3, 3], 0.1, "auto").unwrap(), vec![1, 1]);
        assert_eq!(target_dims(&[200, 50], 1.0, "100,0").unwrap(), vec![100, 25]);
        assert_eq!(target_dims(&[200, 50], 1.0, "0, 100").unwrap(), vec![400, 100]);
        assert_eq!(target_dims(&[200, 50], 1.0, "7,9").unwrap(), vec![7, 9]);
        assert!(target_dims(&[200, 50], 1.0, "100").unwrap_err().is_unsupported());
        assert!(target_dims(&[200, 50], 1.0, "0,0").unwrap_err().is_unsupported());
        assert_eq!(target_dims(&[2, 2, 2], 1.0, "4,0,0").unwrap(), vec![4, 4, 4]);
        assert!(target_dims(&[2, 2, 2], 1.0, "4,4,0").unwrap_err().is_unsupported());
        assert!(target_dims(&[200, 50], 1.0, "a,b").unwrap_err().is_unsupported());
    }

    #[test]
    fn test_identity_resize() {
        let image = TypedArray::<u16>::from_fn(&[4, 3], |c| (c[0] * 7 + c[1] * 100) as u16);
        let out = Resize::apply(&[image.clone()], &options(1.0, "auto", "none")).unwrap();
        assert_eq!(out[0].image.typed::<u16>().to_vec(), image.to_vec());
    }

    #[test]
    fn test_exact_res_keeps_aspect() {
        let image = TypedArray::<u8>::new(&[200, 50]);
        let out = Resize::apply(&[image], &options(1.0, "100,0", "none")).unwrap();
        assert_eq!(out[0].image.shape(), &[100, 25]);
    }

    #[test]
    fn test_nearest_neighbour_sampling() {
        let image = TypedArray::<u8>::from_vec(&[4], vec![10, 20, 30, 40]);
        assert_eq!(nearest_neighbour(&image, &[2]).to_vec(), vec![10, 30]);
        assert_eq!(nearest_neighbour(&image, &[8]).to_vec(), vec![10, 10, 20, 20, 30, 30, 40, 40]);
    }

    #[test]
    fn test_nearest_neighbour_2d_axes() {
        let image = TypedArray::<u8>::from_fn(&[4, 2], |c| (c[0] + 10 * c[1]) as u8);
        let out = nearest_neighbour(&image, &[2, 2]);
        assert_eq!(out.to_vec(), vec![0, 2, 10, 12]);
    }

    #[test]
    fn test_antialiasing_preserves_constant_images() {
        let image = TypedArray::<[u8; 3]>::from_vec(&[8, 6], vec![[40, 80, 120]; 48]);
        for aa in ["fast", "clever"] {
            let out = Resize::apply(&[image.clone()], &options(0.5, "auto", aa)).unwrap();
            assert_eq!(out[0].image.pixel_type(), PixelType::Rgb8);
            assert_eq!(out[0].image.shape(), &[4, 3]);
            assert!(out[0].image.typed::<[u8; 3]>().to_vec().iter().all(|p| *p == [40, 80, 120]), "{aa}");
        }
    }

    #[test]
    fn test_clever_removes_nyquist_pattern() {
        // alternating samples are pure Nyquist energy, gone after the low-pass
        let image = TypedArray::<f64>::from_fn(&[8], |c| if c[0] % 2 == 0 { 1.0 } else { 0.0 });
        let filtered = clever_antialias(&image, &[4]);
        for v in filtered.to_vec() {
            assert!((v - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fast_blurs_only_shrinking_axes() {
        let image = TypedArray::<f64>::from_fn(&[4, 4], |c| if c[1] % 2 == 0 { 1.0 } else { 0.0 });
        // axis 1 grows: no blur, pattern survives
        let out = fast_antialias(&image, &[2, 8]);
        for (a, e) in out.to_vec().iter().zip(image.to_vec()) {
            assert!((a - e).abs() < 1e-12);
        }
    }

    #[test]
    fn test_unknown_interpolation() {
        let image = TypedArray::<u8>::new(&[4]);
        let opts = options(1.0, "auto", "none").with("interpolation", "bicubic");
        assert!(Resize::apply(&[image], &opts).unwrap_err().is_unsupported());
    }
}
