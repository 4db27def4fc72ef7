//! Runtime dispatch over the closed pixel type universe.
//!
//! Algorithms and formats are written once as generic functions over a pixel
//! type and declare the subset of [`PixelType`]s they accept. The
//! [`pixel_dispatch!`] and [`save_dispatch!`] macros turn that declaration into
//! a type-switching thunk: the first input's tag picks the monomorphic
//! instance, every other input must carry the same tag.
//!
//! The registries built from these thunks are immutable after construction and
//! shared process-wide.

pub mod algorithms;
pub mod formats;

use crate::error::{Error, Result};
use crate::image::{ErasedArray, Pixel, PixelType, TypedArray};

pub use algorithms::{Algorithm, AlgorithmEntry, AlgorithmRegistry};
pub use formats::{Format, FormatEntry, FormatRegistry, ImageProperties};

/// View every input as `TypedArray<T>`, rejecting mixed batches.
pub fn typed_batch<T: Pixel>(images: &[ErasedArray]) -> Result<Vec<TypedArray<T>>> {
    images
        .iter()
        .map(|image| {
            image.try_typed::<T>().ok_or_else(|| {
                Error::unsupported(format!(
                    "mixed pixel types in one call: expected {}, got {}",
                    T::TYPE,
                    image.pixel_type()
                ))
            })
        })
        .collect()
}

/// Pixel type of the first input, `Unsupported` for an empty batch.
pub fn leading_type(images: &[ErasedArray]) -> Result<PixelType> {
    images
        .first()
        .map(ErasedArray::pixel_type)
        .ok_or_else(|| Error::unsupported("no input images"))
}

/// Capability predicates shared by algorithm and format entries.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub supported: &'static [PixelType],
    pub image_count_supported: fn(usize) -> bool,
    pub image_dims_supported: fn(&[usize]) -> bool,
    pub same_dims_required: fn() -> bool,
}

impl Capabilities {
    pub fn supports_type(&self, ty: PixelType) -> bool {
        self.supported.contains(&ty)
    }

    /// Count, shape and same-shape checks, in that order.
    pub fn check(&self, name: &str, images: &[ErasedArray]) -> Result<()> {
        if !(self.image_count_supported)(images.len()) {
            return Err(Error::unsupported(format!(
                "{name} does not accept {} image(s)",
                images.len()
            )));
        }
        if let Some(bad) = images.iter().find(|i| !(self.image_dims_supported)(i.shape())) {
            return Err(Error::unsupported(format!(
                "{name} does not accept dimensions {:?}",
                bad.shape()
            )));
        }
        if (self.same_dims_required)() {
            if let Some(first) = images.first() {
                if images.iter().any(|i| i.shape() != first.shape()) {
                    return Err(Error::unsupported(format!(
                        "{name} requires all images to share dimensions"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Declare the supported pixel types of an [`Algorithm`] and generate its
/// `apply_erased` thunk, which forwards to the inherent generic `apply`.
macro_rules! pixel_dispatch {
    ($($ty:ident),+ $(,)?) => {
        const SUPPORTED: &'static [$crate::image::PixelType] =
            &[$($crate::image::PixelType::$ty),+];

        #[allow(unreachable_patterns)]
        fn apply_erased(
            images: &[$crate::image::ErasedArray],
            options: &$crate::options::Options,
        ) -> $crate::error::Result<Vec<$crate::image::LabeledArray>> {
            match $crate::registry::leading_type(images)? {
                $($crate::image::PixelType::$ty => Self::apply(
                    &$crate::registry::typed_batch::<$crate::image::$ty>(images)?,
                    options,
                ),)+
                other => Err($crate::error::Error::unsupported(format!(
                    "{} does not support {other}",
                    <Self as $crate::registry::Algorithm>::NAME
                ))),
            }
        }
    };
}

/// Declare the supported pixel types of a [`Format`] and generate its
/// `save_erased` thunk, which forwards to the inherent generic `save`.
macro_rules! save_dispatch {
    ($($ty:ident),+ $(,)?) => {
        const SUPPORTED: &'static [$crate::image::PixelType] =
            &[$($crate::image::PixelType::$ty),+];

        #[allow(unreachable_patterns)]
        fn save_erased(
            images: &[$crate::image::ErasedArray],
            path: &std::path::Path,
            options: &$crate::options::Options,
        ) -> $crate::error::Result<()> {
            match $crate::registry::leading_type(images)? {
                $($crate::image::PixelType::$ty => Self::save(
                    &$crate::registry::typed_batch::<$crate::image::$ty>(images)?,
                    path,
                    options,
                ),)+
                other => Err($crate::error::Error::unsupported(format!(
                    "{} cannot store {other}",
                    <Self as $crate::registry::Format>::NAME
                ))),
            }
        }
    };
}

pub(crate) use pixel_dispatch;
pub(crate) use save_dispatch;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::TypedArray;

    #[test]
    fn test_typed_batch_rejects_mixed_types() {
        let a = TypedArray::<u8>::new(&[2]).erase();
        let b = TypedArray::<u16>::new(&[2]).erase();
        assert_eq!(typed_batch::<u8>(&[a.clone(), a.clone()]).unwrap().len(), 2);
        assert!(typed_batch::<u8>(&[a, b]).unwrap_err().is_unsupported());
    }

    #[test]
    fn test_capabilities_check_order() {
        fn one(n: usize) -> bool {
            n == 1
        }
        fn planar(d: &[usize]) -> bool {
            d.len() == 2
        }
        fn yes() -> bool {
            true
        }
        let caps = Capabilities {
            supported: &[PixelType::Gray8],
            image_count_supported: one,
            image_dims_supported: planar,
            same_dims_required: yes,
        };
        let flat = TypedArray::<u8>::new(&[4]).erase();
        let plane = TypedArray::<u8>::new(&[2, 2]).erase();
        assert!(caps.check("t", &[]).is_err());
        assert!(caps.check("t", &[flat.clone(), flat.clone()]).is_err());
        assert!(caps.check("t", &[flat]).is_err());
        assert!(caps.check("t", &[plane]).is_ok());
        assert!(caps.supports_type(PixelType::Gray8));
        assert!(!caps.supports_type(PixelType::Rgb8));
    }
}
