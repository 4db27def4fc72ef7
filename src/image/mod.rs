//! Image model: pixel types, typed and erased arrays, line views.

pub mod array;
pub mod pixel;
pub mod rows;

use std::path::{Path, PathBuf};

pub use array::{ErasedArray, TypedArray};
pub use pixel::{
    ComplexD, ComplexF, ComplexPixel, Double, Float, FloatPixel, Gray16, Gray32, Gray64, Gray8,
    GrayA8, GrayPixel, Pixel, PixelType, Rgb8, Rgba8,
};
pub use rows::{RowProxy, RowProxyMut};

/// An image paired with a path-like label.
///
/// Algorithms label their outputs by role (`red`, `imaginary`); loaders label
/// by source file. An empty label means "unnamed".
#[derive(Debug, Clone)]
pub struct LabeledArray {
    pub image: ErasedArray,
    pub label: PathBuf,
}

impl LabeledArray {
    pub fn new(image: impl Into<ErasedArray>, label: impl Into<PathBuf>) -> Self {
        Self {
            image: image.into(),
            label: label.into(),
        }
    }

    pub fn unlabeled(image: impl Into<ErasedArray>) -> Self {
        Self::new(image, PathBuf::new())
    }

    pub fn label(&self) -> &Path {
        &self.label
    }
}
