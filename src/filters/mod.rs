//! Image algorithms.
//!
//! Every algorithm is a unit struct implementing [`Algorithm`] plus an
//! inherent generic `apply` over the pixel types it declares.
//!
//! ## Algorithms
//! - [`Blur`]: separable box or Gaussian blur
//! - [`Fft`]: forward/backward N-D FFT with centring and normalisation
//! - [`Resize`]: nearest neighbour resize with fast or spectral antialiasing
//! - [`UnaryMath`]: identity, linear stretch, abs, negative
//! - [`SplitChannels`]: one image per colour channel or complex component
//! - [`ChangeType`], [`ToGray8`]: pixel type conversion
//!
//! [`Algorithm`]: crate::registry::Algorithm

pub mod blur;
pub mod change_type;
pub mod convert;
pub mod fft;
pub mod fourier;
pub mod resize;
pub mod split_channels;
pub mod unary_math;

pub use blur::Blur;
pub use change_type::{ChangeType, ToGray8};
pub use fft::Fft;
pub use resize::Resize;
pub use split_channels::SplitChannels;
pub use unary_math::UnaryMath;

use crate::error::{Error, Result};
use crate::image::{Pixel, TypedArray};

/// The only input of a single-image algorithm.
pub(crate) fn single_input<T: Pixel>(images: &[TypedArray<T>]) -> Result<&TypedArray<T>> {
    match images {
        [image] => Ok(image),
        _ => Err(Error::unsupported(format!(
            "expected exactly one image, got {}",
            images.len()
        ))),
    }
}
