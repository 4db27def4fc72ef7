//! Image file formats backed by the `image` crate.
//!
//! ## Supported Formats
//! - **PNG**: `GRAY8`, `GRAYA8`, `GRAY16`, `RGB8`, `RGBA8`
//! - **JPEG**: `GRAY8`, `RGB8`
//!
//! Both store exactly one 2-D image. Arrays are shaped `[width, height]`, so
//! the codec's row-major pixel order is the array's flat order. Encoding happens
//! entirely in memory; nothing is written unless it succeeds.

pub mod jpeg;
pub mod png;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::{DynamicImage, ExtendedColorType, ImageError};
use tracing::debug;

use crate::error::{Error, Result};
use crate::image::{ErasedArray, GrayA8, Pixel, Rgb8, Rgba8, TypedArray};

pub use self::jpeg::Jpeg;
pub use self::png::Png;

/// Pixels a codec can write directly.
pub trait EncodablePixel: Pixel {
    const COLOR: ExtendedColorType;

    /// Append the native-endian sample bytes of one pixel.
    fn push_bytes(self, out: &mut Vec<u8>);
}

impl EncodablePixel for u8 {
    const COLOR: ExtendedColorType = ExtendedColorType::L8;

    fn push_bytes(self, out: &mut Vec<u8>) {
        out.push(self);
    }
}

impl EncodablePixel for u16 {
    const COLOR: ExtendedColorType = ExtendedColorType::L16;

    fn push_bytes(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_ne_bytes());
    }
}

impl EncodablePixel for GrayA8 {
    const COLOR: ExtendedColorType = ExtendedColorType::La8;

    fn push_bytes(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self);
    }
}

impl EncodablePixel for Rgb8 {
    const COLOR: ExtendedColorType = ExtendedColorType::Rgb8;

    fn push_bytes(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self);
    }
}

impl EncodablePixel for Rgba8 {
    const COLOR: ExtendedColorType = ExtendedColorType::Rgba8;

    fn push_bytes(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self);
    }
}

/// Flat sample bytes in codec order.
pub(crate) fn encode_samples<T: EncodablePixel>(image: &TypedArray<T>) -> Vec<u8> {
    let data = image.read();
    let mut out = Vec::with_capacity(data.len() * T::TYPE.size_of());
    for &p in data.iter() {
        p.push_bytes(&mut out);
    }
    out
}

/// `(width, height)` of a 2-D array.
pub(crate) fn planar_size(shape: &[usize]) -> Result<(u32, u32)> {
    let [width, height] = shape else {
        return Err(Error::unsupported(format!("expected a 2-D image, got {shape:?}")));
    };
    let width = u32::try_from(*width).map_err(|_| Error::unsupported("image too wide"))?;
    let height = u32::try_from(*height).map_err(|_| Error::unsupported("image too tall"))?;
    Ok((width, height))
}

pub(crate) fn is_planar(dims: &[usize]) -> bool {
    dims.len() == 2 && dims.iter().all(|&d| d > 0 && d <= u32::MAX as usize)
}

pub(crate) fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// Write fully encoded bytes.
pub(crate) fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Map a decoder error: I/O failures propagate, anything else means the file
/// is not in the attempted format.
pub(crate) fn not_this_format<T>(path: &Path, err: ImageError) -> Result<Option<T>> {
    match err {
        ImageError::IoError(source) => Err(Error::Read {
            path: path.to_path_buf(),
            source,
        }),
        other => {
            debug!(path = %path.display(), error = %other, "decoder rejected file");
            Ok(None)
        }
    }
}

/// Convert a decoded image to an array, keeping its native layout where the
/// pixel universe has one.
pub(crate) fn from_dynamic(decoded: DynamicImage) -> ErasedArray {
    let shape = [decoded.width() as usize, decoded.height() as usize];
    match decoded {
        DynamicImage::ImageLuma8(buf) => TypedArray::from_vec(&shape, buf.into_raw()).erase(),
        DynamicImage::ImageLumaA8(buf) => {
            let data = buf.into_raw().chunks_exact(2).map(|c| [c[0], c[1]]).collect();
            TypedArray::<GrayA8>::from_vec(&shape, data).erase()
        }
        DynamicImage::ImageLuma16(buf) => TypedArray::from_vec(&shape, buf.into_raw()).erase(),
        DynamicImage::ImageRgb8(buf) => {
            let data = buf.into_raw().chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
            TypedArray::<Rgb8>::from_vec(&shape, data).erase()
        }
        other => {
            let rgba = other.to_rgba8();
            let data = rgba.into_raw().chunks_exact(4).map(|c| [c[0], c[1], c[2], c[3]]).collect();
            TypedArray::<Rgba8>::from_vec(&shape, data).erase()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::PixelType;

    #[test]
    fn test_planar_size() {
        assert_eq!(planar_size(&[3, 2]).unwrap(), (3, 2));
        assert!(planar_size(&[3]).unwrap_err().is_unsupported());
        assert!(is_planar(&[1, 1]));
        assert!(!is_planar(&[0, 1]));
        assert!(!is_planar(&[2, 2, 2]));
    }

    #[test]
    fn test_encode_samples_order() {
        let image = TypedArray::<Rgb8>::from_vec(&[2, 1], vec![[1, 2, 3], [4, 5, 6]]);
        assert_eq!(encode_samples(&image), vec![1, 2, 3, 4, 5, 6]);
        let wide = TypedArray::<u16>::from_vec(&[1, 1], vec![0x0102]);
        assert_eq!(encode_samples(&wide), 0x0102u16.to_ne_bytes().to_vec());
    }

    #[test]
    fn test_from_dynamic_layout() {
        let mut buf = image::GrayImage::new(3, 2);
        buf.put_pixel(2, 1, image::Luma([9]));
        let array = from_dynamic(DynamicImage::ImageLuma8(buf));
        assert_eq!(array.shape(), &[3, 2]);
        assert_eq!(array.typed::<u8>().get(&[2, 1]), 9);

        let rgb16 = DynamicImage::ImageRgb16(image::ImageBuffer::new(1, 1));
        assert_eq!(from_dynamic(rgb16).pixel_type(), PixelType::Rgba8);
    }
}
