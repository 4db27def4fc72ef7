//! Pixel type conversion as algorithms: `change_type` and `to_gray8`.

use super::convert::{convert, ConversionParams};
use super::single_input;
use crate::error::Result;
use crate::image::{LabeledArray, Pixel, PixelType, TypedArray};
use crate::options::Options;
use crate::registry::{pixel_dispatch, Algorithm};

/// Value of `output_type` that leaves the image untouched.
pub const SAME_AS_INPUT: &str = "same as input";

/// Convert to any pixel type through the conversion graph.
pub struct ChangeType;

impl ChangeType {
    pub fn apply<T: Pixel>(images: &[TypedArray<T>], options: &Options) -> Result<Vec<LabeledArray>> {
        let image = single_input(images)?.clone().erase();
        let output_type = options.get_text("output_type")?;
        if output_type == SAME_AS_INPUT {
            return Ok(vec![LabeledArray::unlabeled(image)]);
        }
        let target: PixelType = output_type.parse()?;
        let params = ConversionParams::from_options(options)?;
        Ok(vec![LabeledArray::unlabeled(convert(&image, target, &params)?)])
    }
}

impl Algorithm for ChangeType {
    const NAME: &'static str = "change_type";

    fn image_count_supported(count: usize) -> bool {
        count == 1
    }

    fn image_dims_supported(_dims: &[usize]) -> bool {
        true
    }

    fn same_dims_required() -> bool {
        true
    }

    pixel_dispatch!(
        Gray8, GrayA8, Gray16, Gray32, Gray64, Float, Double, Rgb8, Rgba8, ComplexF, ComplexD
    );
}

/// Reduce any real-valued image to `GRAY8`.
pub struct ToGray8;

impl ToGray8 {
    pub fn apply<T: Pixel>(images: &[TypedArray<T>], options: &Options) -> Result<Vec<LabeledArray>> {
        let image = single_input(images)?.clone().erase();
        let params = ConversionParams::from_options(options)?;
        Ok(vec![LabeledArray::unlabeled(convert(&image, PixelType::Gray8, &params)?)])
    }
}

impl Algorithm for ToGray8 {
    const NAME: &'static str = "to_gray8";

    fn image_count_supported(count: usize) -> bool {
        count == 1
    }

    fn image_dims_supported(_dims: &[usize]) -> bool {
        true
    }

    fn same_dims_required() -> bool {
        true
    }

    pixel_dispatch!(Gray8, GrayA8, Gray16, Gray32, Gray64, Float, Double, Rgb8, Rgba8);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Rgb8, Rgba8};

    fn options(output_type: &str) -> Options {
        Options::new()
            .with("output_type", output_type)
            .with("rescale", true)
            .with("gray_bg", 255)
            .with("red_bg", 255)
            .with("green_bg", 255)
            .with("blue_bg", 255)
            .with("red_mult", 0.299)
            .with("green_mult", 0.587)
            .with("blue_mult", 0.114)
    }

    #[test]
    fn test_same_as_input_keeps_buffer() {
        let image = TypedArray::<u16>::new(&[3, 3]);
        let out = ChangeType::apply(&[image.clone()], &options(SAME_AS_INPUT)).unwrap();
        assert!(out[0].image.typed::<u16>().shares_buffer_with(&image));
    }

    #[test]
    fn test_rgb_rgba_rgb_is_exact() {
        let image = TypedArray::<Rgb8>::from_fn(&[3, 2], |c| [c[0] as u8, c[1] as u8, 200]);
        let rgba = ChangeType::apply(&[image.clone()], &options("RGBA8")).unwrap();
        let rgba = rgba[0].image.typed::<Rgba8>();
        let back = ChangeType::apply(&[rgba], &options("RGB8")).unwrap();
        assert_eq!(back[0].image.typed::<Rgb8>().to_vec(), image.to_vec());
    }

    #[test]
    fn test_unknown_target() {
        let image = TypedArray::<u8>::new(&[1]);
        let err = ChangeType::apply(&[image], &options("CMYK8")).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_background_out_of_byte_range() {
        let image = TypedArray::<u8>::new(&[1]);
        let err = ChangeType::apply(&[image], &options("RGB8").with("gray_bg", 300)).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_to_gray8() {
        let image = TypedArray::<u16>::from_vec(&[2], vec![0xffff, 0x0100]);
        let out = ToGray8::apply(&[image], &options(SAME_AS_INPUT)).unwrap();
        assert_eq!(out[0].image.typed::<u8>().to_vec(), vec![255, 1]);
    }
}
