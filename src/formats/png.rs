//! PNG codec.

use std::collections::HashMap;
use std::path::Path;

use image::codecs::png::{CompressionType, FilterType, PngDecoder, PngEncoder};
use image::{ImageDecoder, ImageEncoder, ImageFormat};

use super::{encode_samples, from_dynamic, is_planar, not_this_format, open, planar_size, write_file, EncodablePixel};
use crate::error::{Error, Result};
use crate::image::{LabeledArray, TypedArray};
use crate::options::Options;
use crate::registry::{save_dispatch, Format, ImageProperties};

pub struct Png;

fn compression(options: &Options) -> Result<CompressionType> {
    if !options.contains("compression") {
        return Ok(CompressionType::Default);
    }
    match options.get_text("compression")? {
        "default" => Ok(CompressionType::Default),
        "fast" => Ok(CompressionType::Fast),
        "best" => Ok(CompressionType::Best),
        other => Err(Error::unsupported(format!("unknown PNG compression '{other}'"))),
    }
}

impl Png {
    pub fn save<T: EncodablePixel>(images: &[TypedArray<T>], path: &Path, options: &Options) -> Result<()> {
        let [image] = images else {
            return Err(Error::unsupported("PNG stores exactly one image"));
        };
        let (width, height) = planar_size(image.shape())?;
        let samples = encode_samples(image);

        let mut bytes = Vec::new();
        PngEncoder::new_with_quality(&mut bytes, compression(options)?, FilterType::Adaptive)
            .write_image(&samples, width, height, T::COLOR)
            .map_err(|source| Error::Encode {
                path: path.to_path_buf(),
                source,
            })?;
        write_file(path, &bytes)
    }
}

impl Format for Png {
    const NAME: &'static str = "png";

    fn image_count_supported(count: usize) -> bool {
        count == 1
    }

    fn image_dims_supported(dims: &[usize]) -> bool {
        is_planar(dims)
    }

    fn same_dims_required() -> bool {
        true
    }

    fn load(path: &Path, _options: &Options) -> Result<Option<Vec<LabeledArray>>> {
        match image::load(open(path)?, ImageFormat::Png) {
            Ok(decoded) => Ok(Some(vec![LabeledArray::unlabeled(from_dynamic(decoded))])),
            Err(err) => not_this_format(path, err),
        }
    }

    fn information(path: &Path, _options: &Options) -> Result<Option<ImageProperties>> {
        let decoder = match PngDecoder::new(open(path)?) {
            Ok(decoder) => decoder,
            Err(err) => return not_this_format(path, err),
        };
        let (width, height) = decoder.dimensions();
        Ok(Some(ImageProperties {
            format: Self::NAME.to_string(),
            dims: vec![width as usize, height as usize],
            others: HashMap::from([("color_type".to_string(), format!("{:?}", decoder.color_type()))]),
        }))
    }

    save_dispatch!(Gray8, GrayA8, Gray16, Rgb8, Rgba8);
}
