//! JPEG codec.

use std::collections::HashMap;
use std::path::Path;

use image::codecs::jpeg::{JpegDecoder, JpegEncoder};
use image::{ImageDecoder, ImageEncoder, ImageFormat};

use super::{encode_samples, from_dynamic, is_planar, not_this_format, open, planar_size, write_file, EncodablePixel};
use crate::error::{Error, Result};
use crate::image::{LabeledArray, TypedArray};
use crate::options::Options;
use crate::registry::{save_dispatch, Format, ImageProperties};

pub const DEFAULT_QUALITY: u8 = 90;

pub struct Jpeg;

fn quality(options: &Options) -> Result<u8> {
    if !options.contains("quality") {
        return Ok(DEFAULT_QUALITY);
    }
    let q = options.get_int("quality")?;
    match u8::try_from(q) {
        Ok(q) if (1..=100).contains(&q) => Ok(q),
        _ => Err(Error::unsupported(format!("JPEG quality {q} outside 1..=100"))),
    }
}

impl Jpeg {
    pub fn save<T: EncodablePixel>(images: &[TypedArray<T>], path: &Path, options: &Options) -> Result<()> {
        let [image] = images else {
            return Err(Error::unsupported("JPEG stores exactly one image"));
        };
        let (width, height) = planar_size(image.shape())?;
        let samples = encode_samples(image);

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality(options)?)
            .write_image(&samples, width, height, T::COLOR)
            .map_err(|source| Error::Encode {
                path: path.to_path_buf(),
                source,
            })?;
        write_file(path, &bytes)
    }
}

impl Format for Jpeg {
    const NAME: &'static str = "jpeg";

    fn image_count_supported(count: usize) -> bool {
        count == 1
    }

    fn image_dims_supported(dims: &[usize]) -> bool {
        is_planar(dims) && dims.iter().all(|&d| d <= u16::MAX as usize)
    }

    fn same_dims_required() -> bool {
        true
    }

    fn load(path: &Path, _options: &Options) -> Result<Option<Vec<LabeledArray>>> {
        match image::load(open(path)?, ImageFormat::Jpeg) {
            Ok(decoded) => Ok(Some(vec![LabeledArray::unlabeled(from_dynamic(decoded))])),
            Err(err) => not_this_format(path, err),
        }
    }

    fn information(path: &Path, _options: &Options) -> Result<Option<ImageProperties>> {
        let decoder = match JpegDecoder::new(open(path)?) {
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

    save_dispatch!(Gray8, Rgb8);
}
