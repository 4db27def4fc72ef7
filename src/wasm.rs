//! WebAssembly exports.
//!
//! These functions are exposed to JavaScript via wasm-bindgen and take flat
//! RGBA bytes (length = width * height * 4), the layout of `ImageData`.
//! Options not passed explicitly use their schema defaults.

use wasm_bindgen::prelude::*;

use crate::image::{Rgba8, TypedArray};
use crate::{Engine, ErasedArray, Options};

fn js_err(err: crate::Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn rgba_image(data: &[u8], width: usize, height: usize) -> Result<ErasedArray, JsValue> {
    if data.len() != width * height * 4 {
        return Err(JsValue::from_str(&format!(
            "expected {} bytes for a {width}x{height} RGBA image, got {}",
            width * height * 4,
            data.len()
        )));
    }
    let pixels: Vec<Rgba8> = data.chunks_exact(4).map(|c| [c[0], c[1], c[2], c[3]]).collect();
    Ok(TypedArray::from_vec(&[width, height], pixels).erase())
}

fn run(image: ErasedArray, algorithm: &str, options: &Options) -> Result<ErasedArray, JsValue> {
    let engine = Engine::shared().map_err(js_err)?;
    engine
        .apply(&[image], algorithm, options)
        .map_err(js_err)?
        .pop()
        .map(|labeled| labeled.image)
        .ok_or_else(|| JsValue::from_str("algorithm produced no output"))
}

fn rgba_bytes(image: &ErasedArray) -> Vec<u8> {
    image.typed::<Rgba8>().to_vec().into_iter().flatten().collect()
}

/// Gaussian blur of an RGBA image.
///
/// # Arguments
/// * `data` - Flat array of RGBA bytes
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `sigma` - Gaussian standard deviation in pixels
///
/// # Returns
/// Flat array of RGBA bytes of the same size
#[wasm_bindgen]
pub fn blur_rgba_wasm(data: &[u8], width: usize, height: usize, sigma: f64) -> Result<Vec<u8>, JsValue> {
    let options = Options::new().with("intensity", sigma).with("filter", "gauss");
    let out = run(rgba_image(data, width, height)?, "blur", &options)?;
    Ok(rgba_bytes(&out))
}

/// Nearest neighbour resize of an RGBA image with fast antialiasing.
///
/// # Returns
/// Flat array of `new_width * new_height * 4` RGBA bytes
#[wasm_bindgen]
pub fn resize_rgba_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    new_width: usize,
    new_height: usize,
) -> Result<Vec<u8>, JsValue> {
    let options = Options::new().with("exact_res", format!("{new_width},{new_height}"));
    let out = run(rgba_image(data, width, height)?, "resize", &options)?;
    Ok(rgba_bytes(&out))
}

/// Grayscale of an RGBA image, composited on white.
///
/// # Returns
/// Flat array of `width * height` gray bytes
#[wasm_bindgen]
pub fn grayscale_rgba_wasm(data: &[u8], width: usize, height: usize) -> Result<Vec<u8>, JsValue> {
    let out = run(rgba_image(data, width, height)?, "to_gray8", &Options::new())?;
    Ok(out.typed::<u8>().to_vec())
}
