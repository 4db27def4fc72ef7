//! ndpix - N-dimensional typed images
//!
//! An image is an N-D array of one of eleven pixel types. Algorithms and file
//! formats declare which types they handle and are dispatched at runtime on
//! the pixel type of their input.
//!
//! ## Pixel Types
//! - **Gray**: `GRAY8`, `GRAYA8`, `GRAY16`, `GRAY32`, `GRAY64`
//! - **Real**: `FLOAT`, `DOUBLE`
//! - **Colour**: `RGB8`, `RGBA8`
//! - **Complex**: `COMPLEX_F`, `COMPLEX_D`
//!
//! ## Layout
//! Axis 0 is the fastest varying. A 2-D image of shape `[width, height]` is
//! stored row by row, the layout image codecs use.
//!
//! ## Entry Points
//! [`Engine`] validates options against their schemas, fills in defaults and
//! dispatches to the [`registry`]. The registries can also be used directly
//! when options are already complete.

pub mod api;
pub mod error;
pub mod extensions;
pub mod filters;
pub mod formats;
pub mod image;
pub mod options;
pub mod registry;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use crate::api::Engine;
pub use crate::error::{Error, Result};
pub use crate::extensions::ExtensionMatcher;
pub use crate::image::{ErasedArray, LabeledArray, Pixel, PixelType, TypedArray};
pub use crate::options::{OptionValue, Options, OptionsSchema};
pub use crate::registry::{AlgorithmRegistry, FormatRegistry, ImageProperties};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use ndarray::{ArrayD, IxDyn};
    use num_complex::{Complex32, Complex64};
    use numpy::{Element, IntoPyArray, PyReadonlyArrayDyn};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::{Engine, ErasedArray, Options, Pixel, PixelType, TypedArray};

    fn py_err(err: crate::Error) -> PyErr {
        PyValueError::new_err(err.to_string())
    }

    fn parse_options(options: Option<&str>) -> PyResult<Options> {
        options.map_or_else(|| Ok(Options::new()), |text| Options::from_json(text).map_err(py_err))
    }

    // numpy arrays are C-ordered, so reversing the axes gives our layout
    // without moving any data.

    fn from_numpy<T: Pixel + Element>(image: &PyReadonlyArrayDyn<'_, T>) -> ErasedArray {
        let view = image.as_array();
        let shape: Vec<usize> = view.shape().iter().rev().copied().collect();
        TypedArray::from_vec(&shape, view.iter().copied().collect()).erase()
    }

    fn numpy_shape(image: &ErasedArray, channels: Option<usize>) -> Vec<usize> {
        image.shape().iter().rev().copied().chain(channels).collect()
    }

    fn scalar_to_numpy<T: Pixel + Element>(py: Python<'_>, image: &ErasedArray) -> PyResult<PyObject> {
        let array = ArrayD::from_shape_vec(IxDyn(&numpy_shape(image, None)), image.typed::<T>().to_vec())
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(array.into_pyarray(py).into_any().unbind())
    }

    /// Multi-channel pixels gain a trailing channel axis.
    fn packed_to_numpy<const N: usize>(py: Python<'_>, image: &ErasedArray) -> PyResult<PyObject>
    where
        [u8; N]: Pixel,
    {
        let data: Vec<u8> = image.typed::<[u8; N]>().to_vec().into_iter().flatten().collect();
        let array = ArrayD::from_shape_vec(IxDyn(&numpy_shape(image, Some(N))), data)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(array.into_pyarray(py).into_any().unbind())
    }

    fn to_numpy(py: Python<'_>, image: &ErasedArray) -> PyResult<PyObject> {
        match image.pixel_type() {
            PixelType::Gray8 => scalar_to_numpy::<u8>(py, image),
            PixelType::GrayA8 => packed_to_numpy::<2>(py, image),
            PixelType::Gray16 => scalar_to_numpy::<u16>(py, image),
            PixelType::Gray32 => scalar_to_numpy::<u32>(py, image),
            PixelType::Gray64 => scalar_to_numpy::<u64>(py, image),
            PixelType::Float => scalar_to_numpy::<f32>(py, image),
            PixelType::Double => scalar_to_numpy::<f64>(py, image),
            PixelType::Rgb8 => packed_to_numpy::<3>(py, image),
            PixelType::Rgba8 => packed_to_numpy::<4>(py, image),
            PixelType::ComplexF => scalar_to_numpy::<Complex32>(py, image),
            PixelType::ComplexD => scalar_to_numpy::<Complex64>(py, image),
        }
    }

    fn run(py: Python<'_>, image: ErasedArray, algorithm: &str, options: &Options) -> PyResult<Vec<PyObject>> {
        let engine = Engine::shared().map_err(py_err)?;
        let out = py
            .allow_threads(|| engine.apply(&[image], algorithm, options))
            .map_err(py_err)?;
        out.iter().map(|labeled| to_numpy(py, &labeled.image)).collect()
    }

    /// Apply a registered algorithm to a `GRAY8` image.
    ///
    /// # Arguments
    /// * `image` - N-D uint8 array
    /// * `algorithm` - Algorithm name, e.g. `"blur"`
    /// * `options` - JSON object of algorithm options; missing keys use defaults
    #[pyfunction]
    #[pyo3(signature = (image, algorithm, options=None))]
    pub fn apply_u8(
        py: Python<'_>,
        image: PyReadonlyArrayDyn<'_, u8>,
        algorithm: &str,
        options: Option<&str>,
    ) -> PyResult<Vec<PyObject>> {
        let options = parse_options(options)?;
        run(py, from_numpy(&image), algorithm, &options)
    }

    /// Apply a registered algorithm to a `DOUBLE` image.
    #[pyfunction]
    #[pyo3(signature = (image, algorithm, options=None))]
    pub fn apply_f64(
        py: Python<'_>,
        image: PyReadonlyArrayDyn<'_, f64>,
        algorithm: &str,
        options: Option<&str>,
    ) -> PyResult<Vec<PyObject>> {
        let options = parse_options(options)?;
        run(py, from_numpy(&image), algorithm, &options)
    }

    /// N-D FFT of a real array. Returns a real array when the result has no
    /// imaginary part, a complex one otherwise.
    #[pyfunction]
    #[pyo3(signature = (image, inverse=false, shift=true, normalize=true))]
    pub fn fft(
        py: Python<'_>,
        image: PyReadonlyArrayDyn<'_, f64>,
        inverse: bool,
        shift: bool,
        normalize: bool,
    ) -> PyResult<PyObject> {
        let options = Options::new()
            .with("direction", if inverse { "backward" } else { "forward" })
            .with("shift", shift)
            .with("normalize", normalize);
        run(py, from_numpy(&image), "fft", &options)?
            .pop()
            .ok_or_else(|| PyValueError::new_err("fft produced no output"))
    }

    /// Python module definition
    #[pymodule]
    pub fn ndpix(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(apply_u8, m)?)?;
        m.add_function(wrap_pyfunction!(apply_f64, m)?)?;
        m.add_function(wrap_pyfunction!(fft, m)?)?;
        m.add("__version__", env!("CARGO_PKG_VERSION"))?;
        Ok(())
    }
}
