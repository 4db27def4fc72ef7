//! Format registry.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use tracing::debug;

use super::Capabilities;
use crate::error::{Error, Result};
use crate::formats::{Jpeg, Png};
use crate::image::{ErasedArray, LabeledArray, PixelType};
use crate::options::Options;

/// Metadata read from a file header without decoding pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageProperties {
    pub format: String,
    pub dims: Vec<usize>,
    /// Free-form extras such as the colour type.
    pub others: HashMap<String, String>,
}

impl fmt::Display for ImageProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "format: {}", self.format)?;
        let dims: Vec<String> = self.dims.iter().map(ToString::to_string).collect();
        writeln!(f, "dimensions: {}", dims.join("x"))?;
        let mut keys: Vec<_> = self.others.keys().collect();
        keys.sort();
        for key in keys {
            writeln!(f, "{key}: {}", self.others[key])?;
        }
        Ok(())
    }
}

/// An image file format over a declared subset of pixel types.
///
/// Implementors also provide an inherent generic
/// `save<T>(&[TypedArray<T>], &Path, &Options) -> Result<()>`; the
/// `save_dispatch!` macro wires it to `save_erased` and `SUPPORTED`.
pub trait Format {
    const NAME: &'static str;
    const SUPPORTED: &'static [PixelType];

    fn image_count_supported(count: usize) -> bool;
    fn image_dims_supported(dims: &[usize]) -> bool;
    fn same_dims_required() -> bool;

    /// Decode `path`. `Ok(None)` means the file is not in this format.
    fn load(path: &Path, options: &Options) -> Result<Option<Vec<LabeledArray>>>;

    fn save_erased(images: &[ErasedArray], path: &Path, options: &Options) -> Result<()>;

    /// Header information. `Ok(None)` means the file is not in this format.
    fn information(path: &Path, options: &Options) -> Result<Option<ImageProperties>>;
}

type LoadFn = fn(&Path, &Options) -> Result<Option<Vec<LabeledArray>>>;
type SaveFn = fn(&[ErasedArray], &Path, &Options) -> Result<()>;
type InfoFn = fn(&Path, &Options) -> Result<Option<ImageProperties>>;

/// Type-erased handle to one registered format.
#[derive(Debug, Clone, Copy)]
pub struct FormatEntry {
    pub name: &'static str,
    pub capabilities: Capabilities,
    load: LoadFn,
    save: SaveFn,
    info: InfoFn,
}

impl FormatEntry {
    pub fn of<F: Format>() -> Self {
        Self {
            name: F::NAME,
            capabilities: Capabilities {
                supported: F::SUPPORTED,
                image_count_supported: F::image_count_supported,
                image_dims_supported: F::image_dims_supported,
                same_dims_required: F::same_dims_required,
            },
            load: F::load,
            save: F::save_erased,
            info: F::information,
        }
    }

    pub fn supported_types(&self) -> &'static [PixelType] {
        self.capabilities.supported
    }

    /// True when the images pass the type, count and shape predicates.
    pub fn accepts(&self, images: &[ErasedArray]) -> bool {
        images
            .iter()
            .all(|i| self.capabilities.supports_type(i.pixel_type()))
            && self.capabilities.check(self.name, images).is_ok()
    }

    pub fn load(&self, path: &Path, options: &Options) -> Result<Option<Vec<LabeledArray>>> {
        (self.load)(path, options)
    }

    pub fn save(&self, images: &[ErasedArray], path: &Path, options: &Options) -> Result<()> {
        self.capabilities.check(self.name, images)?;
        (self.save)(images, path, options)
    }

    pub fn information(&self, path: &Path, options: &Options) -> Result<Option<ImageProperties>> {
        (self.info)(path, options)
    }
}

/// Name-indexed table of every format.
pub struct FormatRegistry {
    entries: BTreeMap<&'static str, FormatEntry>,
}

impl FormatRegistry {
    fn build() -> Self {
        let entries: BTreeMap<_, _> = [FormatEntry::of::<Jpeg>(), FormatEntry::of::<Png>()]
            .into_iter()
            .map(|entry| (entry.name, entry))
            .collect();
        debug!(count = entries.len(), "format registry built");
        Self { entries }
    }

    /// The process-wide registry.
    pub fn global() -> &'static FormatRegistry {
        static REGISTRY: OnceLock<FormatRegistry> = OnceLock::new();
        REGISTRY.get_or_init(Self::build)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn get(&self, name: &str) -> Result<&FormatEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| Error::unsupported(format!("unknown format '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::TypedArray;

    #[test]
    fn test_registry_lists_formats() {
        let names: Vec<_> = FormatRegistry::global().names().collect();
        assert_eq!(names, vec!["jpeg", "png"]);
        assert!(FormatRegistry::global().get("tiff").unwrap_err().is_unsupported());
    }

    #[test]
    fn test_accepts_checks_types_and_shape() {
        let jpeg = FormatRegistry::global().get("jpeg").unwrap();
        let rgb = TypedArray::<[u8; 3]>::new(&[4, 4]).erase();
        let rgba = TypedArray::<[u8; 4]>::new(&[4, 4]).erase();
        let volume = TypedArray::<u8>::new(&[4, 4, 4]).erase();
        assert!(jpeg.accepts(&[rgb.clone()]));
        assert!(!jpeg.accepts(&[rgba]));
        assert!(!jpeg.accepts(&[volume]));
        assert!(!jpeg.accepts(&[rgb.clone(), rgb]));
    }

    #[test]
    fn test_properties_display() {
        let props = ImageProperties {
            format: "png".into(),
            dims: vec![3, 2],
            others: HashMap::from([("color_type".to_string(), "Rgb8".to_string())]),
        };
        let text = props.to_string();
        assert!(text.contains("dimensions: 3x2"));
        assert!(text.contains("color_type: Rgb8"));
    }
}
