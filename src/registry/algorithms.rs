//! Algorithm registry.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use tracing::debug;

use super::Capabilities;
use crate::error::{Error, Result};
use crate::filters::{Blur, ChangeType, Fft, Resize, SplitChannels, ToGray8, UnaryMath};
use crate::image::{ErasedArray, LabeledArray, PixelType};
use crate::options::Options;

/// An image algorithm over a declared subset of pixel types.
///
/// Implementors also provide an inherent generic
/// `apply<T>(&[TypedArray<T>], &Options) -> Result<Vec<LabeledArray>>`; the
/// `pixel_dispatch!` macro wires it to `apply_erased` and `SUPPORTED`.
pub trait Algorithm {
    const NAME: &'static str;
    const SUPPORTED: &'static [PixelType];

    fn image_count_supported(count: usize) -> bool;
    fn image_dims_supported(dims: &[usize]) -> bool;
    fn same_dims_required() -> bool;

    fn apply_erased(images: &[ErasedArray], options: &Options) -> Result<Vec<LabeledArray>>;
}

type ApplyFn = fn(&[ErasedArray], &Options) -> Result<Vec<LabeledArray>>;

/// Type-erased handle to one registered algorithm.
#[derive(Clone, Copy)]
pub struct AlgorithmEntry {
    pub name: &'static str,
    pub capabilities: Capabilities,
    apply: ApplyFn,
}

impl AlgorithmEntry {
    pub fn of<A: Algorithm>() -> Self {
        Self {
            name: A::NAME,
            capabilities: Capabilities {
                supported: A::SUPPORTED,
                image_count_supported: A::image_count_supported,
                image_dims_supported: A::image_dims_supported,
                same_dims_required: A::same_dims_required,
            },
            apply: A::apply_erased,
        }
    }

    pub fn supported_types(&self) -> &'static [PixelType] {
        self.capabilities.supported
    }

    pub fn image_count_supported(&self, count: usize) -> bool {
        (self.capabilities.image_count_supported)(count)
    }

    pub fn image_dims_supported(&self, dims: &[usize]) -> bool {
        (self.capabilities.image_dims_supported)(dims)
    }

    pub fn same_dims_required(&self) -> bool {
        (self.capabilities.same_dims_required)()
    }

    /// Count, shape and same-shape checks.
    pub fn check(&self, images: &[ErasedArray]) -> Result<()> {
        self.capabilities.check(self.name, images)
    }

    /// Dispatch on the runtime pixel type without re-running [`Self::check`].
    pub fn apply_unchecked(&self, images: &[ErasedArray], options: &Options) -> Result<Vec<LabeledArray>> {
        (self.apply)(images, options)
    }

    pub fn apply(&self, images: &[ErasedArray], options: &Options) -> Result<Vec<LabeledArray>> {
        self.check(images)?;
        self.apply_unchecked(images, options)
    }
}

/// Name-indexed table of every algorithm.
pub struct AlgorithmRegistry {
    entries: BTreeMap<&'static str, AlgorithmEntry>,
}

impl AlgorithmRegistry {
    fn build() -> Self {
        let entries: BTreeMap<_, _> = [
            AlgorithmEntry::of::<Blur>(),
            AlgorithmEntry::of::<ChangeType>(),
            AlgorithmEntry::of::<Fft>(),
            AlgorithmEntry::of::<Resize>(),
            AlgorithmEntry::of::<SplitChannels>(),
            AlgorithmEntry::of::<ToGray8>(),
            AlgorithmEntry::of::<UnaryMath>(),
        ]
        .into_iter()
        .map(|entry| (entry.name, entry))
        .collect();
        debug!(count = entries.len(), "algorithm registry built");
        Self { entries }
    }

    /// The process-wide registry.
    pub fn global() -> &'static AlgorithmRegistry {
        static REGISTRY: OnceLock<AlgorithmRegistry> = OnceLock::new();
        REGISTRY.get_or_init(Self::build)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<&AlgorithmEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| Error::unsupported(format!("unknown algorithm '{name}'")))
    }

    /// Look up `name`, check applicability, then dispatch.
    pub fn apply(&self, name: &str, images: &[ErasedArray], options: &Options) -> Result<Vec<LabeledArray>> {
        let entry = self.get(name)?;
        debug!(algorithm = name, images = images.len(), "dispatching");
        entry.apply(images, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::TypedArray;

    #[test]
    fn test_registry_lists_algorithms() {
        let names: Vec<_> = AlgorithmRegistry::global().names().collect();
        assert_eq!(
            names,
            vec!["blur", "change_type", "fft", "resize", "split_channels", "to_gray8", "unary_math"]
        );
    }

    #[test]
    fn test_unknown_algorithm() {
        let err = AlgorithmRegistry::global()
            .apply("sharpen", &[], &Options::new())
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_unsupported_type_is_rejected() {
        let rgb = TypedArray::<[u8; 3]>::new(&[2, 2]).erase();
        let err = AlgorithmRegistry::global()
            .apply("fft", &[rgb], &Options::new())
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_count_checked_before_dispatch() {
        let a = TypedArray::<f64>::new(&[2, 2]).erase();
        // empty options would fail inside the algorithm; the count check fires first
        let err = AlgorithmRegistry::global()
            .apply("blur", &[a.clone(), a], &Options::new())
            .unwrap_err();
        assert!(err.to_string().contains("image(s)"));
    }

    #[test]
    fn test_supported_types_queryable() {
        let fft = AlgorithmRegistry::global().get("fft").unwrap();
        assert_eq!(
            fft.supported_types(),
            &[PixelType::Float, PixelType::Double, PixelType::ComplexF, PixelType::ComplexD]
        );
        assert!(fft.image_count_supported(1));
        assert!(!fft.image_count_supported(2));
    }
}
