//! Engine facade: registries, option schemas and extension matching behind one
//! entry point.
//!
//! Every call validates caller options against the relevant schema and fills in
//! defaults before anything is dispatched.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::extensions::{ExtensionMatcher, SuffixConfig};
use crate::image::{ErasedArray, LabeledArray};
use crate::options::{Options, OptionsSchema};
use crate::registry::{AlgorithmEntry, AlgorithmRegistry, FormatEntry, FormatRegistry, ImageProperties};

const ALGORITHM_CONFIGS: &[(&str, &str)] = &[
    ("blur", include_str!("../configs/algorithms/blur.json")),
    ("change_type", include_str!("../configs/algorithms/change_type.json")),
    ("fft", include_str!("../configs/algorithms/fft.json")),
    ("resize", include_str!("../configs/algorithms/resize.json")),
    ("split_channels", include_str!("../configs/algorithms/split_channels.json")),
    ("to_gray8", include_str!("../configs/algorithms/to_gray8.json")),
    ("unary_math", include_str!("../configs/algorithms/unary_math.json")),
];

const FORMAT_CONFIGS: &[(&str, &str)] = &[
    ("jpeg", include_str!("../configs/formats/jpeg.json")),
    ("png", include_str!("../configs/formats/png.json")),
];

#[derive(Debug, Deserialize)]
struct AlgorithmConfig {
    options: OptionsSchema,
}

#[derive(Debug, Deserialize)]
struct FormatConfig {
    extensions: Vec<SuffixConfig>,
    output_extension: String,
    #[serde(default)]
    loading_options: OptionsSchema,
    #[serde(default)]
    saving_options: OptionsSchema,
}

fn parse_config<'a, C: Deserialize<'a>>(name: &str, text: &'a str) -> Result<C> {
    serde_json::from_str(text).map_err(|source| Error::Config {
        name: name.to_string(),
        source,
    })
}

fn embedded<'a>(table: &[(&str, &'a str)], kind: &str, name: &str) -> Result<&'a str> {
    table
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, text)| *text)
        .ok_or_else(|| Error::unsupported(format!("no configuration for {kind} '{name}'")))
}

/// The image engine.
pub struct Engine {
    algorithms: &'static AlgorithmRegistry,
    formats: &'static FormatRegistry,
    extensions: ExtensionMatcher,
    algorithm_schemas: BTreeMap<&'static str, OptionsSchema>,
    loading_schemas: BTreeMap<&'static str, OptionsSchema>,
    saving_schemas: BTreeMap<&'static str, OptionsSchema>,
}

impl Engine {
    /// Build the engine from the embedded configurations of every registered
    /// algorithm and format.
    pub fn new() -> Result<Self> {
        let algorithms = AlgorithmRegistry::global();
        let formats = FormatRegistry::global();

        let mut algorithm_schemas = BTreeMap::new();
        for name in algorithms.names() {
            let config: AlgorithmConfig = parse_config(name, embedded(ALGORITHM_CONFIGS, "algorithm", name)?)?;
            algorithm_schemas.insert(name, config.options);
        }

        let mut extensions = ExtensionMatcher::new();
        let mut loading_schemas = BTreeMap::new();
        let mut saving_schemas = BTreeMap::new();
        for name in formats.names() {
            let config: FormatConfig = parse_config(name, embedded(FORMAT_CONFIGS, "format", name)?)?;
            extensions.load_config(name, &config.extensions, &config.output_extension)?;
            loading_schemas.insert(name, config.loading_options);
            saving_schemas.insert(name, config.saving_options);
        }

        debug!(
            algorithms = algorithm_schemas.len(),
            formats = saving_schemas.len(),
            "engine configured"
        );
        Ok(Self {
            algorithms,
            formats,
            extensions,
            algorithm_schemas,
            loading_schemas,
            saving_schemas,
        })
    }

    /// Process-wide engine, built on first use.
    pub fn shared() -> Result<&'static Engine> {
        static ENGINE: OnceLock<Engine> = OnceLock::new();
        if let Some(engine) = ENGINE.get() {
            return Ok(engine);
        }
        let engine = Engine::new()?;
        Ok(ENGINE.get_or_init(|| engine))
    }

    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn supported_algorithms(&self) -> Vec<&'static str> {
        self.algorithms.names().collect()
    }

    pub fn supported_formats(&self) -> Vec<&'static str> {
        self.formats.names().collect()
    }

    /// Type, count and shape capabilities of an algorithm.
    pub fn algorithm(&self, name: &str) -> Result<&AlgorithmEntry> {
        self.algorithms.get(name)
    }

    /// Type, count and shape capabilities of a format.
    pub fn format(&self, name: &str) -> Result<&FormatEntry> {
        self.formats.get(name)
    }

    pub fn algorithm_schema(&self, name: &str) -> Result<&OptionsSchema> {
        schema(&self.algorithm_schemas, "algorithm", name)
    }

    pub fn loading_schema(&self, format: &str) -> Result<&OptionsSchema> {
        schema(&self.loading_schemas, "format", format)
    }

    pub fn saving_schema(&self, format: &str) -> Result<&OptionsSchema> {
        schema(&self.saving_schemas, "format", format)
    }

    pub fn extensions(&self) -> &ExtensionMatcher {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut ExtensionMatcher {
        &mut self.extensions
    }

    /// Run `algorithm` on `images`.
    ///
    /// Count, shape and same-shape checks run first, then the options are
    /// validated and completed with defaults.
    pub fn apply(&self, images: &[ErasedArray], algorithm: &str, options: &Options) -> Result<Vec<LabeledArray>> {
        let entry = self.algorithms.get(algorithm)?;
        entry.check(images)?;
        let schema = self.algorithm_schema(algorithm)?;
        schema
            .validate(options)
            .map_err(|e| Error::unsupported(format!("options rejected by '{algorithm}': {e}")))?;
        let options = schema.finalize(options);
        debug!(algorithm, images = images.len(), "applying");
        entry.apply_unchecked(images, &options)
    }

    /// Run `algorithm` on each labelled image separately.
    ///
    /// An output labelled `x` derived from `dir/img.png` is labelled
    /// `dir/img_x.png`; unlabelled outputs keep the input label.
    pub fn apply_labeled(
        &self,
        images: &[LabeledArray],
        algorithm: &str,
        options: &Options,
    ) -> Result<Vec<LabeledArray>> {
        let mut out = Vec::new();
        for input in images {
            for mut result in self.apply(std::slice::from_ref(&input.image), algorithm, options)? {
                result.label = derived_label(&input.label, &result.label);
                out.push(result);
            }
        }
        Ok(out)
    }

    /// Load every image stored in `path`.
    ///
    /// With no `format` every format is tried, most plausible extension match
    /// first. A format is skipped when `options` are invalid for it. Labels
    /// default to the file stem and are prefixed with the directory of `path`
    /// relative to `rel_dir`.
    pub fn load_image(
        &self,
        path: &Path,
        rel_dir: Option<&Path>,
        format: Option<&str>,
        options: &Options,
    ) -> Result<Vec<LabeledArray>> {
        let candidates = match format {
            Some(format) => vec![format.to_string()],
            None => self.extensions.sorted_formats_by_priority(path)?,
        };

        let prefix = rel_dir
            .and_then(|dir| path.parent()?.strip_prefix(dir).ok())
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let stem = path.file_stem().map(PathBuf::from).unwrap_or_default();

        for name in &candidates {
            let schema = self.loading_schema(name)?;
            if !schema.is_valid(options) {
                debug!(format = %name, "loading options rejected");
                continue;
            }
            let Some(mut images) = self.formats.get(name)?.load(path, &schema.finalize(options))? else {
                continue;
            };
            for image in &mut images {
                let label = if image.label.as_os_str().is_empty() {
                    stem.clone()
                } else {
                    std::mem::take(&mut image.label)
                };
                image.label = prefix.join(label);
            }
            info!(path = %path.display(), format = %name, count = images.len(), "loaded");
            return Ok(images);
        }

        Err(Error::unsupported(format!("'{}' contains no supported image", path.display())))
    }

    /// Load a file that must hold exactly one image.
    pub fn load_one(
        &self,
        path: &Path,
        rel_dir: Option<&Path>,
        format: Option<&str>,
        options: &Options,
    ) -> Result<LabeledArray> {
        let mut images = self.load_image(path, rel_dir, format, options)?;
        if images.len() != 1 {
            return Err(Error::unsupported(format!(
                "'{}' contains {} images, expected 1",
                path.display(),
                images.len()
            )));
        }
        Ok(images.remove(0))
    }

    /// Load every decodable file under `dir`, one entry per file, in path order.
    ///
    /// Files no format accepts are skipped with a warning.
    pub fn load_directory(
        &self,
        dir: &Path,
        recurse: bool,
        format: Option<&str>,
        options: &Options,
    ) -> Result<Vec<Vec<LabeledArray>>> {
        let mut out = Vec::new();
        self.walk(&mut out, dir, dir, recurse, format, options)?;
        Ok(out)
    }

    fn walk(
        &self,
        out: &mut Vec<Vec<LabeledArray>>,
        base: &Path,
        current: &Path,
        recurse: bool,
        format: Option<&str>,
        options: &Options,
    ) -> Result<()> {
        let mut entries = fs::read_dir(current)
            .map_err(|source| Error::Read {
                path: current.to_path_buf(),
                source,
            })?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();

        for path in entries {
            if path.is_dir() {
                if recurse {
                    self.walk(out, base, &path, recurse, format, options)?;
                }
            } else if path.is_file() {
                match self.load_image(&path, Some(base), format, options) {
                    Ok(images) => out.push(images),
                    Err(err) if err.is_unsupported() => {
                        warn!(path = %path.display(), error = %err, "skipping file");
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(())
    }

    /// Pick the format `save_image` would use and the path it would write.
    ///
    /// With no `format`, the first extension match whose type, count and shape
    /// predicates accept `images` wins.
    pub fn resolve_save(&self, images: &[ErasedArray], path: &Path, format: Option<&str>) -> Result<(&FormatEntry, PathBuf)> {
        let candidates = match format {
            Some(format) => vec![format.to_string()],
            None => self.extensions.find_possible_formats(path)?,
        };
        for name in &candidates {
            let entry = self.formats.get(name)?;
            if entry.accepts(images) {
                return Ok((entry, self.extensions.with_output_extension(name, path)));
            }
        }
        let file = path.file_name().unwrap_or(path.as_os_str());
        Err(Error::unsupported(format!(
            "no supported format found for the given images and '{}'",
            Path::new(file).display()
        )))
    }

    /// Save `images`, returning the path actually written.
    pub fn save_image(
        &self,
        images: &[ErasedArray],
        path: &Path,
        format: Option<&str>,
        options: &Options,
    ) -> Result<PathBuf> {
        let (entry, target) = self.resolve_save(images, path, format)?;
        let schema = self.saving_schema(entry.name)?;
        schema
            .validate(options)
            .map_err(|e| Error::unsupported(format!("options rejected by format '{}': {e}", entry.name)))?;
        entry.save(images, &target, &schema.finalize(options))?;
        info!(path = %target.display(), format = entry.name, "saved");
        Ok(target)
    }

    /// Header information of the image in `path`.
    pub fn properties(&self, path: &Path, options: &Options) -> Result<ImageProperties> {
        for name in self.extensions.sorted_formats_by_priority(path)? {
            let schema = self.loading_schema(&name)?;
            if !schema.is_valid(options) {
                continue;
            }
            if let Some(props) = self.formats.get(&name)?.information(path, &schema.finalize(options))? {
                return Ok(props);
            }
        }
        Err(Error::unsupported(format!("'{}' contains no supported image", path.display())))
    }

    /// The most plausible format for `path` judging by its extension.
    pub fn predict_format(&self, path: &Path) -> Result<String> {
        self.extensions
            .find_possible_formats(path)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::unsupported(format!("no format matches '{}'", path.display())))
    }
}

fn schema<'a>(
    table: &'a BTreeMap<&'static str, OptionsSchema>,
    kind: &str,
    name: &str,
) -> Result<&'a OptionsSchema> {
    table
        .get(name)
        .ok_or_else(|| Error::unsupported(format!("unknown {kind} '{name}'")))
}

fn derived_label(input: &Path, output: &Path) -> PathBuf {
    if output.as_os_str().is_empty() {
        return input.to_path_buf();
    }
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let name = format!("{stem}_{}", output.display());
    let mut label = input.with_file_name(name);
    if let Some(ext) = input.extension() {
        label.set_extension(ext);
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_registered_name_has_config() {
        let engine = Engine::new().unwrap();
        for name in engine.supported_algorithms() {
            assert!(engine.algorithm_schema(name).is_ok(), "{name}");
        }
        for name in engine.supported_formats() {
            assert!(engine.saving_schema(name).is_ok(), "{name}");
            assert!(engine.loading_schema(name).is_ok(), "{name}");
        }
        assert_eq!(ALGORITHM_CONFIGS.len(), engine.supported_algorithms().len());
        assert_eq!(FORMAT_CONFIGS.len(), engine.supported_formats().len());
    }

    #[test]
    fn test_derived_label() {
        assert_eq!(derived_label(Path::new("a/img.png"), Path::new("red")), PathBuf::from("a/img_red.png"));
        assert_eq!(derived_label(Path::new("img"), Path::new("re")), PathBuf::from("img_re"));
        assert_eq!(derived_label(Path::new("a/img.png"), Path::new("")), PathBuf::from("a/img.png"));
    }

    #[test]
    fn test_predict_format() {
        let engine = Engine::new().unwrap();
        assert_eq!(engine.predict_format(Path::new("x.JPG")).unwrap(), "jpeg");
        assert_eq!(engine.predict_format(Path::new("x.jfif")).unwrap(), "jpeg");
        assert_eq!(engine.predict_format(Path::new("x.png")).unwrap(), "png");
        assert!(engine.predict_format(Path::new("x.bmp")).unwrap_err().is_unsupported());
    }
}
