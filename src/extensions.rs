//! File extension to format resolution.
//!
//! Each format owns a list of raw suffixes, compared ASCII case-insensitively,
//! and a list of regex suffixes, which must match the whole extension. Formats
//! iterate in name order so every query is deterministic.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};

/// One `extensions` entry of a format config.
#[derive(Debug, Clone, Deserialize)]
pub struct SuffixConfig {
    pub suffix: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl SuffixConfig {
    pub fn is_regex(&self) -> bool {
        self.kind.as_deref() == Some("regex")
    }
}

#[derive(Debug, Clone)]
struct RegexSuffix {
    source: String,
    regex: Regex,
}

#[derive(Debug, Clone, Default)]
pub struct ExtensionMatcher {
    raw: BTreeMap<String, Vec<String>>,
    regex: BTreeMap<String, Vec<RegexSuffix>>,
    output: BTreeMap<String, String>,
}

/// Formats split into those with a matching suffix and the rest.
struct Division<'a> {
    matching: Vec<&'a str>,
    other: Vec<&'a str>,
}

impl ExtensionMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a suffix for `format`. Registering twice is a no-op.
    pub fn register_extension(&mut self, format: &str, suffix: &str, regex: bool) -> Result<()> {
        if regex {
            let compiled = Regex::new(&format!("^(?:{suffix})$"))
                .map_err(|e| Error::unsupported(format!("invalid extension pattern '{suffix}': {e}")))?;
            let entries = self.regex.entry(format.to_string()).or_default();
            if entries.iter().all(|e| e.source != suffix) {
                entries.push(RegexSuffix {
                    source: suffix.to_string(),
                    regex: compiled,
                });
            }
        } else {
            let entries = self.raw.entry(format.to_string()).or_default();
            if !entries.iter().any(|e| e == suffix) {
                entries.push(suffix.to_string());
            }
        }
        Ok(())
    }

    /// Remove one suffix; a format left without suffixes of that kind is dropped
    /// from that table.
    pub fn remove_extension(&mut self, format: &str, suffix: &str, regex: bool) {
        if regex {
            if let Some(entries) = self.regex.get_mut(format) {
                entries.retain(|e| e.source != suffix);
                if entries.is_empty() {
                    self.regex.remove(format);
                }
            }
        } else if let Some(entries) = self.raw.get_mut(format) {
            entries.retain(|e| e != suffix);
            if entries.is_empty() {
                self.raw.remove(format);
            }
        }
    }

    pub fn remove_format(&mut self, format: &str) {
        self.raw.remove(format);
        self.regex.remove(format);
        self.output.remove(format);
    }

    pub fn registered_formats(&self) -> BTreeSet<String> {
        self.raw.keys().chain(self.regex.keys()).cloned().collect()
    }

    pub fn raw_suffixes(&self, format: &str) -> &[String] {
        self.raw.get(format).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn regex_suffixes(&self, format: &str) -> Vec<&str> {
        self.regex
            .get(format)
            .map(|entries| entries.iter().map(|e| e.source.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn set_output_extension(&mut self, format: &str, extension: &str) {
        self.output.insert(format.to_string(), extension.to_string());
    }

    pub fn output_extension(&self, format: &str) -> Option<&str> {
        self.output.get(format).map(String::as_str)
    }

    /// `path` with its extension replaced by the output extension of `format`.
    /// Unchanged when the format declares none.
    pub fn with_output_extension(&self, format: &str, path: &Path) -> PathBuf {
        match self.output_extension(format) {
            Some(ext) => path.with_extension(ext),
            None => path.to_path_buf(),
        }
    }

    /// Register every suffix of a format config together with its output extension.
    pub fn load_config(&mut self, format: &str, suffixes: &[SuffixConfig], output: &str) -> Result<()> {
        for entry in suffixes {
            self.register_extension(format, &entry.suffix, entry.is_regex())?;
        }
        self.set_output_extension(format, output);
        Ok(())
    }

    /// Formats whose suffixes match the extension of `path`: raw matches first,
    /// then regex matches.
    pub fn find_possible_formats(&self, path: &Path) -> Result<Vec<String>> {
        let ext = extension(path)?;
        let mut out: Vec<String> = Vec::new();
        for format in self.divide_raw(&ext).matching.into_iter().chain(self.divide_regex(&ext).matching) {
            if !out.iter().any(|f| f == format) {
                out.push(format.to_string());
            }
        }
        Ok(out)
    }

    /// Every registered format, most plausible first: raw matches, regex
    /// matches, then the remaining raw and regex formats.
    pub fn sorted_formats_by_priority(&self, path: &Path) -> Result<Vec<String>> {
        let ext = extension(path)?;
        let raw = self.divide_raw(&ext);
        let regex = self.divide_regex(&ext);

        let mut out: Vec<String> = Vec::new();
        for format in raw
            .matching
            .into_iter()
            .chain(regex.matching)
            .chain(raw.other)
            .chain(regex.other)
        {
            if !out.iter().any(|f| f == format) {
                out.push(format.to_string());
            }
        }
        Ok(out)
    }

    fn divide_raw(&self, ext: &str) -> Division<'_> {
        let mut division = Division {
            matching: Vec::new(),
            other: Vec::new(),
        };
        for (format, suffixes) in &self.raw {
            if suffixes.iter().any(|s| s.eq_ignore_ascii_case(ext)) {
                division.matching.push(format);
            } else {
                division.other.push(format);
            }
        }
        division
    }

    fn divide_regex(&self, ext: &str) -> Division<'_> {
        let mut division = Division {
            matching: Vec::new(),
            other: Vec::new(),
        };
        for (format, suffixes) in &self.regex {
            if suffixes.iter().any(|s| s.regex.is_match(ext)) {
                division.matching.push(format);
            } else {
                division.other.push(format);
            }
        }
        division
    }
}

/// Extension of `path` without the leading dot; empty when there is none.
fn extension(path: &Path) -> Result<String> {
    let Some(ext) = path.extension() else {
        return Ok(String::new());
    };
    match ext.to_str() {
        Some(ext) if ext.is_ascii() => Ok(ext.to_string()),
        _ => Err(Error::unsupported(format!(
            "extension of '{}' must consist of ASCII characters",
            path.display()
        ))),
    }
}
