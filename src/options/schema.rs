//! Option schemas.
//!
//! A schema is a tree of option descriptions loaded from JSON. Leaves name an
//! option (`var_name`), its kind, its default and its constraints; a
//! `subsection` is a checkbox that gates the options nested inside it.
//!
//! ```json
//! [
//!   { "type": "header", "name": "Kernel" },
//!   { "type": "double", "var_name": "intensity", "name": "Intensity",
//!     "default": 3.0, "range": [0.0, 1000.0] },
//!   { "type": "subsection", "var_name": "one_dim", "name": "Single axis",
//!     "default": false, "options": [
//!       { "type": "int", "var_name": "dim_idx", "name": "Axis",
//!         "default": 0, "range": [0, 64] }
//!   ] }
//! ]
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{OptionValue, Options};
use crate::error::{Error, Result};

/// One node of an option schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OptionNode {
    /// Display-only heading.
    Header { name: String },
    Int {
        #[serde(rename = "var_name")]
        id: String,
        name: String,
        default: i32,
        range: Option<[i32; 2]>,
        help: Option<String>,
    },
    Double {
        #[serde(rename = "var_name")]
        id: String,
        name: String,
        default: f64,
        range: Option<[f64; 2]>,
        help: Option<String>,
    },
    /// Free text; `range` bounds its length in characters.
    Text {
        #[serde(rename = "var_name")]
        id: String,
        name: String,
        default: String,
        range: Option<[usize; 2]>,
        help: Option<String>,
    },
    Choice {
        #[serde(rename = "var_name")]
        id: String,
        name: String,
        default: String,
        values: Vec<String>,
        help: Option<String>,
    },
    Checkbox {
        #[serde(rename = "var_name")]
        id: String,
        name: String,
        default: bool,
        help: Option<String>,
    },
    /// Checkbox gating the nested options.
    Subsection {
        #[serde(rename = "var_name")]
        id: String,
        name: String,
        default: bool,
        options: Vec<OptionNode>,
        help: Option<String>,
    },
}

impl OptionNode {
    /// The option key, `None` for headers.
    pub fn id(&self) -> Option<&str> {
        match self {
            OptionNode::Header { .. } => None,
            OptionNode::Int { id, .. }
            | OptionNode::Double { id, .. }
            | OptionNode::Text { id, .. }
            | OptionNode::Choice { id, .. }
            | OptionNode::Checkbox { id, .. }
            | OptionNode::Subsection { id, .. } => Some(id),
        }
    }

    pub fn default_value(&self) -> Option<OptionValue> {
        match self {
            OptionNode::Header { .. } => None,
            OptionNode::Int { default, .. } => Some(OptionValue::Int(*default)),
            OptionNode::Double { default, .. } => Some(OptionValue::Double(*default)),
            OptionNode::Text { default, .. } | OptionNode::Choice { default, .. } => {
                Some(OptionValue::Text(default.clone()))
            }
            OptionNode::Checkbox { default, .. } | OptionNode::Subsection { default, .. } => {
                Some(OptionValue::Bool(*default))
            }
        }
    }

    /// Check a value against this node's kind and constraints.
    fn check(&self, value: &OptionValue) -> Result<()> {
        let key = self.id().unwrap_or_default();
        let bad = |why: String| Err(Error::unsupported(format!("option '{key}': {why}")));
        match (self, value) {
            (OptionNode::Int { range, .. }, OptionValue::Int(v)) => match range {
                Some([lo, hi]) if v < lo || v > hi => bad(format!("{v} outside [{lo}, {hi}]")),
                _ => Ok(()),
            },
            (OptionNode::Double { range, .. }, OptionValue::Double(_) | OptionValue::Int(_)) => {
                let v = value.as_f64().unwrap_or_default();
                match range {
                    Some([lo, hi]) if v < *lo || v > *hi => {
                        bad(format!("{v} outside [{lo}, {hi}]"))
                    }
                    _ => Ok(()),
                }
            }
            (OptionNode::Text { range, .. }, OptionValue::Text(v)) => {
                let len = v.chars().count();
                match range {
                    Some([lo, hi]) if len < *lo || len > *hi => {
                        bad(format!("length {len} outside [{lo}, {hi}]"))
                    }
                    _ => Ok(()),
                }
            }
            (OptionNode::Choice { values, .. }, OptionValue::Text(v)) => {
                if values.iter().any(|c| c == v) {
                    Ok(())
                } else {
                    bad(format!("'{v}' is not one of {values:?}"))
                }
            }
            (OptionNode::Checkbox { .. } | OptionNode::Subsection { .. }, OptionValue::Bool(_)) => {
                Ok(())
            }
            (_, other) => bad(format!("unexpected {} value", other.kind())),
        }
    }
}

/// Ordered list of option nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionsSchema(Vec<OptionNode>);

impl OptionsSchema {
    pub fn new(nodes: Vec<OptionNode>) -> Self {
        Self(nodes)
    }

    pub fn from_json(name: &str, text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|source| Error::Config {
            name: name.to_string(),
            source,
        })
    }

    pub fn nodes(&self) -> &[OptionNode] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Locate `key`, returning the node and the subsections enclosing it.
    fn find<'a>(&'a self, key: &str) -> Option<(&'a OptionNode, Vec<&'a OptionNode>)> {
        fn walk<'a>(
            nodes: &'a [OptionNode],
            key: &str,
            chain: &mut Vec<&'a OptionNode>,
        ) -> Option<&'a OptionNode> {
            for node in nodes {
                if node.id() == Some(key) {
                    return Some(node);
                }
                if let OptionNode::Subsection { options, .. } = node {
                    chain.push(node);
                    if let Some(found) = walk(options, key, chain) {
                        return Some(found);
                    }
                    chain.pop();
                }
            }
            None
        }

        let mut chain = Vec::new();
        walk(&self.0, key, &mut chain).map(|node| (node, chain))
    }

    /// Fill in defaults for every reachable option missing from `options`.
    ///
    /// Options nested in a disabled subsection are left out.
    pub fn finalize(&self, options: &Options) -> Options {
        fn fill(nodes: &[OptionNode], out: &mut Options) {
            for node in nodes {
                let (Some(id), Some(default)) = (node.id(), node.default_value()) else {
                    continue;
                };
                if !out.contains(id) {
                    out.insert(id, default);
                }
                if let OptionNode::Subsection { id, options, .. } = node {
                    if matches!(out.get(id), Some(OptionValue::Bool(true))) {
                        fill(options, out);
                    }
                }
            }
        }

        let mut out = options.clone();
        fill(&self.0, &mut out);
        debug!(count = out.len(), "finalized options");
        out
    }

    /// Check every key of `options` against the schema.
    ///
    /// A key is accepted when it is declared, its value matches the declared
    /// kind and constraints, and every enclosing subsection is enabled
    /// (explicitly `true`, or absent with a `true` default).
    pub fn validate(&self, options: &Options) -> Result<()> {
        for (key, value) in options.iter() {
            let (node, chain) = self
                .find(key)
                .ok_or_else(|| Error::unsupported(format!("unknown option '{key}'")))?;
            node.check(value)?;
            for section in chain {
                let OptionNode::Subsection { id, default, .. } = section else {
                    continue;
                };
                let enabled = match options.get(id) {
                    Some(OptionValue::Bool(v)) => *v,
                    Some(_) => false,
                    None => *default,
                };
                if !enabled {
                    return Err(Error::unsupported(format!(
                        "option '{key}' requires '{id}' to be enabled"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn is_valid(&self, options: &Options) -> bool {
        self.validate(options).is_ok()
    }
}

impl fmt::Display for OptionsSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_nodes(f: &mut fmt::Formatter<'_>, nodes: &[OptionNode], depth: usize) -> fmt::Result {
            let pad = "  ".repeat(depth);
            for node in nodes {
                match node {
                    OptionNode::Header { name } => writeln!(f, "{pad}== {name} ==")?,
                    OptionNode::Int { id, name, default, range, .. } => {
                        write!(f, "{pad}{id} (int, default {default}")?;
                        if let Some([lo, hi]) = range {
                            write!(f, ", {lo}..={hi}")?;
                        }
                        writeln!(f, "): {name}")?;
                    }
                    OptionNode::Double { id, name, default, range, .. } => {
                        write!(f, "{pad}{id} (double, default {default}")?;
                        if let Some([lo, hi]) = range {
                            write!(f, ", {lo}..={hi}")?;
                        }
                        writeln!(f, "): {name}")?;
                    }
                    OptionNode::Text { id, name, default, .. } => {
                        writeln!(f, "{pad}{id} (text, default \"{default}\"): {name}")?
                    }
                    OptionNode::Choice { id, name, default, values, .. } => writeln!(
                        f,
                        "{pad}{id} (one of {}, default \"{default}\"): {name}",
                        values.join("|")
                    )?,
                    OptionNode::Checkbox { id, name, default, .. } => {
                        writeln!(f, "{pad}{id} (bool, default {default}): {name}")?
                    }
                    OptionNode::Subsection { id, name, default, options, .. } => {
                        writeln!(f, "{pad}{id} (bool, default {default}): {name}")?;
                        write_nodes(f, options, depth + 1)?;
                    }
                }
                if let Some(help) = node_help(node) {
                    writeln!(f, "{pad}    {help}")?;
                }
            }
            Ok(())
        }

        write_nodes(f, &self.0, 0)
    }
}

fn node_help(node: &OptionNode) -> Option<&str> {
    match node {
        OptionNode::Header { .. } => None,
        OptionNode::Int { help, .. }
        | OptionNode::Double { help, .. }
        | OptionNode::Text { help, .. }
        | OptionNode::Choice { help, .. }
        | OptionNode::Checkbox { help, .. }
        | OptionNode::Subsection { help, .. } => help.as_deref(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"[
        { "type": "header", "name": "Kernel" },
        { "type": "double", "var_name": "intensity", "name": "Intensity",
          "default": 3.0, "range": [0.0, 100.0] },
        { "type": "choice", "var_name": "filter", "name": "Filter",
          "default": "gauss", "values": ["box", "gauss"] },
        { "type": "text", "var_name": "tag", "name": "Tag",
          "default": "x", "range": [1, 4] },
        { "type": "subsection", "var_name": "one_dim", "name": "Single axis",
          "default": false, "options": [
            { "type": "int", "var_name": "dim_idx", "name": "Axis",
              "default": 0, "range": [0, 8] }
        ] },
        { "type": "subsection", "var_name": "extra", "name": "Extra",
          "default": true, "options": [
            { "type": "checkbox", "var_name": "fancy", "name": "Fancy", "default": false }
        ] }
    ]"#;

    fn schema() -> OptionsSchema {
        OptionsSchema::from_json("test", SCHEMA).unwrap()
    }

    #[test]
    fn test_finalize_skips_disabled_subsections() {
        let done = schema().finalize(&Options::new());
        assert_eq!(done.get_double("intensity").unwrap(), 3.0);
        assert_eq!(done.get_text("filter").unwrap(), "gauss");
        assert!(!done.get_bool("one_dim").unwrap());
        assert!(!done.contains("dim_idx"));
        assert!(!done.get_bool("fancy").unwrap());
    }

    #[test]
    fn test_finalize_enters_enabled_subsection() {
        let done = schema().finalize(&Options::new().with("one_dim", true));
        assert_eq!(done.get_int("dim_idx").unwrap(), 0);
    }

    #[test]
    fn test_finalize_keeps_given_values() {
        let done = schema().finalize(&Options::new().with("intensity", 7.5));
        assert_eq!(done.get_double("intensity").unwrap(), 7.5);
    }

    #[test]
    fn test_validate_types_and_ranges() {
        let s = schema();
        assert!(s.is_valid(&Options::new()));
        assert!(s.is_valid(&Options::new().with("intensity", 4)));
        assert!(!s.is_valid(&Options::new().with("intensity", 101.0)));
        assert!(!s.is_valid(&Options::new().with("filter", "median")));
        assert!(!s.is_valid(&Options::new().with("filter", true)));
        assert!(!s.is_valid(&Options::new().with("tag", "toolong")));
        assert!(!s.is_valid(&Options::new().with("nope", 1)));
    }

    #[test]
    fn test_validate_subsection_dependency() {
        let s = schema();
        assert!(!s.is_valid(&Options::new().with("dim_idx", 1)));
        assert!(s.is_valid(&Options::new().with("dim_idx", 1).with("one_dim", true)));
        assert!(!s.is_valid(&Options::new().with("dim_idx", 9).with("one_dim", true)));
        // enabled by default
        assert!(s.is_valid(&Options::new().with("fancy", true)));
        assert!(!s.is_valid(&Options::new().with("fancy", true).with("extra", false)));
    }

    #[test]
    fn test_display_lists_nested_options() {
        let text = schema().to_string();
        assert!(text.contains("intensity (double, default 3"));
        assert!(text.contains("  dim_idx (int, default 0, 0..=8): Axis"));
    }
}
