//! The `fxconv-metadata.txt` manifest.
//!
//! One block per file: a `<wildcard>:` header at column zero followed by
//! indented `key: value` properties. The converter toolchain reads it to
//! learn each built-in asset's symbol name and encoding.

use std::collections::BTreeMap;
use std::path::Path;

use glob::Pattern;

use crate::error::{CraftError, Result};
use crate::identity::Identifier;

/// File name of the manifest inside the built-in assets directory.
pub const METADATA_FILE: &str = "fxconv-metadata.txt";

/// Accumulates manifest stanzas in insertion order.
#[derive(Debug, Default)]
pub struct MetadataBuilder {
    content: String,
}

impl MetadataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A built-in image. `extension` includes the dot (or is empty).
    pub fn texture(&mut self, id: &Identifier, extension: &str, profile: &str) {
        self.content.push_str(&format!(
            "{id}{extension}:\n\tname: ___IMG_{id}\n\ttype: bopti-image\n\tprofile: {profile}\n"
        ));
    }

    /// A built-in font blob.
    pub fn font(&mut self, id: &Identifier) {
        self.content.push_str(&format!(
            "{id}.font:\n\tcustom-type: api_font\n\tname: ___FONT_{id}\n"
        ));
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn finish(self) -> String {
        self.content
    }
}

/// A property value; dotted keys nest into tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    Text(String),
    Table(BTreeMap<String, MetaValue>),
}

impl MetaValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s),
            MetaValue::Table(_) => None,
        }
    }
}

pub type Properties = BTreeMap<String, MetaValue>;

fn insert(props: &mut Properties, path: &[&str], value: String) {
    match path {
        [] => {}
        [last] => {
            props.insert(last.to_string(), MetaValue::Text(value));
        }
        [head, rest @ ..] => {
            let slot = props
                .entry(head.to_string())
                .or_insert_with(|| MetaValue::Table(BTreeMap::new()));
            if let MetaValue::Text(_) = slot {
                *slot = MetaValue::Table(BTreeMap::new());
            }
            if let MetaValue::Table(table) = slot {
                insert(table, rest, value);
            }
        }
    }
}

/// A parsed manifest.
#[derive(Debug, Clone)]
pub struct Metadata {
    rules: Vec<(Pattern, Properties)>,
}

impl Metadata {
    /// Parse manifest text. `#` starts a comment anywhere on a line.
    pub fn parse(text: &str) -> Result<Self> {
        let mut rules: Vec<(Pattern, Properties)> = Vec::new();

        for (n, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("");
            if line.trim().is_empty() {
                continue;
            }

            let indented = line.starts_with(char::is_whitespace);
            if !indented {
                let wildcard = line
                    .trim_end()
                    .strip_suffix(':')
                    .map(str::trim_end)
                    .filter(|w| !w.is_empty())
                    .ok_or_else(|| parse_error(n, format!("expected '<wildcard>:', found '{}'", line.trim())))?;
                let pattern = Pattern::new(wildcard)
                    .map_err(|e| parse_error(n, format!("bad wildcard '{}': {}", wildcard, e)))?;
                rules.push((pattern, Properties::new()));
                continue;
            }

            let Some((_, props)) = rules.last_mut() else {
                return Err(parse_error(n, format!("'{}' appears before any wildcard", line.trim())));
            };
            let (key, value) = line
                .trim()
                .split_once(':')
                .ok_or_else(|| parse_error(n, format!("invalid property '{}'", line.trim())))?;
            let path: Vec<&str> = key.trim().split('.').collect();
            insert(props, &path, value.trim().to_string());
        }

        Ok(Self { rules })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CraftError::io(path, "Failed to read metadata", e))?;
        Self::parse(&text)
    }

    /// Wildcards in file order.
    pub fn wildcards(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(p, _)| p.as_str())
    }

    /// Merged properties of every block matching the basename of `path`.
    /// Later blocks override earlier ones key by key.
    pub fn rules_for(&self, path: &str) -> Option<Properties> {
        let basename = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(path);

        let mut merged = Properties::new();
        let mut matched = false;
        for (pattern, props) in &self.rules {
            if pattern.matches(basename) {
                merged.extend(props.iter().map(|(k, v)| (k.clone(), v.clone())));
                matched = true;
            }
        }
        matched.then_some(merged)
    }
}

fn parse_error(line: usize, message: String) -> CraftError {
    CraftError::Parse {
        message: format!("Invalid metadata at line {}: {}", line + 1, message),
        help: Some("Blocks start with '<wildcard>:' and hold indented 'key: value' lines".to_string()),
    }
}
