//! Diagnostics for skipped or degraded assets.
//!
//! Per-asset problems never abort a build; they are logged and collected
//! here so callers can report them after the fact.

use std::fmt;

/// A single skipped-asset warning.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Machine-readable code (e.g. "particraft::export::missing-source").
    pub code: String,
    /// The manifest path of the asset concerned.
    pub asset: String,
    pub message: String,
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a warning diagnostic.
    pub fn warning(code: impl Into<String>, asset: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            asset: asset.into(),
            message: message.into(),
            help: None,
        }
    }

    /// Add help text to this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning[{}]: {}: {}", self.code, self.asset, self.message)
    }
}

/// Collected diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and emit it as a warning event.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(
            code = %diagnostic.code,
            asset = %diagnostic.asset,
            "{}",
            diagnostic.message
        );
        self.items.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Diagnostics carrying a given code.
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.items.iter().filter(move |d| d.code == code)
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }
}
