//! Build targets and plugins.
//!
//! A [`Distribution`] decides how the export pipeline lays assets out for one
//! platform. [`BuildPlugin`]s hook the same build stages without owning the
//! layout. Both are looked up by name in a [`Capabilities`] table that the
//! host assembles with [`CapabilitiesBuilder`].
//!
//! # Example
//!
//! ```ignore
//! use particraft::distribution::Capabilities;
//!
//! let caps = Capabilities::builder()
//!     .with_builtins()
//!     .plugin("stamp", || Box::new(StampPlugin))
//!     .build()?;
//! let target = caps.distribution("casio-cg")?;
//! ```

use std::collections::BTreeMap;
use std::fs;

use crate::catalog::CatalogEntry;
use crate::context::BuildContext;
use crate::error::{CraftError, Result};
use crate::export::{ExportPolicy, ExportReport};

/// Name used when neither the command line nor the config picks one.
pub const DEFAULT_DISTRIBUTION: &str = CasioCg::NAME;

/// A build target.
///
/// Hooks run in order: `before_build`, `prepare_assets` (after the catalog
/// is built, before export), `after_export`.
pub trait Distribution {
    fn name(&self) -> &str;

    /// How the export pipeline writes assets for this target.
    fn policy(&self) -> ExportPolicy;

    fn before_build(&mut self, _ctx: &BuildContext) -> Result<()> {
        Ok(())
    }

    /// May reorder, drop or add entries. Positions after this hook become
    /// resource indexes.
    fn prepare_assets(&mut self, _ctx: &BuildContext, _entries: &mut Vec<CatalogEntry>) -> Result<()> {
        Ok(())
    }

    fn after_export(&mut self, _ctx: &BuildContext, _report: &ExportReport) -> Result<()> {
        Ok(())
    }
}

/// An add-on that runs alongside the distribution's hooks.
pub trait BuildPlugin {
    fn name(&self) -> &str;

    fn before_build(&mut self, _ctx: &BuildContext) -> Result<()> {
        Ok(())
    }

    fn prepare_assets(&mut self, _ctx: &BuildContext, _entries: &mut Vec<CatalogEntry>) -> Result<()> {
        Ok(())
    }

    fn after_export(&mut self, _ctx: &BuildContext, _report: &ExportReport) -> Result<()> {
        Ok(())
    }
}

fn create_dir(path: &std::path::Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| CraftError::io(path, "Failed to create directory", e))
}

/// Casio fx-CG calculators: images and fonts are compiled in through the
/// metadata manifest; everything else ships as indexed files.
#[derive(Debug, Default)]
pub struct CasioCg;

impl CasioCg {
    pub const NAME: &'static str = "casio-cg";
}

impl Distribution for CasioCg {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn policy(&self) -> ExportPolicy {
        ExportPolicy::Embedded
    }

    fn before_build(&mut self, ctx: &BuildContext) -> Result<()> {
        create_dir(&ctx.config.builtin_assets_path())
    }

    fn after_export(&mut self, _ctx: &BuildContext, report: &ExportReport) -> Result<()> {
        if report.manifest_written {
            tracing::info!(distribution = Self::NAME, "metadata manifest updated");
        }
        Ok(())
    }
}

/// Desktop builds load every asset from `{index}.asset` at runtime.
#[derive(Debug, Default)]
pub struct Desktop;

impl Desktop {
    pub const NAME: &'static str = "desktop";
}

impl Distribution for Desktop {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn policy(&self) -> ExportPolicy {
        ExportPolicy::Standalone
    }

    fn before_build(&mut self, ctx: &BuildContext) -> Result<()> {
        create_dir(&ctx.config.external_assets_path())
    }
}

type DistributionFactory = Box<dyn Fn() -> Box<dyn Distribution>>;
type PluginFactory = Box<dyn Fn() -> Box<dyn BuildPlugin>>;

/// Named factories for distributions and plugins.
///
/// Immutable once built; use [`CapabilitiesBuilder`] to assemble one.
pub struct Capabilities {
    distributions: BTreeMap<String, DistributionFactory>,
    plugins: BTreeMap<String, PluginFactory>,
}

impl Capabilities {
    pub fn builder() -> CapabilitiesBuilder {
        CapabilitiesBuilder::new()
    }

    /// Only the built-in distributions, no plugins.
    pub fn builtin() -> Self {
        Self {
            distributions: builtin_distributions(),
            plugins: BTreeMap::new(),
        }
    }

    /// Instantiate a distribution by name.
    pub fn distribution(&self, name: &str) -> Result<Box<dyn Distribution>> {
        let factory = self.distributions.get(name).ok_or_else(|| CraftError::Validation {
            message: format!("Unknown distribution '{}'", name),
            help: Some(format!("Available: {}", self.distribution_names().join(", "))),
        })?;
        Ok(factory())
    }

    /// Instantiate a plugin by name.
    pub fn plugin(&self, name: &str) -> Result<Box<dyn BuildPlugin>> {
        let factory = self.plugins.get(name).ok_or_else(|| CraftError::Validation {
            message: format!("Unknown plugin '{}'", name),
            help: if self.plugins.is_empty() {
                Some("No plugins are registered".to_string())
            } else {
                Some(format!("Available: {}", self.plugin_names().join(", ")))
            },
        })?;
        Ok(factory())
    }

    pub fn distribution_names(&self) -> Vec<&str> {
        self.distributions.keys().map(String::as_str).collect()
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_distributions() -> BTreeMap<String, DistributionFactory> {
    let mut map: BTreeMap<String, DistributionFactory> = BTreeMap::new();
    map.insert(CasioCg::NAME.to_string(), Box::new(|| Box::new(CasioCg) as Box<dyn Distribution>));
    map.insert(Desktop::NAME.to_string(), Box::new(|| Box::new(Desktop) as Box<dyn Distribution>));
    map
}

/// Builder for [`Capabilities`].
///
/// Registering the same name twice is reported by [`build`](Self::build).
#[derive(Default)]
pub struct CapabilitiesBuilder {
    distributions: Vec<(String, DistributionFactory)>,
    plugins: Vec<(String, PluginFactory)>,
}

impl CapabilitiesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `casio-cg` and `desktop`.
    pub fn with_builtins(mut self) -> Self {
        self.distributions.extend(builtin_distributions());
        self
    }

    pub fn distribution<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Distribution> + 'static,
    {
        self.distributions.push((name.to_string(), Box::new(factory)));
        self
    }

    pub fn plugin<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn() -> Box<dyn BuildPlugin> + 'static,
    {
        self.plugins.push((name.to_string(), Box::new(factory)));
        self
    }

    pub fn build(self) -> Result<Capabilities> {
        Ok(Capabilities {
            distributions: unique("distribution", self.distributions)?,
            plugins: unique("plugin", self.plugins)?,
        })
    }
}

fn unique<T>(kind: &str, items: Vec<(String, T)>) -> Result<BTreeMap<String, T>> {
    let mut map = BTreeMap::new();
    for (name, item) in items {
        if name.is_empty() {
            return Err(CraftError::validation(format!("A {} needs a name", kind)));
        }
        if map.contains_key(&name) {
            return Err(CraftError::Validation {
                message: format!("Duplicate {} '{}'", kind, name),
                help: Some("Each name can be registered once".to_string()),
            });
        }
        map.insert(name, item);
    }
    Ok(map)
}
