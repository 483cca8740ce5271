//! The long-lived build context.
//!
//! One [`BuildContext`] is created per process from a resolved
//! configuration and handed to every stage: catalog, distribution hooks,
//! plugins and export.

use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::{resource_table, AssetCatalog, CatalogEntry};
use crate::config::ResolvedConfig;
use crate::distribution::{Capabilities, DEFAULT_DISTRIBUTION};
use crate::error::{CraftError, Result};
use crate::export::{ExportPipeline, ExportReport, FontLoader};
use crate::identity::IdentityRegistry;

/// Configuration, directories and identity tree for one project.
pub struct BuildContext {
    pub config: ResolvedConfig,
    /// Absolute `{project}/{build_dir}`.
    pub build_dir: PathBuf,
    /// Absolute `{project}/{bin_dir}`.
    pub bin_dir: PathBuf,
    pub registry: IdentityRegistry,
    font_loader: Option<FontLoader>,
}

/// What a build produced.
#[derive(Debug)]
pub struct BuildOutcome {
    pub distribution: String,
    /// Entries as exported, after distribution and plugin hooks.
    pub entries: Vec<CatalogEntry>,
    /// `(cross_reference, resource index)` for generated lookup tables.
    pub resources: Vec<(String, usize)>,
    /// Export report; its diagnostics include catalog warnings.
    pub report: ExportReport,
}

impl BuildContext {
    /// Make the project path absolute and open the identity tree at
    /// `{build_dir}/uuid.json`.
    pub fn new(mut config: ResolvedConfig) -> Result<Self> {
        if config.project_path.is_relative() {
            let cwd = std::env::current_dir()
                .map_err(|e| CraftError::io(Path::new("."), "Failed to read current directory", e))?;
            config.project_path = cwd.join(&config.project_path);
        }

        let registry = IdentityRegistry::open(config.identity_path())?;
        tracing::debug!(
            project = %config.project_path.display(),
            identifiers = registry.len(),
            "build context ready"
        );

        Ok(Self {
            build_dir: config.build_path(),
            bin_dir: config.bin_path(),
            config,
            registry,
            font_loader: None,
        })
    }

    /// Load a configuration file and build a context from it.
    pub fn load(path: &Path) -> Result<Self> {
        Self::new(ResolvedConfig::load(path)?)
    }

    /// Open font files with `loader` instead of the TrueType reader.
    pub fn with_font_loader(mut self, loader: FontLoader) -> Self {
        self.font_loader = Some(loader);
        self
    }

    /// Honour `clean`, then make sure the build and bin directories exist.
    ///
    /// Cleaning removes the build directory (identity tree included) and the
    /// exported asset directory, so identifiers are reissued.
    pub fn prepare_build(&mut self) -> Result<()> {
        if self.config.clean {
            let external = self.config.external_assets_path();
            for dir in [&self.build_dir, &external] {
                if dir.exists() {
                    fs::remove_dir_all(dir)
                        .map_err(|e| CraftError::io(dir, "Failed to clean directory", e))?;
                    tracing::info!(path = %dir.display(), "cleaned");
                }
            }
            self.registry.clear();
        }

        for dir in [&self.build_dir, &self.bin_dir] {
            fs::create_dir_all(dir).map_err(|e| CraftError::io(dir, "Failed to create directory", e))?;
        }
        Ok(())
    }

    /// Run one build: prepare directories, catalog, distribution and plugin
    /// hooks, export.
    ///
    /// `distribution` overrides the configured target; with neither set,
    /// `casio-cg` is used.
    pub fn build(&mut self, caps: &Capabilities, distribution: Option<&str>) -> Result<BuildOutcome> {
        let name = distribution
            .or(self.config.distribution.as_deref())
            .unwrap_or(DEFAULT_DISTRIBUTION)
            .to_string();
        let mut target = caps.distribution(&name)?;
        let mut plugins = self
            .config
            .plugins
            .iter()
            .map(|p| caps.plugin(p))
            .collect::<Result<Vec<_>>>()?;

        self.prepare_build()?;

        target.before_build(self)?;
        for plugin in &mut plugins {
            plugin.before_build(self)?;
        }

        let mut catalog = AssetCatalog::new();
        let mut entries = catalog.build(&self.config, &mut self.registry)?.to_vec();

        target.prepare_assets(self, &mut entries)?;
        for plugin in &mut plugins {
            plugin.prepare_assets(self, &mut entries)?;
        }

        tracing::info!(
            distribution = %name,
            entries = entries.len(),
            plugins = plugins.len(),
            "exporting"
        );
        let mut pipeline = ExportPipeline::new(&self.config, &mut self.registry, target.policy());
        if let Some(loader) = &self.font_loader {
            pipeline = pipeline.with_font_loader(loader.clone());
        }
        let mut report = pipeline.export(&entries)?;

        let mut diagnostics = catalog.diagnostics().clone();
        diagnostics.merge(std::mem::take(&mut report.diagnostics));
        report.diagnostics = diagnostics;

        target.after_export(self, &report)?;
        for plugin in &mut plugins {
            plugin.after_export(self, &report)?;
        }

        Ok(BuildOutcome {
            distribution: name,
            resources: resource_table(&entries),
            entries,
            report,
        })
    }
}
