//! Export pipeline: turns catalog entries into files.
//!
//! Under the embedded policy, built-in textures and fonts land in
//! `{build_dir}/assets/` named by their stable identifier, with a metadata
//! manifest beside them. Everything shipped beside the binary lands in
//! `{bin_dir}/{output_assets_dir}/{index}.asset`, where `index` is the
//! entry's catalog position.
//!
//! Per-asset problems (missing source, bad font resolution) skip the entry
//! and are reported as diagnostics. Codec errors and I/O failures abort.

pub mod fs;
pub mod metadata;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::catalog::{AssetData, CatalogEntry};
use crate::codec::{encode_area, encode_font, load_image, GlyphSource, TrueTypeFont};
use crate::config::{FontAsset, ResolvedConfig, TextureAsset};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{CraftError, Result};
use crate::identity::{Identifier, IdentityRegistry};

pub use self::fs::{OutputWriter, WriteStats};
pub use self::metadata::{MetaValue, Metadata, MetadataBuilder, Properties, METADATA_FILE};

/// Diagnostic code for an entry whose source file does not exist.
pub const MISSING_SOURCE: &str = "particraft::export::missing-source";
/// Diagnostic code for a font that failed validation.
pub const INVALID_FONT: &str = "particraft::export::invalid-font";

/// Where built-in assets go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPolicy {
    /// Compiled into the program: identifier-named files plus a manifest.
    Embedded,
    /// Every asset is a standalone `{index}.asset` file.
    Standalone,
}

/// Opens a font file for rasterization.
pub type FontLoader = Rc<dyn Fn(&Path) -> Result<Box<dyn GlyphSource>>>;

fn truetype_loader() -> FontLoader {
    Rc::new(|path: &Path| Ok(Box::new(TrueTypeFont::open(path)?) as Box<dyn GlyphSource>))
}

/// Outcome of one export run.
#[derive(Debug, Default)]
pub struct ExportReport {
    pub stats: WriteStats,
    /// Entries that produced (or confirmed) an output file.
    pub exported: usize,
    /// Entries skipped because of a per-asset problem.
    pub skipped: usize,
    pub manifest_written: bool,
    pub registry_written: bool,
    pub diagnostics: Diagnostics,
}

impl ExportReport {
    /// Total files written, including the manifest and identity tree.
    pub fn files_written(&self) -> usize {
        self.stats.written
    }
}

/// Dispatches catalog entries to codecs and copies.
pub struct ExportPipeline<'a> {
    config: &'a ResolvedConfig,
    registry: &'a mut IdentityRegistry,
    policy: ExportPolicy,
    font_loader: FontLoader,
}

/// Per-run state.
struct Run {
    writer: OutputWriter,
    report: ExportReport,
    manifest: MetadataBuilder,
}

impl Run {
    fn skip(&mut self, diagnostic: Diagnostic) {
        self.report.skipped += 1;
        self.report.diagnostics.push(diagnostic);
    }
}

impl<'a> ExportPipeline<'a> {
    pub fn new(config: &'a ResolvedConfig, registry: &'a mut IdentityRegistry, policy: ExportPolicy) -> Self {
        Self {
            config,
            registry,
            policy,
            font_loader: truetype_loader(),
        }
    }

    /// Replace how font files are opened.
    pub fn with_font_loader(mut self, loader: FontLoader) -> Self {
        self.font_loader = loader;
        self
    }

    pub fn policy(&self) -> ExportPolicy {
        self.policy
    }

    /// Export every entry, then the manifest, then the identity tree.
    pub fn export(&mut self, entries: &[CatalogEntry]) -> Result<ExportReport> {
        let mut run = Run {
            writer: OutputWriter::new(),
            report: ExportReport::default(),
            manifest: MetadataBuilder::new(),
        };

        for (index, entry) in entries.iter().enumerate() {
            let exported = match (&entry.data, self.policy) {
                (AssetData::Sprite(_), _) => continue,
                (AssetData::Font(font), policy) => match self.encode_font_entry(&mut run, font)? {
                    None => false,
                    Some(bytes) => {
                        if policy == ExportPolicy::Embedded {
                            let id = self.identifier(&font.path, "assets.fonts")?;
                            let dest = self.builtin_dir().join(format!("{}.font", id));
                            run.writer.write_if_changed(&dest, &bytes)?;
                            run.manifest.font(&id);
                        } else {
                            run.writer.write_if_changed(&self.external_path(index), &bytes)?;
                        }
                        true
                    }
                },
                (AssetData::Texture(tex), ExportPolicy::Embedded) if !tex.external => {
                    self.export_builtin_texture(&mut run, tex)?
                }
                (AssetData::Texture(tex), ExportPolicy::Embedded) => {
                    self.export_external_texture(&mut run, tex, index)?
                }
                (AssetData::Texture(tex), ExportPolicy::Standalone) => {
                    self.export_copy(&mut run, &tex.path, index)?
                }
                (AssetData::Blob(blob), _) => self.export_copy(&mut run, &blob.path, index)?,
            };
            if exported {
                run.report.exported += 1;
            }
        }

        if self.policy == ExportPolicy::Embedded {
            let manifest = std::mem::take(&mut run.manifest).finish();
            let path = self.builtin_dir().join(METADATA_FILE);
            run.report.manifest_written = run.writer.write_if_changed(&path, manifest.as_bytes())?;
        }

        run.report.stats = run.writer.stats();
        run.report.registry_written = self.registry.persist()?;
        if run.report.registry_written {
            run.report.stats.written += 1;
        } else {
            run.report.stats.unchanged += 1;
        }
        tracing::info!(
            exported = run.report.exported,
            skipped = run.report.skipped,
            written = run.report.stats.written,
            "export finished"
        );
        Ok(run.report)
    }

    fn builtin_dir(&self) -> PathBuf {
        self.config.builtin_assets_path()
    }

    fn external_path(&self, index: usize) -> PathBuf {
        self.config.external_assets_path().join(format!("{}.asset", index))
    }

    /// Source path for an entry, or a diagnostic if it does not exist.
    fn existing_source(&self, run: &mut Run, relative: &str) -> Option<PathBuf> {
        let path = self.config.source_path(relative);
        if path.is_file() {
            return Some(path);
        }
        run.skip(
            Diagnostic::warning(
                MISSING_SOURCE,
                relative,
                format!("Missing file: {}", path.display()),
            )
            .with_help("Fix the path in the asset manifest or add the file"),
        );
        None
    }

    /// The catalog registers every built-in asset; this also covers entry
    /// lists assembled by hand.
    fn identifier(&mut self, key: &str, category: &str) -> Result<Identifier> {
        self.registry.register(key, category)
    }

    fn export_builtin_texture(&mut self, run: &mut Run, tex: &TextureAsset) -> Result<bool> {
        let Some(src) = self.existing_source(run, &tex.path) else {
            return Ok(false);
        };
        let id = self.identifier(&tex.path, "assets.textures")?;
        let extension = Path::new(&tex.path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();

        let dest = self.builtin_dir().join(format!("{}{}", id, extension));
        run.writer.copy_if_changed(&src, &dest)?;
        run.manifest.texture(&id, &extension, &tex.profile_name());
        Ok(true)
    }

    fn export_external_texture(&mut self, run: &mut Run, tex: &TextureAsset, index: usize) -> Result<bool> {
        let Some(src) = self.existing_source(run, &tex.path) else {
            return Ok(false);
        };
        let image = load_image(&src)?;
        let record = encode_area(&image, &tex.profile_name(), tex.area.as_ref()).map_err(|e| {
            match e {
                CraftError::Format { message, help } => CraftError::Format {
                    message: format!("{}: {}", tex.path, message),
                    help,
                },
                CraftError::Size { message } => CraftError::Size {
                    message: format!("{}: {}", tex.path, message),
                },
                other => other,
            }
        })?;
        tracing::debug!(
            path = %tex.path,
            profile = record.profile.name,
            width = record.width,
            height = record.height,
            "encoded texture"
        );
        run.writer.write_if_changed(&self.external_path(index), &record.to_bytes())?;
        Ok(true)
    }

    fn export_copy(&self, run: &mut Run, relative: &str, index: usize) -> Result<bool> {
        let Some(src) = self.existing_source(run, relative) else {
            return Ok(false);
        };
        run.writer.copy_if_changed(&src, &self.external_path(index))?;
        Ok(true)
    }

    /// Validate and encode a font, or `None` if it was skipped.
    fn encode_font_entry(&self, run: &mut Run, font: &FontAsset) -> Result<Option<Vec<u8>>> {
        if font.resolution <= 0 {
            run.skip(
                Diagnostic::warning(
                    INVALID_FONT,
                    &font.path,
                    format!("Font resolution must be greater than 0 (got {})", font.resolution),
                )
                .with_help("Set a positive 'resolution' on the font"),
            );
            return Ok(None);
        }
        let Some(src) = self.existing_source(run, &font.path) else {
            return Ok(None);
        };

        let source = (self.font_loader)(&src)?;
        let record = encode_font(source.as_ref(), font.resolution, &font.charset)?;
        tracing::debug!(path = %font.path, glyphs = record.glyph_count(), "encoded font");
        Ok(Some(record.to_bytes()))
    }
}
