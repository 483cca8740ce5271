//! Asset catalog: the ordered list of work units for one build.
//!
//! An entry's position in the list is its resource index. Generated lookup
//! code bakes those indices in, so the ordering rules here are part of the
//! runtime ABI:
//!
//! 1. textures in manifest order, each preceded by the sprites of its
//!    sidecar (in sidecar order)
//! 2. audio
//! 3. other
//! 4. fonts

pub mod sidecar;

use std::fmt;

use crate::config::{BlobAsset, FontAsset, ResolvedConfig, TextureAsset};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::Result;
use crate::identity::IdentityRegistry;

pub use sidecar::{load_frames, parse_frames, sidecar_path, Frame};

/// Diagnostic code for an unreadable or malformed sprite sidecar.
pub const SIDECAR_DIAGNOSTIC: &str = "particraft::catalog::sidecar";

/// The closed set of asset categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Textures,
    Fonts,
    Sprites,
    Audio,
    Other,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::Textures => "textures",
            Category::Fonts => "fonts",
            Category::Sprites => "sprites",
            Category::Audio => "audio",
            Category::Other => "other",
        }
    }

    /// Dotted identity-tree path for categories that receive identifiers.
    pub fn identity_path(self) -> Option<&'static str> {
        match self {
            Category::Textures => Some("assets.textures"),
            Category::Fonts => Some("assets.fonts"),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A sprite cut from a texture's sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteAsset {
    /// Cross-reference key of the owning texture.
    pub texture: String,
    pub frame: Frame,
}

/// The manifest record behind a catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetData {
    Texture(TextureAsset),
    Font(FontAsset),
    Sprite(SpriteAsset),
    Blob(BlobAsset),
}

impl AssetData {
    /// Source path relative to the project, if the entry has one.
    pub fn source(&self) -> Option<&str> {
        match self {
            AssetData::Texture(t) => Some(&t.path),
            AssetData::Font(f) => Some(&f.path),
            AssetData::Blob(b) => Some(&b.path),
            AssetData::Sprite(_) => None,
        }
    }
}

/// One manifest-derived unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub category: Category,
    pub data: AssetData,
    /// Name other generated code uses to look this entry up.
    pub cross_reference: Option<String>,
}

impl CatalogEntry {
    fn new(category: Category, data: AssetData, reference: &str) -> Self {
        Self {
            category,
            data,
            cross_reference: (!reference.is_empty()).then(|| reference.to_string()),
        }
    }

    /// Whether the entry ships beside the binary rather than compiled in.
    pub fn is_external(&self) -> bool {
        match &self.data {
            AssetData::Texture(t) => t.external,
            AssetData::Blob(_) => true,
            AssetData::Font(_) | AssetData::Sprite(_) => false,
        }
    }

    /// Label for logs and diagnostics.
    pub fn label(&self) -> String {
        match (&self.data, &self.cross_reference) {
            (AssetData::Sprite(s), _) => format!("{}#{}", s.texture, s.frame.name),
            (data, reference) => data
                .source()
                .map(str::to_string)
                .or_else(|| reference.clone())
                .unwrap_or_default(),
        }
    }
}

/// The ordered entry list for one build.
#[derive(Debug, Default)]
pub struct AssetCatalog {
    entries: Vec<CatalogEntry>,
    diagnostics: Diagnostics,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the entry list from a resolved configuration.
    ///
    /// Every built-in texture and every font is registered with `registry`
    /// under its category path, keyed by manifest source path.
    pub fn build(&mut self, config: &ResolvedConfig, registry: &mut IdentityRegistry) -> Result<&[CatalogEntry]> {
        self.entries.clear();
        self.diagnostics = Diagnostics::new();

        let files = &config.assets_files;

        for texture in &files.textures {
            if texture.include_sprites {
                self.splice_sprites(config, texture);
            }
            self.entries.push(CatalogEntry::new(
                Category::Textures,
                AssetData::Texture(texture.clone()),
                &texture.reference_path,
            ));
        }

        for blob in &files.audio {
            self.entries.push(CatalogEntry::new(
                Category::Audio,
                AssetData::Blob(blob.clone()),
                &blob.reference_path,
            ));
        }

        for blob in &files.other {
            self.entries.push(CatalogEntry::new(
                Category::Other,
                AssetData::Blob(blob.clone()),
                &blob.reference_path,
            ));
        }

        for font in &files.fonts {
            self.entries.push(CatalogEntry::new(
                Category::Fonts,
                AssetData::Font(font.clone()),
                &font.reference_path,
            ));
        }

        for entry in &self.entries {
            let Some(category_path) = entry.category.identity_path() else {
                continue;
            };
            if entry.is_external() {
                continue;
            }
            if let Some(source) = entry.data.source() {
                registry.register(source, category_path)?;
            }
        }

        tracing::debug!(
            entries = self.entries.len(),
            external = self.external_count(),
            "catalog built"
        );
        Ok(&self.entries)
    }

    fn splice_sprites(&mut self, config: &ResolvedConfig, texture: &TextureAsset) {
        let source = config.source_path(&texture.path);
        let frames = match load_frames(&source) {
            Ok(frames) => frames,
            Err(e) => {
                self.diagnostics.push(
                    Diagnostic::warning(SIDECAR_DIAGNOSTIC, &texture.path, e.to_string())
                        .with_help("The texture is still cataloged, without sprites"),
                );
                return;
            }
        };

        for frame in frames {
            let name = frame.name.clone();
            self.entries.push(CatalogEntry::new(
                Category::Sprites,
                AssetData::Sprite(SpriteAsset {
                    texture: texture.reference_path.clone(),
                    frame,
                }),
                &name,
            ));
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Warnings raised while building (bad sidecars).
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// `(cross_reference, resource index)` for every named entry.
    pub fn resource_table(&self) -> Vec<(String, usize)> {
        resource_table(&self.entries)
    }

    /// Entries shipped beside the binary rather than compiled in.
    pub fn external_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_external()).count()
    }
}

/// `(cross_reference, position)` for every named entry of an entry list.
pub fn resource_table(entries: &[CatalogEntry]) -> Vec<(String, usize)> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| entry.cross_reference.clone().map(|name| (name, index)))
        .collect()
}
