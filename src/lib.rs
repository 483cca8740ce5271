//! particraft - asset conversion and identity pipeline
//!
//! Turns a project's asset manifest into platform-ready files: stable
//! identifiers for compiled-in assets, RGB565/indexed/legacy image records,
//! bitmap fonts, and the metadata manifest the downstream code generator
//! reads.

pub mod catalog;
pub mod cli;
pub mod codec;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod distribution;
pub mod error;
pub mod export;
pub mod identity;
pub mod output;
pub mod types;

pub use catalog::{AssetCatalog, AssetData, CatalogEntry, Category, SpriteAsset};
pub use codec::{
    encode, encode_area, encode_font, encode_mono, FontRecord, GlyphRecord, GlyphSource,
    ImageRecord, MonoRecord, Profile, TrueTypeFont,
};
pub use config::{Area, AssetFiles, BlobAsset, FontAsset, ResolvedConfig, TextureAsset};
pub use context::{BuildContext, BuildOutcome};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use distribution::{BuildPlugin, Capabilities, CapabilitiesBuilder, Distribution};
pub use error::{CraftError, Result};
pub use export::{ExportPipeline, ExportPolicy, ExportReport};
pub use identity::{Identifier, IdentityRegistry};
pub use types::Colour;
