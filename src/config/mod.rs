//! Resolved build configuration.
//!
//! The schema layer resolves a project description into a plain nested map
//! once per build. This module gives that map a typed shape: directory
//! settings plus the asset manifest (`assets_files`), one list of records
//! per category.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CraftError, Result};

/// Default characters converted for a font with no explicit charset.
pub const DEFAULT_CHARSET: &str =
    "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// The resolved configuration for one build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedConfig {
    /// Project root; relative asset paths and directories resolve against it.
    #[serde(default = "default_project_path")]
    pub project_path: PathBuf,

    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    #[serde(default = "default_bin_dir")]
    pub bin_dir: PathBuf,

    /// Directory under `bin_dir` receiving external assets.
    #[serde(default = "default_output_assets_dir")]
    pub output_assets_dir: PathBuf,

    /// Remove the build directory before building.
    #[serde(default)]
    pub clean: bool,

    /// Target distribution name (e.g. "casio-cg", "desktop").
    #[serde(default)]
    pub distribution: Option<String>,

    /// Build plugins to run, by registered name.
    #[serde(default)]
    pub plugins: Vec<String>,

    #[serde(default)]
    pub assets_files: AssetFiles,
}

fn default_project_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_bin_dir() -> PathBuf {
    PathBuf::from("bin")
}

fn default_output_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            project_path: default_project_path(),
            build_dir: default_build_dir(),
            bin_dir: default_bin_dir(),
            output_assets_dir: default_output_assets_dir(),
            clean: false,
            distribution: None,
            plugins: vec![],
            assets_files: AssetFiles::default(),
        }
    }
}

/// The asset manifest, one list per category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetFiles {
    pub textures: Vec<TextureAsset>,
    pub fonts: Vec<FontAsset>,
    pub audio: Vec<BlobAsset>,
    pub other: Vec<BlobAsset>,
}

/// A texture manifest record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureAsset {
    pub path: String,
    #[serde(default)]
    pub reference_path: String,
    /// `rgb565`, `p8`, `p4`, or a full profile name.
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub alpha: bool,
    /// Shipped beside the binary instead of compiled in.
    #[serde(default)]
    pub external: bool,
    /// Read `<path>.sprites` and emit one sprite entry per rectangle.
    #[serde(default)]
    pub include_sprites: bool,
    /// Crop applied before encoding.
    #[serde(default)]
    pub area: Option<Area>,
}

fn default_format() -> String {
    "rgb565".to_string()
}

impl TextureAsset {
    pub fn new(path: impl Into<String>, reference_path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reference_path: reference_path.into(),
            format: default_format(),
            alpha: false,
            external: false,
            include_sprites: false,
            area: None,
        }
    }

    /// The encoding profile requested for this texture.
    ///
    /// `rgb565` with `alpha` set becomes `rgb565a`; the indexed shorthands
    /// are refined later from the image's own transparency.
    pub fn profile_name(&self) -> String {
        if self.alpha && self.format == "rgb565" {
            format!("{}a", self.format)
        } else {
            self.format.clone()
        }
    }
}

/// A crop rectangle. Missing fields default to the full image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    #[serde(default)]
    pub x: u32,
    #[serde(default)]
    pub y: u32,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// A font manifest record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontAsset {
    pub path: String,
    #[serde(default)]
    pub reference_path: String,
    /// Pixel size to rasterize at.
    #[serde(default = "default_resolution")]
    pub resolution: i32,
    #[serde(default = "default_charset")]
    pub charset: String,
}

fn default_resolution() -> i32 {
    8
}

fn default_charset() -> String {
    DEFAULT_CHARSET.to_string()
}

impl FontAsset {
    pub fn new(path: impl Into<String>, reference_path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reference_path: reference_path.into(),
            resolution: default_resolution(),
            charset: default_charset(),
        }
    }
}

/// An audio or opaque binary record, copied verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobAsset {
    pub path: String,
    #[serde(default)]
    pub reference_path: String,
}

impl BlobAsset {
    pub fn new(path: impl Into<String>, reference_path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reference_path: reference_path.into(),
        }
    }
}

impl ResolvedConfig {
    /// Load from a JSON or YAML file, chosen by extension.
    ///
    /// A relative `project_path` resolves against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CraftError::io(path, "Failed to read configuration", e))?;

        let mut config = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::parse_yaml(&content)?,
            _ => Self::parse_json(&content)?,
        };

        if config.project_path.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.project_path = base.join(&config.project_path);
        }
        Ok(config)
    }

    /// Parse from a JSON string.
    pub fn parse_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| CraftError::Parse {
            message: format!("Invalid configuration: {}", e),
            help: Some("Check the resolved configuration JSON".to_string()),
        })
    }

    /// Parse from a YAML string.
    pub fn parse_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| CraftError::Parse {
            message: format!("Invalid configuration: {}", e),
            help: Some("Check the resolved configuration YAML".to_string()),
        })
    }

    /// Absolute-or-project-relative path of a manifest source path.
    pub fn source_path(&self, relative: &str) -> PathBuf {
        self.project_path.join(relative)
    }

    pub fn build_path(&self) -> PathBuf {
        self.project_path.join(&self.build_dir)
    }

    pub fn bin_path(&self) -> PathBuf {
        self.project_path.join(&self.bin_dir)
    }

    /// `{bin_dir}/{output_assets_dir}`.
    pub fn external_assets_path(&self) -> PathBuf {
        self.bin_path().join(&self.output_assets_dir)
    }

    /// `{build_dir}/assets`, home of built-in assets and the metadata file.
    pub fn builtin_assets_path(&self) -> PathBuf {
        self.build_path().join("assets")
    }

    /// `{build_dir}/uuid.json`.
    pub fn identity_path(&self) -> PathBuf {
        self.build_path().join("uuid.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_minimal_config() {
        let config = ResolvedConfig::parse_json("{}").unwrap();
        assert_eq!(config.build_dir, PathBuf::from("build"));
        assert_eq!(config.output_assets_dir, PathBuf::from("assets"));
        assert!(config.assets_files.textures.is_empty());
        assert!(!config.clean);
    }

    #[test]
    fn test_parse_full_json() {
        let json = r#"{
            "project_path": "/proj",
            "build_dir": "out/build",
            "bin_dir": "out/bin",
            "output_assets_dir": "data",
            "distribution": "casio-cg",
            "assets_files": {
                "textures": [
                    {"path": "img/hero.png", "reference_path": "hero", "format": "p8",
                     "alpha": true, "include_sprites": true,
                     "area": {"x": 2, "width": 8}}
                ],
                "fonts": [{"path": "f.ttf", "reference_path": "main", "resolution": 12, "charset": "abc"}],
                "audio": [{"path": "a.wav", "reference_path": "jump"}],
                "other": [{"path": "level.bin", "reference_path": "level1"}]
            }
        }"#;
        let config = ResolvedConfig::parse_json(json).unwrap();

        let tex = &config.assets_files.textures[0];
        assert_eq!(tex.format, "p8");
        assert!(tex.alpha);
        assert!(!tex.external);
        assert_eq!(
            tex.area,
            Some(Area { x: 2, y: 0, width: Some(8), height: None })
        );
        assert_eq!(config.assets_files.fonts[0].resolution, 12);
        assert_eq!(config.assets_files.audio[0].reference_path, "jump");
        assert_eq!(config.distribution.as_deref(), Some("casio-cg"));
        assert_eq!(config.external_assets_path(), PathBuf::from("/proj/out/bin/data"));
        assert_eq!(config.identity_path(), PathBuf::from("/proj/out/build/uuid.json"));
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
build_dir: b
assets_files:
  fonts:
    - path: fonts/pixel.ttf
"#;
        let config = ResolvedConfig::parse_yaml(yaml).unwrap();
        let font = &config.assets_files.fonts[0];
        assert_eq!(font.resolution, 8);
        assert_eq!(font.charset, DEFAULT_CHARSET);
    }

    #[test]
    fn test_invalid_config() {
        assert!(ResolvedConfig::parse_json("{\"assets_files\": 3}").is_err());
    }

    #[test]
    fn test_profile_name() {
        let mut tex = TextureAsset::new("a.png", "a");
        assert_eq!(tex.profile_name(), "rgb565");
        tex.alpha = true;
        assert_eq!(tex.profile_name(), "rgb565a");
        tex.format = "p4".into();
        assert_eq!(tex.profile_name(), "p4");
    }
}
