//! Sprite-sheet sidecar files.
//!
//! A texture at `img/hero.png` may carry `img/hero.png.sprites`, a JSON
//! array of named rectangles:
//!
//! ```json
//! [{"name": "head", "x": 0, "y": 0, "w": 8, "h": 8}]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CraftError, Result};

/// Extension appended to a texture path to find its sidecar.
pub const SIDECAR_EXTENSION: &str = "sprites";

/// A named sub-rectangle of a texture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// `<texture>.sprites`, next to the texture source.
pub fn sidecar_path(texture: &Path) -> PathBuf {
    let mut name = texture.as_os_str().to_os_string();
    name.push(".");
    name.push(SIDECAR_EXTENSION);
    PathBuf::from(name)
}

/// Parse sidecar content, preserving the file's order.
pub fn parse_frames(content: &str) -> Result<Vec<Frame>> {
    serde_json::from_str(content).map_err(|e| CraftError::Parse {
        message: format!("Invalid sprite sidecar: {}", e),
        help: Some("Expected a JSON array of {\"name\", \"x\", \"y\", \"w\", \"h\"} objects".to_string()),
    })
}

/// Read and parse the sidecar for a texture.
pub fn load_frames(texture: &Path) -> Result<Vec<Frame>> {
    let path = sidecar_path(texture);
    let content = fs::read_to_string(&path)
        .map_err(|e| CraftError::io(&path, "Failed to read sprite sidecar", e))?;
    parse_frames(&content)
}
