//! Encoding profiles.
//!
//! The ids, alpha sentinels and palette bases are fixed by the target
//! runtime's image loader and must not change.

use std::fmt;

use crate::error::{CraftError, Result};

/// Storage layout of pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// 16-bit RGB565, rows padded to 4 bytes.
    Rgb16,
    /// 8-bit palette indices.
    P8,
    /// 4-bit palette indices, high nibble first.
    P4,
}

/// A colour-display encoding profile.
#[derive(Debug, PartialEq, Eq)]
pub struct Profile {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub id: u8,
    pub depth: Depth,
    /// Value stored for transparent pixels, if the profile has alpha.
    pub alpha: Option<u16>,
    /// Stored index of the first quantized colour.
    pub palette_base: u16,
    /// Number of addressable palette slots (indices wrap modulo this).
    pub capacity: u16,
}

pub const RGB565: Profile = Profile {
    name: "rgb565",
    aliases: &["r5g6b5"],
    id: 0x0,
    depth: Depth::Rgb16,
    alpha: None,
    palette_base: 0,
    capacity: 0,
};

pub const RGB565A: Profile = Profile {
    name: "rgb565a",
    aliases: &["r5g6b5a"],
    id: 0x1,
    depth: Depth::Rgb16,
    alpha: Some(0x0001),
    palette_base: 0,
    capacity: 0,
};

pub const P8_RGB565: Profile = Profile {
    name: "p8_rgb565",
    aliases: &[],
    id: 0x4,
    depth: Depth::P8,
    alpha: None,
    palette_base: 0x80,
    capacity: 256,
};

pub const P8_RGB565A: Profile = Profile {
    name: "p8_rgb565a",
    aliases: &[],
    id: 0x5,
    depth: Depth::P8,
    alpha: Some(0x80),
    palette_base: 0x81,
    capacity: 256,
};

pub const P4_RGB565: Profile = Profile {
    name: "p4_rgb565",
    aliases: &[],
    id: 0x6,
    depth: Depth::P4,
    alpha: None,
    palette_base: 0,
    capacity: 16,
};

pub const P4_RGB565A: Profile = Profile {
    name: "p4_rgb565a",
    aliases: &[],
    id: 0x3,
    depth: Depth::P4,
    alpha: Some(0),
    palette_base: 1,
    capacity: 16,
};

pub static PROFILES: [&Profile; 6] = [
    &RGB565,
    &RGB565A,
    &P8_RGB565,
    &P8_RGB565A,
    &P4_RGB565,
    &P4_RGB565A,
];

impl Profile {
    /// Look a profile up by name or alias.
    pub fn find(name: &str) -> Option<&'static Profile> {
        PROFILES
            .iter()
            .copied()
            .find(|p| p.name == name || p.aliases.contains(&name))
    }

    /// Pick the concrete profile for a request.
    ///
    /// An empty request, `p8` or `p4` selects the alpha variant when the
    /// image has transparent pixels. Anything else must name a profile
    /// exactly, and that profile must support transparency if the image
    /// needs it.
    pub fn resolve(request: &str, has_transparency: bool) -> Result<&'static Profile> {
        let name = match (request, has_transparency) {
            ("", true) => "rgb565a",
            ("", false) => "rgb565",
            ("p8", true) => "p8_rgb565a",
            ("p8", false) => "p8_rgb565",
            ("p4", true) => "p4_rgb565a",
            ("p4", false) => "p4_rgb565",
            (name, _) => name,
        };

        let profile = Profile::find(name).ok_or_else(|| CraftError::Format {
            message: format!("Unknown image profile '{}'", name),
            help: Some(format!(
                "Known profiles: {}, or the shorthands p8 and p4",
                PROFILES.iter().map(|p| p.name).collect::<Vec<_>>().join(", ")
            )),
        })?;

        if has_transparency && !profile.has_alpha() {
            return Err(CraftError::Format {
                message: format!("Image has transparency, which {} doesn't support", profile.name),
                help: Some(format!("Use {}a or an indexed shorthand", profile.name.trim_end_matches('a'))),
            });
        }
        Ok(profile)
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    pub fn is_indexed(&self) -> bool {
        self.depth != Depth::Rgb16
    }

    /// Colours the quantizer may produce, leaving room for the alpha slot.
    pub fn quantized_colours(&self) -> usize {
        self.capacity as usize - usize::from(self.has_alpha())
    }

    /// Stored index of palette slot 0 (the alpha slot for alpha profiles).
    pub fn palette_origin(&self) -> u16 {
        self.alpha.unwrap_or(self.palette_base)
    }

    /// Bytes per row.
    pub fn stride(&self, width: usize) -> usize {
        match self.depth {
            Depth::Rgb16 => (width + 1) / 2 * 4,
            Depth::P8 => width,
            Depth::P4 => (width + 1) / 2,
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
