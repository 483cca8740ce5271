//! Legacy monochrome/gray layered bitmaps.
//!
//! Pixels are reduced to black, dark gray, light gray, white or
//! transparent, then split into one to three bit planes. Each plane is
//! padded to 32-bit rows and the planes are interleaved one longword at a
//! time.

use std::fmt;

use image::RgbaImage;

use crate::config::Area;
use crate::error::{CraftError, Result};
use crate::types::{nearest_index, Colour};

use super::image::crop;

/// Largest accepted width or height for layered bitmaps.
pub const MAX_LEGACY_DIMENSION: u32 = 4095;

/// The five values a layered bitmap can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shade {
    Black,
    Dark,
    Light,
    White,
    Alpha,
}

const OPAQUE_SHADES: [Shade; 4] = [Shade::Black, Shade::Dark, Shade::Light, Shade::White];

impl Shade {
    pub fn colour(self) -> Colour {
        match self {
            Shade::Black => Colour::rgb(0, 0, 0),
            Shade::Dark => Colour::rgb(85, 85, 85),
            Shade::Light => Colour::rgb(170, 170, 170),
            Shade::White => Colour::rgb(255, 255, 255),
            Shade::Alpha => Colour::TRANSPARENT,
        }
    }
}

fn is_opaque(s: Shade) -> bool {
    s != Shade::Alpha
}

fn is_black(s: Shade) -> bool {
    s == Shade::Black
}

fn black_or_light(s: Shade) -> bool {
    matches!(s, Shade::Black | Shade::Light)
}

fn black_or_dark(s: Shade) -> bool {
    matches!(s, Shade::Black | Shade::Dark)
}

/// A layered bitmap profile.
pub struct LegacyProfile {
    pub name: &'static str,
    pub id: u8,
    pub shades: &'static [Shade],
    /// One predicate per bit plane.
    pub layers: &'static [fn(Shade) -> bool],
}

impl fmt::Debug for LegacyProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyProfile")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("layers", &self.layers.len())
            .finish()
    }
}

pub static LEGACY_PROFILES: [LegacyProfile; 4] = [
    LegacyProfile {
        name: "mono",
        id: 0x0,
        shades: &[Shade::Black, Shade::White],
        layers: &[is_black],
    },
    LegacyProfile {
        name: "mono_alpha",
        id: 0x1,
        shades: &[Shade::Black, Shade::White, Shade::Alpha],
        layers: &[is_opaque, is_black],
    },
    LegacyProfile {
        name: "gray",
        id: 0x2,
        shades: &[Shade::Black, Shade::Dark, Shade::Light, Shade::White],
        layers: &[black_or_light, black_or_dark],
    },
    LegacyProfile {
        name: "gray_alpha",
        id: 0x3,
        shades: &[Shade::Black, Shade::Dark, Shade::Light, Shade::White, Shade::Alpha],
        layers: &[is_opaque, black_or_light, black_or_dark],
    },
];

impl LegacyProfile {
    pub fn find(name: &str) -> Option<&'static LegacyProfile> {
        LEGACY_PROFILES.iter().find(|p| p.name == name)
    }

    pub fn is_gray(&self) -> bool {
        self.shades.contains(&Shade::Dark) || self.shades.contains(&Shade::Light)
    }

    /// The smallest profile that holds every shade in `present`.
    fn smallest_for(present: &[Shade]) -> &'static LegacyProfile {
        let gray = present.contains(&Shade::Dark) || present.contains(&Shade::Light);
        let alpha = present.contains(&Shade::Alpha);
        let name = match (gray, alpha) {
            (false, false) => "mono",
            (false, true) => "mono_alpha",
            (true, false) => "gray",
            (true, true) => "gray_alpha",
        };
        &LEGACY_PROFILES[LEGACY_PROFILES.iter().position(|p| p.name == name).unwrap_or(0)]
    }
}

/// How colours are reduced to the four shades.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DitherMethod {
    /// Direct nearest-shade mapping.
    #[default]
    None,
    /// Ordered dithering using a Bayer 4x4 threshold matrix.
    Ordered,
}

impl DitherMethod {
    /// Parse a dither method from a string.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "ordered" | "bayer" => DitherMethod::Ordered,
            _ => DitherMethod::None,
        }
    }
}

impl fmt::Display for DitherMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DitherMethod::None => write!(f, "none"),
            DitherMethod::Ordered => write!(f, "ordered"),
        }
    }
}

/// Bayer 4x4 threshold matrix, values in [0, 16).
const BAYER_4X4: [[u8; 4]; 4] = [
    [0, 8, 2, 10],
    [12, 4, 14, 6],
    [3, 11, 1, 9],
    [15, 7, 13, 5],
];

/// Dither strength; half the gap between adjacent gray levels.
const DITHER_SPREAD: f32 = 85.0;

fn nearest_shade(colour: Colour) -> Shade {
    let palette = OPAQUE_SHADES.map(Shade::colour);
    OPAQUE_SHADES[nearest_index(&colour, &palette)]
}

/// Reduce every pixel to a shade, row-major.
pub fn quantize_shades(img: &RgbaImage, dither: DitherMethod) -> Vec<Shade> {
    img.enumerate_pixels()
        .map(|(x, y, px)| {
            let c = Colour::from_rgba(*px);
            if c.is_transparent() {
                return Shade::Alpha;
            }
            match dither {
                DitherMethod::None => nearest_shade(c),
                DitherMethod::Ordered => {
                    let threshold = BAYER_4X4[y as usize % 4][x as usize % 4] as f32 / 16.0 - 0.5;
                    let offset = threshold * DITHER_SPREAD;
                    let adjust = |v: u8| (v as f32 + offset).clamp(0.0, 255.0) as u8;
                    nearest_shade(Colour::rgb(adjust(c.r), adjust(c.g), adjust(c.b)))
                }
            }
        })
        .collect()
}

/// An encoded layered bitmap.
#[derive(Debug, Clone)]
pub struct MonoRecord {
    pub profile: &'static LegacyProfile,
    pub width: u16,
    pub height: u16,
    /// Interleaved layer longwords.
    pub data: Vec<u8>,
}

/// Project one bit plane into 32-bit padded rows.
fn project(shades: &[Shade], width: usize, height: usize, layer: fn(Shade) -> bool) -> Vec<u8> {
    let words = (width + 31) / 32;
    let mut data = vec![0u8; 4 * words * height];
    for y in 0..height {
        for x in 0..width {
            let bit = u8::from(layer(shades[y * width + x]));
            data[4 * y * words + (x >> 3)] |= bit << (!x & 7);
        }
    }
    data
}

/// Encode with a legacy profile name, or `""` to pick the smallest one.
pub fn encode_mono(
    img: &RgbaImage,
    request: &str,
    area: Option<&Area>,
    dither: DitherMethod,
) -> Result<MonoRecord> {
    if img.width() > MAX_LEGACY_DIMENSION || img.height() > MAX_LEGACY_DIMENSION {
        return Err(CraftError::Size {
            message: format!(
                "Image is too large ({}x{}, max. {}x{})",
                img.width(),
                img.height(),
                MAX_LEGACY_DIMENSION,
                MAX_LEGACY_DIMENSION
            ),
        });
    }

    let cropped;
    let img = match area {
        Some(area) => {
            cropped = crop(img, area)?;
            &cropped
        }
        None => img,
    };

    let (w, h) = (img.width() as usize, img.height() as usize);
    let shades = quantize_shades(img, dither);
    let mut present: Vec<Shade> = Vec::new();
    for s in &shades {
        if !present.contains(s) {
            present.push(*s);
        }
    }

    let profile = if request.is_empty() {
        LegacyProfile::smallest_for(&present)
    } else {
        let profile = LegacyProfile::find(request).ok_or_else(|| CraftError::Format {
            message: format!("Unknown legacy profile '{}'", request),
            help: Some("Known profiles: mono, mono_alpha, gray, gray_alpha".to_string()),
        })?;
        if let Some(missing) = present.iter().find(|s| !profile.shades.contains(s)) {
            return Err(CraftError::format(format!(
                "{} has too few colours for this image (found {:?})",
                profile.name, missing
            )));
        }
        profile
    };

    let layers: Vec<Vec<u8>> = profile
        .layers
        .iter()
        .map(|layer| project(&shades, w, h, *layer))
        .collect();

    let size = layers.first().map(Vec::len).unwrap_or(0);
    let mut data = Vec::with_capacity(size * layers.len());
    for longword in 0..size / 4 {
        for layer in &layers {
            data.extend_from_slice(&layer[4 * longword..4 * longword + 4]);
        }
    }

    Ok(MonoRecord {
        profile,
        width: w as u16,
        height: h as u16,
        data,
    })
}

impl MonoRecord {
    /// Header byte, 24-bit `(width << 12) | height`, then layer data.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.data.len());
        let gray = if self.profile.is_gray() { 0x80 } else { 0 };
        out.push(gray | self.profile.id);
        let dims = ((self.width as u32) << 12) | self.height as u32;
        out.extend_from_slice(&dims.to_be_bytes()[1..]);
        out.extend_from_slice(&self.data);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn image_from(w: u32, h: u32, pixels: &[[u8; 4]]) -> RgbaImage {
        let mut img = RgbaImage::new(w, h);
        for (i, px) in pixels.iter().enumerate() {
            img.put_pixel(i as u32 % w, i as u32 / w, Rgba(*px));
        }
        img
    }

    const BLACK: [u8; 4] = [0, 0, 0, 255];
    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const DARK: [u8; 4] = [80, 90, 85, 255];
    const CLEAR: [u8; 4] = [0, 0, 0, 0];

    #[test]
    fn test_auto_selects_smallest_profile() {
        let mono = image_from(2, 1, &[BLACK, WHITE]);
        assert_eq!(encode_mono(&mono, "", None, DitherMethod::None).unwrap().profile.name, "mono");

        let alpha = image_from(2, 1, &[BLACK, CLEAR]);
        assert_eq!(
            encode_mono(&alpha, "", None, DitherMethod::None).unwrap().profile.name,
            "mono_alpha"
        );

        let gray = image_from(3, 1, &[BLACK, DARK, CLEAR]);
        assert_eq!(
            encode_mono(&gray, "", None, DitherMethod::None).unwrap().profile.name,
            "gray_alpha"
        );
    }

    #[test]
    fn test_mono_bit_layout() {
        // Black at x=0 and x=9 of a 10-wide row.
        let mut pixels = vec![WHITE; 10];
        pixels[0] = BLACK;
        pixels[9] = BLACK;
        let img = image_from(10, 1, &pixels);
        let rec = encode_mono(&img, "mono", None, DitherMethod::None).unwrap();

        assert_eq!(rec.data, vec![0x80, 0x40, 0x00, 0x00]);
        assert_eq!(rec.to_bytes(), vec![0x00, 0x00, 0xa0, 0x01, 0x80, 0x40, 0x00, 0x00]);
    }

    #[test]
    fn test_layers_interleave_by_longword() {
        let img = image_from(1, 2, &[BLACK, CLEAR]);
        let rec = encode_mono(&img, "mono_alpha", None, DitherMethod::None).unwrap();

        // Row 0: opaque layer, black layer; row 1: both clear.
        assert_eq!(
            rec.data,
            vec![0x80, 0, 0, 0, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_gray_header_flag() {
        let img = image_from(1, 1, &[DARK]);
        let rec = encode_mono(&img, "gray", None, DitherMethod::None).unwrap();
        assert_eq!(rec.to_bytes()[0], 0x82);
        // Dark gray: set only in the black-or-dark plane.
        assert_eq!(rec.data, vec![0, 0, 0, 0, 0x80, 0, 0, 0]);
    }

    #[test]
    fn test_profile_too_small() {
        let img = image_from(2, 1, &[BLACK, DARK]);
        assert!(matches!(
            encode_mono(&img, "mono", None, DitherMethod::None),
            Err(CraftError::Format { .. })
        ));
        assert!(encode_mono(&img, "quad", None, DitherMethod::None).is_err());
    }

    #[test]
    fn test_legacy_size_ceiling() {
        let img = RgbaImage::new(4096, 1);
        assert!(matches!(
            encode_mono(&img, "", None, DitherMethod::None),
            Err(CraftError::Size { .. })
        ));
        let img = RgbaImage::from_pixel(4095, 1, Rgba(WHITE));
        assert!(encode_mono(&img, "", None, DitherMethod::None).is_ok());
    }

    #[test]
    fn test_ordered_dither_mixes_levels() {
        let mid = [128, 128, 128, 255];
        let img = image_from(4, 4, &[mid; 16]);
        let shades = quantize_shades(&img, DitherMethod::Ordered);
        assert!(shades.contains(&Shade::Dark));
        assert!(shades.contains(&Shade::Light));

        let flat = quantize_shades(&img, DitherMethod::None);
        assert!(flat.iter().all(|s| *s == flat[0]));
    }
}
