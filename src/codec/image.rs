//! Colour image codec: RGB565 direct and P8/P4 indexed.
//!
//! Multi-byte values are big-endian, matching the target's loader.

use std::path::Path;

use image::{imageops, RgbaImage};

use crate::config::Area;
use crate::error::{CraftError, Result};
use crate::types::Colour;

use super::profile::{Depth, Profile};
use super::quantize::quantize;

/// Largest accepted width or height.
pub const MAX_DIMENSION: u32 = 65535;

/// An encoded image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub profile: &'static Profile,
    pub width: u16,
    pub height: u16,
    /// Bytes per row.
    pub stride: usize,
    /// Palette entries, or -1 for direct colour.
    pub color_count: i16,
    pub data: Vec<u8>,
    /// RGB565 palette entries; empty for direct colour.
    pub palette: Vec<u16>,
}

/// Load any raster format the `image` crate understands as RGBA8.
pub fn load_image(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path).map_err(|e| CraftError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to load image: {}", e),
    })?;
    Ok(img.to_rgba8())
}

/// Whether any pixel is transparent once alpha is reduced to one bit.
pub fn has_transparency(img: &RgbaImage) -> bool {
    img.pixels().any(|px| Colour::from_rgba(*px).is_transparent())
}

fn check_dimensions(img: &RgbaImage, limit: u32) -> Result<()> {
    if img.width() > limit || img.height() > limit {
        return Err(CraftError::Size {
            message: format!(
                "Image is too large ({}x{}, max. {}x{})",
                img.width(),
                img.height(),
                limit,
                limit
            ),
        });
    }
    Ok(())
}

/// Crop to `area`. Missing width/height extend to the image edge.
pub fn crop(img: &RgbaImage, area: &Area) -> Result<RgbaImage> {
    let (iw, ih) = img.dimensions();
    let w = area.width.unwrap_or_else(|| iw.saturating_sub(area.x));
    let h = area.height.unwrap_or_else(|| ih.saturating_sub(area.y));

    let fits = area.x.checked_add(w).is_some_and(|r| r <= iw)
        && area.y.checked_add(h).is_some_and(|b| b <= ih);
    if !fits || w == 0 || h == 0 {
        return Err(CraftError::Format {
            message: format!(
                "Area {}x{}+{}+{} lies outside the {}x{} image",
                w, h, area.x, area.y, iw, ih
            ),
            help: Some("Check the texture's area x/y/width/height".to_string()),
        });
    }
    Ok(imageops::crop_imm(img, area.x, area.y, w, h).to_image())
}

/// Encode with an optional crop applied first. The dimension ceiling applies
/// to the cropped region, not the source image.
pub fn encode_area(img: &RgbaImage, request: &str, area: Option<&Area>) -> Result<ImageRecord> {
    match area {
        Some(area) => encode(&crop(img, area)?, request),
        None => encode(img, request),
    }
}

/// Encode an image with a requested profile (`""`, `p8`, `p4` or a full name).
pub fn encode(img: &RgbaImage, request: &str) -> Result<ImageRecord> {
    check_dimensions(img, MAX_DIMENSION)?;

    let transparent = has_transparency(img);
    let profile = Profile::resolve(request, transparent)?;
    let (w, h) = (img.width() as usize, img.height() as usize);

    // Row-major pixels plus a one-bit alpha mask.
    let mut pixels: Vec<Colour> = img.pixels().map(|px| Colour::from_rgba(*px)).collect();
    let opaque: Vec<bool> = pixels.iter().map(|c| !c.is_transparent()).collect();

    // Transparent pixels borrow a colour already in the image so they do
    // not claim a palette slot. Column-major scan picks the first one.
    let background = (0..w)
        .flat_map(|x| (0..h).map(move |y| y * w + x))
        .find(|&i| opaque[i])
        .map(|i| pixels[i].opaque())
        .unwrap_or(Colour::BLACK);
    for (px, &is_opaque) in pixels.iter_mut().zip(&opaque) {
        *px = if is_opaque { px.opaque() } else { background };
    }

    let stride = profile.stride(w);
    let mut data = vec![0u8; stride * h];
    let alpha = profile.alpha.unwrap_or(0);

    if profile.depth == Depth::Rgb16 {
        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                let mut c = pixels[i].to_rgb565();
                if !opaque[i] {
                    c = alpha;
                } else if profile.alpha == Some(c) {
                    c ^= 1;
                }
                let offset = stride * y + x * 2;
                data[offset..offset + 2].copy_from_slice(&c.to_be_bytes());
            }
        }

        return Ok(ImageRecord {
            profile,
            width: w as u16,
            height: h as u16,
            stride,
            color_count: -1,
            data,
            palette: vec![],
        });
    }

    let quantized = quantize(&pixels, profile.quantized_colours());
    let mut palette: Vec<Colour> = Vec::with_capacity(quantized.palette.len() + 1);
    if profile.has_alpha() {
        palette.push(Colour::MAGENTA);
    }
    palette.extend(&quantized.palette);

    let capacity = profile.capacity;
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let stored = if opaque[i] {
                (profile.palette_base + quantized.indices[i] as u16) % capacity
            } else {
                alpha
            };
            let c = stored as u8;

            match profile.depth {
                Depth::P8 => data[stride * y + x] = c,
                _ => {
                    let offset = stride * y + x / 2;
                    data[offset] |= if x % 2 == 0 { c << 4 } else { c & 0x0f };
                }
            }
        }
    }

    Ok(ImageRecord {
        profile,
        width: w as u16,
        height: h as u16,
        stride,
        color_count: palette.len() as i16,
        data,
        palette: palette.iter().map(|c| c.to_rgb565()).collect(),
    })
}

impl ImageRecord {
    pub fn has_alpha(&self) -> bool {
        self.profile.has_alpha()
    }

    /// Raw stored value at a pixel: an RGB565 word or a palette index.
    pub fn raw_pixel(&self, x: usize, y: usize) -> u16 {
        let row = self.stride * y;
        match self.profile.depth {
            Depth::Rgb16 => {
                let o = row + x * 2;
                u16::from_be_bytes([self.data[o], self.data[o + 1]])
            }
            Depth::P8 => self.data[row + x] as u16,
            Depth::P4 => {
                let byte = self.data[row + x / 2];
                (if x % 2 == 0 { byte >> 4 } else { byte & 0x0f }) as u16
            }
        }
    }

    /// Decoded colour at a pixel, `None` where transparent.
    pub fn colour_at(&self, x: usize, y: usize) -> Option<Colour> {
        let raw = self.raw_pixel(x, y);
        if self.profile.alpha == Some(raw) {
            return None;
        }
        if !self.profile.is_indexed() {
            return Some(Colour::from_rgb565(raw));
        }
        let capacity = self.profile.capacity;
        let slot = (raw + capacity - self.profile.palette_origin()) % capacity;
        self.palette
            .get(slot as usize)
            .map(|&c| Colour::from_rgb565(c))
    }

    /// Serialize: id, flags, colour count, width, height, stride, then the
    /// length-prefixed pixel data and palette.
    pub fn to_bytes(&self) -> Vec<u8> {
        let palette_len = self.palette.len() * 2;
        let mut out = Vec::with_capacity(18 + self.data.len() + palette_len);
        out.push(self.profile.id);
        out.push(u8::from(self.has_alpha()));
        out.extend_from_slice(&self.color_count.to_be_bytes());
        out.extend_from_slice(&self.width.to_be_bytes());
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&(self.stride as i32).to_be_bytes());
        out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.data);
        out.extend_from_slice(&(palette_len as u32).to_be_bytes());
        for entry in &self.palette {
            out.extend_from_slice(&entry.to_be_bytes());
        }
        out
    }
}
