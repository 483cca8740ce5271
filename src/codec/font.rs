//! Bitmap font codec.
//!
//! Layout (big-endian):
//!
//! ```text
//! u8  pixel size
//! u16 glyph count
//! per glyph:
//!   u32 code point
//!   i8  left, top, right, bottom
//!   u16 data length
//!   ..  1-bit pixels, row-major over the whole box, MSB first
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use fontdue::{Font, FontSettings};

use crate::error::{CraftError, Result};

/// Coverage at or above this is an ink pixel.
pub const INK_THRESHOLD: u8 = 128;

/// A rasterized glyph in box coordinates (y grows down from the ascent line).
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGlyph {
    pub left: i32,
    pub top: i32,
    pub width: usize,
    pub height: usize,
    /// Horizontal advance in pixels.
    pub advance: f32,
    /// Row-major coverage, `width * height` bytes.
    pub coverage: Vec<u8>,
}

/// Something that can rasterize characters.
pub trait GlyphSource {
    /// Rasterize `c` at `px` pixels, or `None` if the font lacks it.
    fn glyph(&self, c: char, px: f32) -> Option<RasterGlyph>;
}

/// A TrueType/OpenType font backed by `fontdue`.
pub struct TrueTypeFont {
    font: Font,
}

impl TrueTypeFont {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|e| CraftError::Font {
            message: format!("Invalid font data: {}", e),
        })?;
        Ok(Self { font })
    }

    pub fn open(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).map_err(|e| CraftError::io(path, "Failed to read font", e))?;
        Self::from_bytes(bytes).map_err(|e| match e {
            CraftError::Font { message } => CraftError::Font {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })
    }
}

impl GlyphSource for TrueTypeFont {
    fn glyph(&self, c: char, px: f32) -> Option<RasterGlyph> {
        let index = self.font.lookup_glyph_index(c);
        if index == 0 {
            return None;
        }
        let (metrics, coverage) = self.font.rasterize_indexed(index, px);
        let ascent = self
            .font
            .horizontal_line_metrics(px)
            .map(|m| m.ascent.round() as i32)
            .unwrap_or(px as i32);

        Some(RasterGlyph {
            left: metrics.xmin,
            top: ascent - (metrics.ymin + metrics.height as i32),
            width: metrics.width,
            height: metrics.height,
            advance: metrics.advance_width,
            coverage,
        })
    }
}

/// One glyph of a [`FontRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphRecord {
    pub codepoint: u32,
    pub left: i8,
    pub top: i8,
    pub right: i8,
    pub bottom: i8,
    pub data: Vec<u8>,
}

impl GlyphRecord {
    pub fn width(&self) -> i32 {
        self.right as i32 - self.left as i32
    }

    pub fn height(&self) -> i32 {
        self.bottom as i32 - self.top as i32
    }

    /// Whether the pixel at box coordinates (x, y) is inked.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        let bit = y * self.width().max(0) as usize + x;
        self.data
            .get(bit / 8)
            .is_some_and(|byte| byte & (0x80 >> (bit % 8)) != 0)
    }
}

/// An encoded bitmap font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontRecord {
    pub size: u8,
    pub glyphs: Vec<GlyphRecord>,
}

/// Pack coverage to one bit per pixel, MSB first, padding the final byte.
pub fn pack_bits(coverage: &[u8]) -> Vec<u8> {
    coverage
        .chunks(8)
        .map(|chunk| {
            chunk.iter().enumerate().fold(0u8, |byte, (i, &v)| {
                if v >= INK_THRESHOLD {
                    byte | (0x80 >> i)
                } else {
                    byte
                }
            })
        })
        .collect()
}

fn to_i8(value: i32, c: char) -> Result<i8> {
    i8::try_from(value).map_err(|_| CraftError::Validation {
        message: format!("Glyph {:?} has a bounding box coordinate {} outside -128..127", c, value),
        help: Some("Use a smaller font resolution".to_string()),
    })
}

/// Rasterize `charset` at `size` pixels.
///
/// Characters are deduplicated and emitted in code-point order. Characters
/// the font does not cover are skipped with a warning.
pub fn encode_font(source: &dyn GlyphSource, size: i32, charset: &str) -> Result<FontRecord> {
    if size <= 0 {
        return Err(CraftError::Validation {
            message: format!("Font resolution must be greater than 0 (got {})", size),
            help: Some("Set a positive 'resolution' on the font".to_string()),
        });
    }
    let header_size = u8::try_from(size).map_err(|_| CraftError::Validation {
        message: format!("Font resolution {} does not fit in one byte", size),
        help: Some("Use a resolution of at most 255".to_string()),
    })?;

    let chars: BTreeSet<char> = charset.chars().collect();
    let mut glyphs = Vec::with_capacity(chars.len());

    for c in chars {
        let Some(raster) = source.glyph(c, size as f32) else {
            tracing::warn!(character = ?c, codepoint = c as u32, "font has no glyph; skipped");
            continue;
        };

        let (left, top, right, bottom, data) = if raster.width == 0 || raster.height == 0 {
            let advance = raster.advance.round() as i32;
            (0, 0, advance, size, Vec::new())
        } else {
            (
                raster.left,
                raster.top,
                raster.left + raster.width as i32,
                raster.top + raster.height as i32,
                pack_bits(&raster.coverage),
            )
        };

        if data.len() > u16::MAX as usize {
            return Err(CraftError::validation(format!(
                "Glyph {:?} needs {} bytes, more than a glyph record can hold",
                c,
                data.len()
            )));
        }

        glyphs.push(GlyphRecord {
            codepoint: c as u32,
            left: to_i8(left, c)?,
            top: to_i8(top, c)?,
            right: to_i8(right, c)?,
            bottom: to_i8(bottom, c)?,
            data,
        });
    }

    if glyphs.len() > u16::MAX as usize {
        return Err(CraftError::Validation {
            message: format!(
                "Font covers {} characters, more than the {} a font record can hold",
                glyphs.len(),
                u16::MAX
            ),
            help: Some("Narrow the font's charset".to_string()),
        });
    }

    Ok(FontRecord {
        size: header_size,
        glyphs,
    })
}

impl FontRecord {
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn glyph(&self, c: char) -> Option<&GlyphRecord> {
        self.glyphs.iter().find(|g| g.codepoint == c as u32)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(self.size);
        out.extend_from_slice(&(self.glyphs.len() as u16).to_be_bytes());
        for g in &self.glyphs {
            out.extend_from_slice(&g.codepoint.to_be_bytes());
            out.extend_from_slice(&[g.left as u8, g.top as u8, g.right as u8, g.bottom as u8]);
            out.extend_from_slice(&(g.data.len() as u16).to_be_bytes());
            out.extend_from_slice(&g.data);
        }
        out
    }

    /// Read a record back from its binary form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader { rest: bytes };

        let size = reader.take(1)?[0];
        let count = reader.take(2)?;
        let count = u16::from_be_bytes([count[0], count[1]]);
        let mut glyphs = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let head = reader.take(10)?;
            let codepoint = u32::from_be_bytes([head[0], head[1], head[2], head[3]]);
            let (left, top, right, bottom) =
                (head[4] as i8, head[5] as i8, head[6] as i8, head[7] as i8);
            let len = u16::from_be_bytes([head[8], head[9]]) as usize;
            let data = reader.take(len)?.to_vec();
            glyphs.push(GlyphRecord {
                codepoint,
                left,
                top,
                right,
                bottom,
                data,
            });
        }
        if !reader.rest.is_empty() {
            return Err(CraftError::Parse {
                message: format!("Font data has {} trailing bytes", reader.rest.len()),
                help: None,
            });
        }
        Ok(Self { size, glyphs })
    }
}

struct Reader<'a> {
    rest: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.rest.len() < n {
            return Err(CraftError::Parse {
                message: "Font data is truncated".to_string(),
                help: None,
            });
        }
        let (head, tail) = self.rest.split_at(n);
        self.rest = tail;
        Ok(head)
    }
}
