//! Colour type and 16-bit packing.

use std::fmt;

use image::Rgba;

/// Alpha values below this are treated as fully transparent.
pub const ALPHA_THRESHOLD: u8 = 128;

/// An RGBA colour value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Colour {
    /// Create a new colour from RGBA components.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create a new opaque colour from RGB components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Fully transparent colour.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    /// Black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// White.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Magenta, stored in the alpha slot of indexed palettes.
    pub const MAGENTA: Self = Self::rgb(255, 0, 255);

    pub fn from_rgba(px: Rgba<u8>) -> Self {
        Self::new(px[0], px[1], px[2], px[3])
    }

    /// Convert to RGBA tuple.
    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Check if the colour is transparent once alpha is reduced to one bit.
    pub fn is_transparent(self) -> bool {
        self.a < ALPHA_THRESHOLD
    }

    /// Check if the colour is fully opaque.
    pub fn is_opaque(self) -> bool {
        self.a == 255
    }

    /// Same RGB, forced opaque.
    pub fn opaque(self) -> Self {
        Self::rgb(self.r, self.g, self.b)
    }

    /// Pack to 5-6-5 by truncating the low bits of each channel.
    pub fn to_rgb565(self) -> u16 {
        let r = (self.r >> 3) as u16;
        let g = (self.g >> 2) as u16;
        let b = (self.b >> 3) as u16;
        (r << 11) | (g << 5) | b
    }

    /// Expand a 5-6-5 value back to 8 bits per channel (low bits replicated).
    pub fn from_rgb565(c: u16) -> Self {
        let r = ((c >> 11) & 0x1f) as u8;
        let g = ((c >> 5) & 0x3f) as u8;
        let b = (c & 0x1f) as u8;
        Self::rgb(r << 3 | r >> 2, g << 2 | g >> 4, b << 3 | b >> 2)
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Weighted RGB colour distance.
///
/// Low-cost approximation from https://www.compuphase.com/cmetric.htm that
/// weights channels by the mean red value.
pub fn colour_distance(a: &Colour, b: &Colour) -> u32 {
    let rmean = (a.r as i32 + b.r as i32) / 2;
    let dr = a.r as i32 - b.r as i32;
    let dg = a.g as i32 - b.g as i32;
    let db = a.b as i32 - b.b as i32;

    let r_weight = 2 + (rmean >> 8);
    let g_weight = 4;
    let b_weight = 2 + ((255 - rmean) >> 8);

    (r_weight * dr * dr + g_weight * dg * dg + b_weight * db * db) as u32
}

/// Index of the palette entry closest to `colour`.
pub fn nearest_index(colour: &Colour, palette: &[Colour]) -> usize {
    let mut best_index = 0;
    let mut best_dist = u32::MAX;

    for (i, pc) in palette.iter().enumerate() {
        let dist = colour_distance(colour, pc);
        if dist < best_dist {
            best_dist = dist;
            best_index = i;
        }
    }

    best_index
}
