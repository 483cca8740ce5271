//! Binary asset codecs.
//!
//! - [`image`]: RGB565 direct colour and P8/P4 indexed images
//! - [`mono`]: legacy monochrome/gray layered bitmaps
//! - [`font`]: 1-bit proportional bitmap fonts

pub mod font;
pub mod image;
pub mod mono;
pub mod profile;
pub mod quantize;

pub use self::font::{encode_font, FontRecord, GlyphRecord, GlyphSource, RasterGlyph, TrueTypeFont};
pub use self::image::{encode, encode_area, has_transparency, load_image, ImageRecord, MAX_DIMENSION};
pub use self::mono::{encode_mono, DitherMethod, LegacyProfile, MonoRecord, Shade};
pub use self::profile::{Depth, Profile, PROFILES};
