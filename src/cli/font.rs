//! Font command: rasterize a TrueType/OpenType font to a bitmap font blob.

use std::path::PathBuf;

use clap::Args;

use crate::codec::{encode_font, TrueTypeFont};
use crate::config::DEFAULT_CHARSET;
use crate::error::Result;
use crate::export::OutputWriter;
use crate::output::{display_path, plural, Printer};

/// Rasterize a font to a binary bitmap font
#[derive(Args, Debug)]
pub struct FontArgs {
    /// Source font (.ttf or .otf)
    pub input: PathBuf,

    /// Pixel size
    #[arg(long, short, default_value_t = 8)]
    pub size: i32,

    /// Characters to include (default: digits and ASCII letters)
    #[arg(long, short)]
    pub charset: Option<String>,

    /// Output file
    #[arg(long, short)]
    pub output: PathBuf,
}

pub fn run(args: FontArgs, printer: &Printer) -> Result<()> {
    let font = TrueTypeFont::open(&args.input)?;
    let charset = args.charset.as_deref().unwrap_or(DEFAULT_CHARSET);
    let record = encode_font(&font, args.size, charset)?;

    let requested = charset.chars().collect::<std::collections::BTreeSet<_>>().len();
    if record.glyph_count() < requested {
        printer.warning(
            "Missing",
            &format!(
                "{} not covered by {}",
                plural(requested - record.glyph_count(), "character", "characters"),
                display_path(&args.input)
            ),
        );
    }

    let mut writer = OutputWriter::new();
    let verb = if writer.write_if_changed(&args.output, &record.to_bytes())? {
        "Rasterized"
    } else {
        "Fresh"
    };
    printer.status(
        verb,
        &format!(
            "{} ({}px, {}) -> {}",
            display_path(&args.input),
            record.size,
            plural(record.glyph_count(), "glyph", "glyphs"),
            printer.cyan(&display_path(&args.output))
        ),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CraftError;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_missing_font_is_io_error() {
        let dir = tempdir().unwrap();
        let args = FontArgs {
            input: dir.path().join("missing.ttf"),
            size: 8,
            charset: None,
            output: dir.path().join("out.font"),
        };
        let err = run(args, &Printer::plain()).unwrap_err();
        assert!(matches!(err, CraftError::Io { .. }));
    }

    #[test]
    fn test_garbage_font_is_rejected() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("bad.ttf");
        fs::write(&input, b"not a font").unwrap();
        let args = FontArgs {
            input,
            size: 8,
            charset: Some("abc".to_string()),
            output: dir.path().join("out.font"),
        };
        assert!(matches!(run(args, &Printer::plain()), Err(CraftError::Font { .. })));
        assert!(!dir.path().join("out.font").exists());
    }
}
