//! Image command: encode a single image outside a project build.

use std::path::PathBuf;

use clap::Args;

use crate::codec::{encode_area, encode_mono, load_image, DitherMethod};
use crate::config::Area;
use crate::error::Result;
use crate::export::OutputWriter;
use crate::output::{display_path, Printer};

/// Encode one image to a binary image record
#[derive(Args, Debug)]
pub struct ImageArgs {
    /// Source image (PNG, BMP, ...)
    pub input: PathBuf,

    /// Output profile: rgb565, rgb565a, p8, p4 or a full profile name;
    /// with --legacy: mono, mono_alpha, gray, gray_alpha, or empty to pick
    #[arg(long, short, default_value = "p8")]
    pub profile: String,

    /// Output file
    #[arg(long, short)]
    pub output: PathBuf,

    /// Encode as a legacy layered monochrome/gray bitmap
    #[arg(long)]
    pub legacy: bool,

    /// Dithering for --legacy: none or ordered
    #[arg(long, default_value = "none")]
    pub dither: String,

    /// Crop rectangle as X,Y,W,H (W and H may be omitted)
    #[arg(long, value_parser = parse_area)]
    pub area: Option<Area>,
}

pub fn run(args: ImageArgs, printer: &Printer) -> Result<()> {
    let img = load_image(&args.input)?;

    let (bytes, summary) = if args.legacy {
        let profile = if args.profile == "p8" { "" } else { args.profile.as_str() };
        let dither = DitherMethod::from_str_lossy(&args.dither);
        let record = encode_mono(&img, profile, args.area.as_ref(), dither)?;
        let summary = format!("{}x{} {}", record.width, record.height, record.profile.name);
        (record.to_bytes(), summary)
    } else {
        let record = encode_area(&img, &args.profile, args.area.as_ref())?;
        let mut summary = format!("{}x{} {}", record.width, record.height, record.profile.name);
        if record.profile.is_indexed() {
            summary.push_str(&format!(", {} colours", record.color_count));
        }
        (record.to_bytes(), summary)
    };

    let mut writer = OutputWriter::new();
    let verb = if writer.write_if_changed(&args.output, &bytes)? {
        "Encoded"
    } else {
        "Fresh"
    };
    printer.status(
        verb,
        &format!(
            "{} ({}) -> {}",
            display_path(&args.input),
            summary,
            printer.cyan(&display_path(&args.output))
        ),
    );
    Ok(())
}

/// Parse `X,Y[,W[,H]]`.
fn parse_area(s: &str) -> std::result::Result<Area, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() < 2 || parts.len() > 4 {
        return Err(format!("Invalid area '{}' (expected X,Y[,W[,H]])", s));
    }
    let num = |p: &str| p.parse::<u32>().map_err(|_| format!("Invalid number '{}' in area", p));

    Ok(Area {
        x: num(parts[0])?,
        y: num(parts[1])?,
        width: parts.get(2).map(|p| num(p)).transpose()?,
        height: parts.get(3).map(|p| num(p)).transpose()?,
    })
}
