//! End-to-end checks of the catalog, codecs and export pipeline.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use particraft::codec::{encode, encode_font, GlyphSource, RasterGlyph};
use particraft::export::{FontLoader, METADATA_FILE};
use particraft::{
    AssetCatalog, AssetData, AssetFiles, BlobAsset, BuildContext, Capabilities, CraftError,
    FontAsset, IdentityRegistry, ResolvedConfig, TextureAsset,
};

/// Lowercase letters only; each glyph is as wide as its alphabet position.
struct LetterFont;

impl GlyphSource for LetterFont {
    fn glyph(&self, c: char, px: f32) -> Option<RasterGlyph> {
        if !c.is_ascii_lowercase() {
            return None;
        }
        let width = (c as u8 - b'a' + 1) as usize;
        let height = px as usize;
        Some(RasterGlyph {
            left: 0,
            top: 0,
            width,
            height,
            advance: width as f32 + 1.0,
            coverage: vec![255; width * height],
        })
    }
}

fn letter_loader() -> FontLoader {
    Rc::new(|_: &Path| Ok(Box::new(LetterFont) as Box<dyn GlyphSource>))
}

struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn write(&self, relative: &str, bytes: &[u8]) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    fn png(&self, relative: &str, img: &RgbaImage) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        img.save(path).unwrap();
    }

    fn config(&self, files: AssetFiles) -> ResolvedConfig {
        ResolvedConfig {
            project_path: self.dir.path().to_path_buf(),
            assets_files: files,
            ..ResolvedConfig::default()
        }
    }

    fn context(&self, files: AssetFiles) -> BuildContext {
        BuildContext::new(self.config(files))
            .unwrap()
            .with_font_loader(letter_loader())
    }

    /// Modification time of every file under the project's output dirs.
    fn output_mtimes(&self) -> Vec<(PathBuf, SystemTime)> {
        let mut out = Vec::new();
        for root in ["build", "bin"] {
            collect_mtimes(&self.path(root), &mut out);
        }
        out.sort();
        out
    }
}

fn collect_mtimes(dir: &Path, out: &mut Vec<(PathBuf, SystemTime)>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect_mtimes(&path, out);
        } else {
            let modified = fs::metadata(&path).unwrap().modified().unwrap();
            out.push((path, modified));
        }
    }
}

fn full_project() -> (Project, AssetFiles) {
    let project = Project::new();
    project.png("img/hero.png", &RgbaImage::from_pixel(8, 8, Rgba([200, 40, 40, 255])));
    project.png("img/sky.png", &RgbaImage::from_pixel(4, 4, Rgba([40, 40, 200, 255])));
    project.write("fonts/main.ttf", b"font");
    project.write("sfx/jump.wav", b"RIFF....");
    project.write("data/level.bin", &[1, 2, 3]);

    let mut sky = TextureAsset::new("img/sky.png", "sky");
    sky.external = true;
    sky.format = "p4".to_string();

    let files = AssetFiles {
        textures: vec![TextureAsset::new("img/hero.png", "hero"), sky],
        fonts: vec![FontAsset::new("fonts/main.ttf", "main")],
        audio: vec![BlobAsset::new("sfx/jump.wav", "jump")],
        other: vec![BlobAsset::new("data/level.bin", "level")],
    };
    (project, files)
}

#[test]
fn second_build_touches_nothing() {
    let (project, files) = full_project();
    let caps = Capabilities::builtin();

    let mut ctx = project.context(files.clone());
    let first = ctx.build(&caps, None).unwrap();
    assert_eq!(first.report.skipped, 0);
    assert_eq!(first.report.exported, 5);
    assert!(first.report.manifest_written);
    let before = project.output_mtimes();
    let bytes_before: Vec<Vec<u8>> = before.iter().map(|(p, _)| fs::read(p).unwrap()).collect();

    let mut ctx = project.context(files);
    let second = ctx.build(&caps, None).unwrap();

    assert_eq!(second.report.stats.written, 0);
    assert!(!second.report.manifest_written);
    assert!(!second.report.registry_written);
    let after = project.output_mtimes();
    assert_eq!(before, after);
    let bytes_after: Vec<Vec<u8>> = after.iter().map(|(p, _)| fs::read(p).unwrap()).collect();
    assert_eq!(bytes_before, bytes_after);
}

#[test]
fn one_byte_change_rewrites_only_that_file() {
    let (project, files) = full_project();
    let caps = Capabilities::builtin();

    project.context(files.clone()).build(&caps, None).unwrap();
    project.write("data/level.bin", &[1, 2, 4]);

    let outcome = project.context(files).build(&caps, None).unwrap();
    assert_eq!(outcome.report.stats.written, 1);

    let index = outcome
        .resources
        .iter()
        .find(|(name, _)| name == "level")
        .map(|(_, index)| *index)
        .unwrap();
    let dest = project.path(&format!("bin/assets/{}.asset", index));
    assert_eq!(fs::read(dest).unwrap(), vec![1, 2, 4]);
}

#[test]
fn identifiers_survive_registry_lifetimes() {
    let (project, files) = full_project();
    let config = project.config(files);
    let identity = config.identity_path();

    let mut first = IdentityRegistry::open(&identity).unwrap();
    AssetCatalog::new().build(&config, &mut first).unwrap();
    let hero = first.resolve("img/hero.png").cloned().unwrap();
    let font = first.resolve("fonts/main.ttf").cloned().unwrap();
    assert_ne!(hero, font);
    assert!(first.persist().unwrap());

    let mut second = IdentityRegistry::open(&identity).unwrap();
    assert_eq!(second.register("img/hero.png", "assets.textures").unwrap(), hero);
    assert_eq!(second.register("fonts/main.ttf", "assets.fonts").unwrap(), font);
    assert_eq!(second.locate(&hero), Some("assets.textures"));
    let other = second.register("img/new.png", "assets.textures").unwrap();
    assert!(other != hero && other != font);
}

#[test]
fn external_assets_skip_the_registry() {
    let (project, files) = full_project();
    let mut ctx = project.context(files);
    ctx.build(&Capabilities::builtin(), None).unwrap();

    assert!(ctx.registry.resolve("img/sky.png").is_none());
    assert!(ctx.registry.resolve("sfx/jump.wav").is_none());
    assert_eq!(ctx.registry.len(), 2);
}

#[test]
fn manifest_lists_textures_then_fonts() {
    let (project, files) = full_project();
    let mut ctx = project.context(files);
    ctx.build(&Capabilities::builtin(), None).unwrap();

    let hero = ctx.registry.resolve("img/hero.png").unwrap().to_string();
    let font = ctx.registry.resolve("fonts/main.ttf").unwrap().to_string();
    let manifest = fs::read_to_string(project.path("build/assets").join(METADATA_FILE)).unwrap();

    let texture_at = manifest.find(&format!("{}.png:", hero)).unwrap();
    let font_at = manifest.find(&format!("{}.font:", font)).unwrap();
    assert!(texture_at < font_at);
    assert!(project.path(&format!("build/assets/{}.png", hero)).is_file());
    assert!(project.path(&format!("build/assets/{}.font", font)).is_file());
}

#[test]
fn sprites_splice_before_their_texture() {
    let project = Project::new();
    project.png("img/sheet.png", &RgbaImage::new(8, 24));
    project.write(
        "img/sheet.png.sprites",
        br#"[{"name":"head","x":0,"y":0,"w":8,"h":8},{"name":"body","x":0,"y":8,"w":8,"h":16}]"#,
    );
    let mut sheet = TextureAsset::new("img/sheet.png", "sheet");
    sheet.include_sprites = true;

    let config = project.config(AssetFiles {
        textures: vec![sheet],
        ..AssetFiles::default()
    });
    let mut registry = IdentityRegistry::new();
    let mut catalog = AssetCatalog::new();
    catalog.build(&config, &mut registry).unwrap();

    let names: Vec<&str> = catalog
        .entries()
        .iter()
        .map(|e| e.cross_reference.as_deref().unwrap())
        .collect();
    assert_eq!(names, vec!["head", "body", "sheet"]);
    assert!(matches!(catalog.entries()[0].data, AssetData::Sprite(_)));
    assert!(catalog.diagnostics().is_empty());
}

#[test]
fn font_glyphs_follow_codepoint_order() {
    let record = encode_font(&LetterFont, 8, "cba").unwrap();
    let codepoints: Vec<u32> = record.glyphs.iter().map(|g| g.codepoint).collect();
    assert_eq!(codepoints, vec!['a' as u32, 'b' as u32, 'c' as u32]);
    assert_eq!(record.glyph('c').unwrap().width(), 3);
}

#[test]
fn uncovered_characters_are_dropped() {
    let record = encode_font(&LetterFont, 8, "a1b").unwrap();
    assert_eq!(record.glyph_count(), 2);
    assert!(record.glyph('1').is_none());
}

#[test]
fn dimension_ceiling() {
    let too_wide = RgbaImage::new(65536, 10);
    assert!(matches!(encode(&too_wide, "p8"), Err(CraftError::Size { .. })));

    let widest = RgbaImage::from_pixel(65535, 10, Rgba([0, 0, 0, 255]));
    let record = encode(&widest, "p8").unwrap();
    assert_eq!(record.width, 65535);
}

#[test]
fn p4_round_trip_recovers_colours() {
    let colours = [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255], [255, 0, 0, 255]];
    let img = RgbaImage::from_fn(2, 2, |x, y| Rgba(colours[(y * 2 + x) as usize]));
    let record = encode(&img, "p4").unwrap();

    assert_eq!(record.color_count, 3);
    for y in 0..2u32 {
        for x in 0..2u32 {
            let c = record.colour_at(x as usize, y as usize).unwrap();
            let [r, g, b, _] = colours[(y * 2 + x) as usize];
            assert_eq!((c.r, c.g, c.b), (r, g, b));
        }
    }
}

#[test]
fn unknown_profile_aborts_the_build() {
    let project = Project::new();
    project.png("img/a.png", &RgbaImage::new(2, 2));
    let mut tex = TextureAsset::new("img/a.png", "a");
    tex.external = true;
    tex.format = "p12".to_string();

    let mut ctx = project.context(AssetFiles {
        textures: vec![tex],
        ..AssetFiles::default()
    });
    let err = ctx.build(&Capabilities::builtin(), None).unwrap_err();
    assert!(matches!(err, CraftError::Format { .. }));
    assert!(!project.path("build/assets").join(METADATA_FILE).exists());
}
