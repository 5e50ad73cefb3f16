// this_file: crates/textsynth/src/testutil.rs

//! Test-only fixtures: a rectangle-glyph font engine and ready-made
//! plans, so pipeline tests run without real font files.

use crate::plan::{BackgroundPlan, ColorPlan, CurvePlan, Plan};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use textsynth_core::{
    Color, ColorMode, Direction, LineBreakMode, PlacementStrategy, Result, SynthError,
    TextAlignment,
};
use textsynth_fontdb::{FontEngine, FontHandle, FontLibrary, FontMetrics, RasterGlyph, WeightedFont};

static STUB_DIR: OnceLock<tempfile::TempDir> = OnceLock::new();

/// Path of a stable on-disk stub font file for the whole test process.
pub fn stub_font_path() -> PathBuf {
    let dir = STUB_DIR.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stub.ttf"), b"stub-font").unwrap();
        dir
    });
    dir.path().join("stub.ttf")
}

/// Library containing only the stub font. The second element keeps the
/// call sites uniform; the backing directory lives for the process.
pub fn stub_font_library() -> (FontLibrary, PathBuf) {
    let path = stub_font_path();
    (
        FontLibrary::new(vec![WeightedFont {
            path: path.clone(),
            weight: 1.0,
        }]),
        path,
    )
}

/// Engine whose glyphs are solid 16x20 rectangles with fixed metrics.
pub struct StubEngine {
    fail_chars: Vec<char>,
}

impl Default for StubEngine {
    fn default() -> Self {
        Self {
            fail_chars: vec!['\u{FFFF}'],
        }
    }
}

impl StubEngine {
    /// An engine that reports the given characters as not covered.
    pub fn failing_on(chars: &[char]) -> Self {
        Self {
            fail_chars: chars.to_vec(),
        }
    }
}

impl FontEngine for StubEngine {
    fn metrics(&self, _font: &FontHandle, _size: f32) -> Result<FontMetrics> {
        Ok(FontMetrics {
            ascent: 24.0,
            descent: 8.0,
        })
    }

    fn glyph(&self, font: &FontHandle, _size: f32, ch: char) -> Result<Arc<RasterGlyph>> {
        if self.fail_chars.contains(&ch) {
            return Err(SynthError::GlyphMiss {
                font: font.key.clone(),
                ch,
            });
        }
        if ch.is_whitespace() {
            return Ok(Arc::new(RasterGlyph {
                mask: Vec::new(),
                width: 0,
                height: 0,
                bearing_x: 0,
                bearing_y: 0,
                advance: 10.0,
            }));
        }
        Ok(Arc::new(RasterGlyph {
            mask: vec![255; 16 * 20],
            width: 16,
            height: 20,
            bearing_x: 1,
            bearing_y: 20,
            advance: 18.0,
        }))
    }

    fn has_glyph(&self, _font: &FontHandle, ch: char) -> bool {
        !self.fail_chars.contains(&ch)
    }
}

/// A plan with no effects or augmentations: black text on an auto
/// background, centered placement, stub font.
pub fn basic_plan(text: &str, image_index: u64) -> Plan {
    Plan {
        spec_name: "test".to_string(),
        image_index,
        seed: textsynth_core::rng::derive_seed(42, image_index, "test"),
        text: text.to_string(),
        font_path: stub_font_path(),
        direction: Direction::Ltr,
        font_size: 32,
        num_lines: 1,
        line_break: LineBreakMode::Word,
        line_spacing: 1.0,
        alignment: TextAlignment::Center,
        curve: CurvePlan::none(),
        overlap: 0.0,
        color: ColorPlan {
            mode: ColorMode::Uniform,
            colors: vec![Color::black()],
        },
        background: BackgroundPlan::Auto,
        background_path: None,
        effects: Vec::new(),
        augmentations: Vec::new(),
        min_padding: 8,
        max_megapixels: 4.0,
        placement: PlacementStrategy::Center,
    }
}
