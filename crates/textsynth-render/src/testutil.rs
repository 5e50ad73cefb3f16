// this_file: crates/textsynth-render/src/testutil.rs

//! Test-only font engine with fixed, deterministic glyphs.

use std::sync::Arc;
use textsynth_core::{Result, SynthError};
use textsynth_fontdb::{FontEngine, FontHandle, FontMetrics, RasterGlyph};

/// Engine whose glyphs are solid rectangles, so shaping tests do not
/// depend on real font files.
pub struct StubEngine {
    glyph_w: u32,
    glyph_h: u32,
}

impl Default for StubEngine {
    fn default() -> Self {
        Self {
            glyph_w: 16,
            glyph_h: 20,
        }
    }
}

impl StubEngine {
    pub fn glyph_width(&self) -> u32 {
        self.glyph_w
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
        if ch == '\u{FFFF}' {
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
            mask: vec![255; (self.glyph_w * self.glyph_h) as usize],
            width: self.glyph_w,
            height: self.glyph_h,
            bearing_x: 1,
            bearing_y: 20,
            advance: 18.0,
        }))
    }

    fn has_glyph(&self, _font: &FontHandle, ch: char) -> bool {
        ch != '\u{FFFF}'
    }
}

/// A handle that points at no real file; the stub engine never reads it.
pub fn stub_font() -> FontHandle {
    FontHandle {
        key: "stub.ttf".to_string(),
        path: "stub.ttf".into(),
        bytes: Arc::from(vec![0u8; 4].into_boxed_slice()),
    }
}
