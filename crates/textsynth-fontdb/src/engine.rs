// this_file: crates/textsynth-fontdb/src/engine.rs

//! The outline-font engine: outlines via skrifa, masks via zeno.
//!
//! The engine contract is deliberately small: metrics, one glyph at a
//! time, coverage queries. Glyph calls allocate nothing beyond the
//! returned bitmap and scratch path buffers; repeated calls hit an LRU
//! keyed by (font, size, codepoint).

use crate::library::FontHandle;
use kurbo::Shape;
use lru::LruCache;
use parking_lot::Mutex;
use skrifa::instance::{LocationRef, Size};
use skrifa::outline::{DrawSettings, OutlinePen};
use skrifa::MetadataProvider;
use std::num::NonZeroUsize;
use std::sync::Arc;
use textsynth_core::{Result, SynthError};

/// Vertical extent of a face at one size. `descent` is positive, measured
/// down from the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub ascent: f32,
    pub descent: f32,
}

impl FontMetrics {
    pub fn line_height(&self) -> f32 {
        self.ascent + self.descent
    }
}

/// One rasterized glyph: an alpha mask plus positioning metadata.
///
/// `bearing_x` is the ink box's left edge relative to the pen position;
/// `bearing_y` is the distance from the baseline up to the ink box's top
/// edge. An empty mask (spaces) has zero dimensions but a real advance.
#[derive(Debug, Clone)]
pub struct RasterGlyph {
    pub mask: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bearing_x: i32,
    pub bearing_y: i32,
    pub advance: f32,
}

impl RasterGlyph {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// The engine seam between the shaper and the rasterizer.
pub trait FontEngine: Send + Sync {
    fn metrics(&self, font: &FontHandle, size: f32) -> Result<FontMetrics>;
    fn glyph(&self, font: &FontHandle, size: f32, ch: char) -> Result<Arc<RasterGlyph>>;
    fn has_glyph(&self, font: &FontHandle, ch: char) -> bool;
}

type GlyphKey = (String, u32, char);

/// Production engine backed by skrifa outlines and the zeno rasterizer.
pub struct SkrifaEngine {
    cache: Mutex<LruCache<GlyphKey, Arc<RasterGlyph>>>,
}

const GLYPH_CACHE_CAPACITY: usize = 4096;

impl SkrifaEngine {
    pub fn new() -> Self {
        let capacity = NonZeroUsize::new(GLYPH_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn parse<'a>(&self, font: &'a FontHandle) -> Result<skrifa::FontRef<'a>> {
        skrifa::FontRef::new(font.bytes.as_ref()).map_err(|e| SynthError::RenderPanic {
            font: font.key.clone(),
            detail: format!("unparseable font: {e}"),
        })
    }

    fn rasterize(&self, font: &FontHandle, size: f32, ch: char) -> Result<RasterGlyph> {
        let face = self.parse(font)?;
        let glyph_id = face
            .charmap()
            .map(ch)
            .ok_or_else(|| SynthError::GlyphMiss {
                font: font.key.clone(),
                ch,
            })?;

        let advance = face
            .glyph_metrics(Size::new(size), LocationRef::default())
            .advance_width(glyph_id)
            .unwrap_or(0.0);

        let outline = face
            .outline_glyphs()
            .get(glyph_id)
            .ok_or_else(|| SynthError::GlyphMiss {
                font: font.key.clone(),
                ch,
            })?;

        // Build the path twice in one pass: an SVG string for zeno and a
        // kurbo path for exact ink bounds.
        let mut pen = DualPathPen::default();
        let settings = DrawSettings::unhinted(Size::new(size), LocationRef::default());
        outline
            .draw(settings, &mut pen)
            .map_err(|e| SynthError::RenderPanic {
                font: font.key.clone(),
                detail: format!("outline extraction failed for {ch:?}: {e}"),
            })?;
        let (path, bounds_path) = pen.finish();

        let bbox = bounds_path.bounding_box();
        if !bbox.x0.is_finite() || bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            // Whitespace and other blank glyphs carry only an advance.
            return Ok(RasterGlyph {
                mask: Vec::new(),
                width: 0,
                height: 0,
                bearing_x: 0,
                bearing_y: 0,
                advance,
            });
        }

        let min_x = bbox.x0 as f32;
        let min_y = bbox.y0 as f32;
        let max_y = bbox.y1 as f32;
        let width = (bbox.width().ceil() as u32).max(1);
        let height = (bbox.height().ceil() as u32).max(1);

        let mut mask = vec![0u8; (width as usize) * (height as usize)];
        zeno::Mask::new(path.as_str())
            .size(width, height)
            .offset((-min_x as i32, -min_y as i32))
            .render_into(&mut mask, None);

        // Outlines are y-up; bitmaps are y-down.
        for y in 0..(height / 2) {
            let top = (y as usize) * (width as usize);
            let bottom = ((height - 1 - y) as usize) * (width as usize);
            for x in 0..width as usize {
                mask.swap(top + x, bottom + x);
            }
        }

        Ok(RasterGlyph {
            mask,
            width,
            height,
            bearing_x: min_x.floor() as i32,
            bearing_y: max_y.ceil() as i32,
            advance,
        })
    }
}

impl Default for SkrifaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FontEngine for SkrifaEngine {
    fn metrics(&self, font: &FontHandle, size: f32) -> Result<FontMetrics> {
        let face = self.parse(font)?;
        let m = face.metrics(Size::new(size), LocationRef::default());
        Ok(FontMetrics {
            ascent: m.ascent,
            descent: -m.descent,
        })
    }

    fn glyph(&self, font: &FontHandle, size: f32, ch: char) -> Result<Arc<RasterGlyph>> {
        let key = (font.key.clone(), size.to_bits(), ch);
        if let Some(hit) = self.cache.lock().get(&key) {
            return Ok(hit.clone());
        }
        let glyph = Arc::new(self.rasterize(font, size, ch)?);
        self.cache.lock().put(key, glyph.clone());
        Ok(glyph)
    }

    fn has_glyph(&self, font: &FontHandle, ch: char) -> bool {
        match self.parse(font) {
            Ok(face) => face.charmap().map(ch).is_some(),
            Err(_) => false,
        }
    }
}

/// Pen that accumulates an SVG path string and a kurbo path in lockstep.
#[derive(Default)]
struct DualPathPen {
    svg: String,
    bounds: kurbo::BezPath,
}

impl DualPathPen {
    fn finish(self) -> (String, kurbo::BezPath) {
        (self.svg, self.bounds)
    }
}

impl OutlinePen for DualPathPen {
    fn move_to(&mut self, x: f32, y: f32) {
        use std::fmt::Write;
        let _ = write!(self.svg, "M{x},{y}");
        self.bounds.move_to((x as f64, y as f64));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        use std::fmt::Write;
        let _ = write!(self.svg, "L{x},{y}");
        self.bounds.line_to((x as f64, y as f64));
    }

    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        use std::fmt::Write;
        let _ = write!(self.svg, "Q{cx},{cy} {x},{y}");
        self.bounds
            .quad_to((cx as f64, cy as f64), (x as f64, y as f64));
    }

    fn curve_to(&mut self, c0x: f32, c0y: f32, c1x: f32, c1y: f32, x: f32, y: f32) {
        use std::fmt::Write;
        let _ = write!(self.svg, "C{c0x},{c0y} {c1x},{c1y} {x},{y}");
        self.bounds.curve_to(
            (c0x as f64, c0y as f64),
            (c1x as f64, c1y as f64),
            (x as f64, y as f64),
        );
    }

    fn close(&mut self) {
        self.svg.push('Z');
        self.bounds.close_path();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dual_pen_tracks_bounds() {
        let mut pen = DualPathPen::default();
        pen.move_to(1.0, 2.0);
        pen.line_to(11.0, 2.0);
        pen.line_to(11.0, 22.0);
        pen.close();
        let (svg, path) = pen.finish();
        assert!(svg.starts_with("M1,2"));
        assert!(svg.ends_with('Z'));
        let bbox = path.bounding_box();
        assert_eq!(bbox.x0, 1.0);
        assert_eq!(bbox.x1, 11.0);
        assert_eq!(bbox.y1, 22.0);
    }

    #[test]
    fn empty_glyph_reports_empty() {
        let g = RasterGlyph {
            mask: Vec::new(),
            width: 0,
            height: 0,
            bearing_x: 0,
            bearing_y: 0,
            advance: 8.0,
        };
        assert!(g.is_empty());
    }
}
