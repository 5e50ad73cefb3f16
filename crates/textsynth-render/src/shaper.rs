// this_file: crates/textsynth-render/src/shaper.rs

//! The glyph shaper: one visual text line becomes a transparent RGBA
//! surface plus an ordered list of per-character boxes.
//!
//! Straight and curved (arc, sine) baselines, all four writing
//! directions, optional per-glyph overlap with deterministic jitter.
//! Multi-line text is shaped one line at a time and stacked by the
//! layout module's offsets.

use crate::layout;
use rand::Rng;
use std::sync::Arc;
use textsynth_core::{
    CharBox, Color, CurveKind, Direction, Result, Surface, SynthError, TextAlignment,
};
use textsynth_fontdb::{FontEngine, FontHandle, FontMetrics, RasterGlyph};

/// Advance shrink factor at full overlap intensity, both axes.
const OVERLAP_K: f64 = 0.8;
/// Per-character advance jitter as a fraction of the base advance.
const JITTER_FRAC: f64 = 0.015;
/// Sine amplitude scale relative to the tallest glyph.
const SINE_AMPLITUDE_SCALE: f64 = 1.5;
/// Surface returned for empty text.
const EMPTY_SURFACE_EDGE: u32 = 10;

/// Concrete curve parameters for one image. All fields are present (and
/// zero) even when `kind` says they are unused, so labels stay uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSpec {
    pub kind: CurveKind,
    pub arc_intensity: f64,
    pub amplitude: f64,
    pub frequency: f64,
    pub phase: f64,
    pub concave: bool,
}

impl CurveSpec {
    pub fn none() -> Self {
        Self {
            kind: CurveKind::None,
            arc_intensity: 0.0,
            amplitude: 0.0,
            frequency: 0.0,
            phase: 0.0,
            concave: false,
        }
    }

    fn is_effectively_straight(&self) -> bool {
        match self.kind {
            CurveKind::None => true,
            CurveKind::Arc => self.arc_intensity <= 0.0,
            CurveKind::Sine => self.amplitude <= 0.0,
        }
    }
}

/// Everything the shaper needs beyond the text itself.
#[derive(Debug, Clone)]
pub struct ShapeParams {
    pub direction: Direction,
    pub font_size: f32,
    /// Overlap intensity in [0, 1]; 0 keeps natural advances.
    pub overlap: f64,
    /// Transparent border around the rendered line, pixels.
    pub margin: u32,
    pub curve: CurveSpec,
}

/// One shaped line: surface plus boxes in visual emission order.
#[derive(Debug)]
pub struct ShapedLine {
    pub surface: Surface,
    pub boxes: Vec<CharBox>,
}

/// A whole shaped text block (possibly multi-line).
#[derive(Debug)]
pub struct ShapedText {
    pub surface: Surface,
    pub boxes: Vec<CharBox>,
}

/// Shape a single visual line.
///
/// `colors` supplies one color per visual character; shorter slices fall
/// back to black. Every returned box satisfies `x1 > x0 && y1 > y0`, and
/// the box count equals the character count of `visual_text`.
pub fn shape_line<R: Rng + ?Sized>(
    engine: &dyn FontEngine,
    font: &FontHandle,
    visual_text: &str,
    colors: &[Color],
    params: &ShapeParams,
    rng: &mut R,
) -> Result<ShapedLine> {
    let run = GlyphRun::prepare(engine, font, visual_text, colors, params, rng)?;
    let Some(run) = run else {
        return Ok(ShapedLine {
            surface: Surface::new(EMPTY_SURFACE_EDGE, EMPTY_SURFACE_EDGE),
            boxes: Vec::new(),
        });
    };

    log::debug!(
        "shaping {} glyphs, direction {}, curve {}",
        run.chars.len(),
        params.direction.as_str(),
        params.curve.kind.as_str()
    );
    let shaped = if params.curve.is_effectively_straight() {
        shape_straight(&run, params)
    } else {
        shape_curved(&run, params)
    };
    verify_boxes(&shaped, run.chars.len())?;
    Ok(shaped)
}

/// Shape a multi-line block. `visual_lines` are already broken and
/// reordered; `colors` covers every glyph across all lines in emission
/// order. Boxes carry their line index.
pub fn shape_text<R: Rng + ?Sized>(
    engine: &dyn FontEngine,
    font: &FontHandle,
    visual_lines: &[String],
    colors: &[Color],
    spacing: f64,
    alignment: TextAlignment,
    params: &ShapeParams,
    rng: &mut R,
) -> Result<ShapedText> {
    let mut shaped_lines = Vec::with_capacity(visual_lines.len());
    let mut color_cursor = 0usize;
    for line in visual_lines {
        let count = line.chars().count();
        let slice_end = (color_cursor + count).min(colors.len());
        let line_colors = colors.get(color_cursor..slice_end).unwrap_or(&[]);
        shaped_lines.push(shape_line(engine, font, line, line_colors, params, rng)?);
        color_cursor += count;
    }

    if shaped_lines.len() == 1 {
        let only = shaped_lines.remove(0);
        return Ok(ShapedText {
            surface: only.surface,
            boxes: only.boxes,
        });
    }

    let sizes: Vec<(u32, u32)> = shaped_lines
        .iter()
        .map(|l| (l.surface.width(), l.surface.height()))
        .collect();
    let total = layout::multiline_dimensions(&sizes, spacing, params.direction);
    let positions = layout::line_positions(&sizes, total, spacing, alignment, params.direction)?;
    log::debug!(
        "stacking {} lines into {}x{}, spacing {spacing}, alignment {}",
        sizes.len(),
        total.0,
        total.1,
        alignment.as_str()
    );

    let mut surface = Surface::new(total.0, total.1);
    let mut boxes = Vec::new();
    for (line_index, (line, (dx, dy))) in shaped_lines.into_iter().zip(positions).enumerate() {
        surface.alpha_over(&line.surface, dx as i64, dy as i64);
        for mut b in line.boxes {
            b.translate(dx, dy);
            b.line_index = line_index as u32;
            boxes.push(b);
        }
    }
    Ok(ShapedText { surface, boxes })
}

/// Measured glyphs and adjusted advances for one line.
struct GlyphRun {
    chars: Vec<char>,
    glyphs: Vec<Arc<RasterGlyph>>,
    colors: Vec<Color>,
    advances: Vec<f64>,
    metrics: FontMetrics,
    /// Sum of adjusted advances: the rendered baseline length.
    total: f64,
    /// Widest column cell for vertical text.
    column: f64,
}

impl GlyphRun {
    fn prepare<R: Rng + ?Sized>(
        engine: &dyn FontEngine,
        font: &FontHandle,
        visual_text: &str,
        colors: &[Color],
        params: &ShapeParams,
        rng: &mut R,
    ) -> Result<Option<Self>> {
        let chars: Vec<char> = visual_text.chars().collect();
        if chars.is_empty() {
            return Ok(None);
        }

        let metrics = engine.metrics(font, params.font_size)?;
        let mut glyphs = Vec::with_capacity(chars.len());
        for &ch in &chars {
            glyphs.push(engine.glyph(font, params.font_size, ch)?);
        }

        let line_height = metrics.line_height().max(1.0) as f64;
        let shrink = 1.0 - OVERLAP_K * params.overlap.clamp(0.0, 1.0);
        let mut advances = Vec::with_capacity(chars.len());
        for g in &glyphs {
            let base = if params.direction.is_horizontal() {
                (g.advance as f64).max(1.0)
            } else {
                line_height
            };
            let jitter = base * rng.gen_range(-JITTER_FRAC..=JITTER_FRAC);
            advances.push((base * shrink + jitter).max(1.0));
        }
        let total = advances.iter().sum();
        let column = glyphs
            .iter()
            .map(|g| (g.advance as f64).max(g.width as f64))
            .fold(line_height, f64::max);

        let colors = (0..chars.len())
            .map(|i| colors.get(i).copied().unwrap_or(Color::black()))
            .collect();

        Ok(Some(Self {
            chars,
            glyphs,
            colors,
            advances,
            metrics,
            total,
            column,
        }))
    }

    fn line_height(&self) -> f64 {
        self.metrics.line_height().max(1.0) as f64
    }
}

fn shape_straight(run: &GlyphRun, params: &ShapeParams) -> ShapedLine {
    match params.direction {
        Direction::Ltr | Direction::Rtl => shape_straight_horizontal(run, params),
        Direction::Ttb | Direction::Btt => shape_straight_vertical(run, params),
    }
}

fn shape_straight_horizontal(run: &GlyphRun, params: &ShapeParams) -> ShapedLine {
    let margin = params.margin as f64;
    let line_height = run.line_height();
    let width = (2.0 * margin + run.total).ceil() as u32;
    let height = (2.0 * margin + line_height).ceil() as u32;
    let mut surface = Surface::new(width, height);

    let baseline = margin + run.metrics.ascent as f64;
    let mut boxes = Vec::with_capacity(run.chars.len());

    // RTL walks from the right edge so the first visual character is the
    // rightmost one.
    let mut cursor = if params.direction == Direction::Rtl {
        margin + run.total
    } else {
        margin
    };

    for i in 0..run.chars.len() {
        let advance = run.advances[i];
        let cell_start = if params.direction == Direction::Rtl {
            cursor - advance
        } else {
            cursor
        };
        let glyph = &run.glyphs[i];

        let b = if glyph.is_empty() {
            CharBox::new(
                run.chars[i],
                cell_start as f32,
                (baseline - run.metrics.ascent as f64) as f32,
                (cell_start + advance) as f32,
                (baseline + run.metrics.descent as f64) as f32,
            )
        } else {
            let x0 = cell_start + glyph.bearing_x as f64;
            let y0 = baseline - glyph.bearing_y as f64;
            surface.blend_mask(
                &glyph.mask,
                glyph.width,
                glyph.height,
                x0.round() as i64,
                y0.round() as i64,
                run.colors[i],
            );
            CharBox::new(
                run.chars[i],
                x0 as f32,
                y0 as f32,
                (x0 + glyph.width as f64) as f32,
                (y0 + glyph.height as f64) as f32,
            )
        };
        boxes.push(b);

        if params.direction == Direction::Rtl {
            cursor -= advance;
        } else {
            cursor += advance;
        }
    }

    ShapedLine { surface, boxes }
}

fn shape_straight_vertical(run: &GlyphRun, params: &ShapeParams) -> ShapedLine {
    let margin = params.margin as f64;
    let column = run.column;
    let width = (2.0 * margin + column).ceil() as u32;
    let height = (2.0 * margin + run.total).ceil() as u32;
    let mut surface = Surface::new(width, height);

    let cx = margin + column / 2.0;
    let mut boxes = Vec::with_capacity(run.chars.len());

    // BTT walks up from the bottom edge.
    let mut cursor = if params.direction == Direction::Btt {
        margin + run.total
    } else {
        margin
    };

    for i in 0..run.chars.len() {
        let advance = run.advances[i];
        let cell_top = if params.direction == Direction::Btt {
            cursor - advance
        } else {
            cursor
        };
        let glyph = &run.glyphs[i];

        let b = if glyph.is_empty() {
            CharBox::new(
                run.chars[i],
                (cx - column / 2.0) as f32,
                cell_top as f32,
                (cx + column / 2.0) as f32,
                (cell_top + advance) as f32,
            )
        } else {
            let x0 = cx - glyph.width as f64 / 2.0;
            let y0 = cell_top + (advance - glyph.height as f64) / 2.0;
            surface.blend_mask(
                &glyph.mask,
                glyph.width,
                glyph.height,
                x0.round() as i64,
                y0.round() as i64,
                run.colors[i],
            );
            CharBox::new(
                run.chars[i],
                x0 as f32,
                y0 as f32,
                (x0 + glyph.width as f64) as f32,
                (y0 + glyph.height as f64) as f32,
            )
        };
        boxes.push(b);

        if params.direction == Direction::Btt {
            cursor -= advance;
        } else {
            cursor += advance;
        }
    }

    ShapedLine { surface, boxes }
}

/// Per-character displacement and tangent along the configured curve.
struct CurveSample {
    /// Offset perpendicular to the writing axis, always >= 0 and measured
    /// from the undisplaced band.
    displacement: f64,
    /// Glyph rotation in degrees.
    rotation: f64,
}

fn curve_samples(run: &GlyphRun, params: &ShapeParams) -> (Vec<CurveSample>, f64) {
    let curve = &params.curve;
    let total = run.total.max(1.0);
    let mut centers = Vec::with_capacity(run.chars.len());
    let mut cum = 0.0f64;
    for &adv in &run.advances {
        centers.push(cum + adv / 2.0);
        cum += adv;
    }

    match curve.kind {
        CurveKind::Arc => {
            let intensity = curve.arc_intensity.clamp(1e-3, 1.0);
            let radius = (total / (2.0 * intensity)).max(total);
            let theta_max = (total / 2.0) / radius;
            let depth_max = radius * (1.0 - theta_max.cos());
            let samples = centers
                .iter()
                .map(|&s| {
                    let theta = (s - total / 2.0) / radius;
                    let depth = radius * (1.0 - theta.cos());
                    let displacement = displacement_for(curve.concave, params.direction, depth, depth_max);
                    let mut rotation = theta.to_degrees();
                    if curve.concave {
                        rotation = -rotation;
                    }
                    if params.direction == Direction::Rtl || params.direction == Direction::Btt {
                        // Mirrored baseline negates the tangent.
                        rotation = -rotation;
                    }
                    CurveSample {
                        displacement,
                        rotation,
                    }
                })
                .collect();
            (samples, depth_max)
        }
        CurveKind::Sine => {
            let max_glyph = run
                .glyphs
                .iter()
                .map(|g| g.height as f64)
                .fold(run.line_height(), f64::max);
            let amplitude = max_glyph * curve.amplitude.max(0.0) * SINE_AMPLITUDE_SCALE;
            let omega = 2.0 * std::f64::consts::PI * (1.0 + curve.frequency.max(0.0)) / total;
            let phase = curve.phase + if curve.concave { std::f64::consts::PI } else { 0.0 };
            let samples = centers
                .iter()
                .map(|&s| {
                    let offset = amplitude * (omega * s + phase).sin();
                    let slope = amplitude * omega * (omega * s + phase).cos();
                    let mut rotation = -slope.atan().to_degrees();
                    if params.direction == Direction::Rtl || params.direction == Direction::Btt {
                        rotation = -rotation;
                    }
                    CurveSample {
                        // Shift into [0, 2A] so the band math matches arcs.
                        displacement: offset + amplitude,
                        rotation,
                    }
                })
                .collect();
            (samples, 2.0 * amplitude)
        }
        CurveKind::None => (
            centers
                .iter()
                .map(|_| CurveSample {
                    displacement: 0.0,
                    rotation: 0.0,
                })
                .collect(),
            0.0,
        ),
    }
}

/// Map raw arc depth into the displacement band for the direction and
/// concavity. Concave LTR pushes the middle down (smile); concave TTB
/// pushes the middle toward smaller x.
fn displacement_for(concave: bool, direction: Direction, depth: f64, depth_max: f64) -> f64 {
    match direction {
        Direction::Ltr | Direction::Rtl => {
            if concave {
                depth_max - depth
            } else {
                depth
            }
        }
        Direction::Ttb => {
            if concave {
                depth
            } else {
                depth_max - depth
            }
        }
        Direction::Btt => {
            if concave {
                depth_max - depth
            } else {
                depth
            }
        }
    }
}

fn shape_curved(run: &GlyphRun, params: &ShapeParams) -> ShapedLine {
    let margin = params.margin as f64;
    let line_height = run.line_height();
    let (samples, band) = curve_samples(run, params);
    let horizontal = params.direction.is_horizontal();

    // Extra room for rotated glyph overhang beyond the displacement band.
    let slack = line_height / 2.0;
    let (width, height) = if horizontal {
        (
            (2.0 * margin + run.total + slack).ceil() as u32,
            (2.0 * margin + line_height + band + slack).ceil() as u32,
        )
    } else {
        (
            (2.0 * margin + run.column + band + slack).ceil() as u32,
            (2.0 * margin + run.total + slack).ceil() as u32,
        )
    };
    let mut surface = Surface::new(width, height);
    let mut boxes = Vec::with_capacity(run.chars.len());

    let mut cum = 0.0f64;
    for i in 0..run.chars.len() {
        let advance = run.advances[i];
        let s_center = cum + advance / 2.0;
        cum += advance;

        // Mirrored baseline for RTL / BTT.
        let along = match params.direction {
            Direction::Rtl | Direction::Btt => run.total - s_center,
            _ => s_center,
        };

        let glyph = &run.glyphs[i];
        let sample = &samples[i];

        let (cx, cy) = if horizontal {
            let nominal_center_y = if glyph.is_empty() {
                margin + line_height / 2.0
            } else {
                margin + run.metrics.ascent as f64 - glyph.bearing_y as f64
                    + glyph.height as f64 / 2.0
            };
            (margin + along, nominal_center_y + sample.displacement)
        } else {
            let nominal_center_x = margin + run.column / 2.0;
            (nominal_center_x + sample.displacement, margin + along)
        };

        let b = if glyph.is_empty() {
            let (half_w, half_h) = if horizontal {
                (advance / 2.0, line_height / 2.0)
            } else {
                (run.column / 2.0, advance / 2.0)
            };
            CharBox::new(
                run.chars[i],
                (cx - half_w) as f32,
                (cy - half_h) as f32,
                (cx + half_w) as f32,
                (cy + half_h) as f32,
            )
        } else {
            let mut temp = Surface::new(glyph.width, glyph.height);
            temp.blend_mask(&glyph.mask, glyph.width, glyph.height, 0, 0, run.colors[i]);
            let rotated = temp.rotated_expand(sample.rotation as f32);
            let rx = cx - rotated.width() as f64 / 2.0;
            let ry = cy - rotated.height() as f64 / 2.0;
            surface.alpha_over(&rotated, rx.round() as i64, ry.round() as i64);
            // The axis-aligned hull of the rotated ink box; the rotated
            // surface has exactly those dimensions.
            CharBox::new(
                run.chars[i],
                rx as f32,
                ry as f32,
                (rx + rotated.width() as f64) as f32,
                (ry + rotated.height() as f64) as f32,
            )
        };
        boxes.push(b);
    }

    ShapedLine { surface, boxes }
}

fn verify_boxes(shaped: &ShapedLine, expected: usize) -> Result<()> {
    if shaped.boxes.len() != expected {
        return Err(SynthError::InternalInvariant(format!(
            "box count {} != visual character count {expected}",
            shaped.boxes.len()
        )));
    }
    for b in &shaped.boxes {
        if !(b.x1 > b.x0 && b.y1 > b.y0) {
            return Err(SynthError::InternalInvariant(format!(
                "degenerate box for {:?}: ({}, {}, {}, {})",
                b.ch, b.x0, b.y0, b.x1, b.y1
            )));
        }
    }
    Ok(())
}
