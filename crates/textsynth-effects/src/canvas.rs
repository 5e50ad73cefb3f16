// this_file: crates/textsynth-effects/src/canvas.rs

//! Canvas sizing, placement and final composition.
//!
//! The canvas is always at least as large as the text surface plus the
//! configured padding, capped by the megapixel budget. Backgrounds are
//! cropped, never resized; a background that cannot cover the canvas is
//! reported so the scheduler can penalize it and the composer falls back
//! to the plan's background color.

use rand::Rng;
use textsynth_core::{CharBox, Color, PlacementStrategy, Surface};

/// How a candidate background relates to the canvas and text sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundFit {
    Fits,
    /// Covers the text but not the whole canvas: moderate penalty.
    SmallerThanCanvas,
    /// Cannot even cover the text bounding box: severe penalty.
    SmallerThanText,
}

/// Pick a canvas size around the text surface.
///
/// Each axis gets the minimum padding on both sides plus a random slack
/// drawn from the placement RNG. The total area is capped at
/// `max_megapixels`; slack shrinks first, the text-plus-padding floor is
/// never cut.
pub fn generate_canvas_size<R: Rng + ?Sized>(
    rng: &mut R,
    text_w: u32,
    text_h: u32,
    min_padding: u32,
    max_megapixels: f64,
) -> (u32, u32) {
    let floor_w = text_w + 2 * min_padding;
    let floor_h = text_h + 2 * min_padding;

    let slack_x = rng.gen_range(0.0..=0.6) * text_w as f64;
    let slack_y = rng.gen_range(0.0..=0.6) * text_h as f64;
    let mut w = floor_w as f64 + slack_x;
    let mut h = floor_h as f64 + slack_y;

    let budget = (max_megapixels * 1e6).max(1.0);
    if w * h > budget {
        let scale = (budget / (w * h)).sqrt();
        w = (w * scale).max(floor_w as f64);
        h = (h * scale).max(floor_h as f64);
        // When the floor binds on one axis the scaled pair can still be
        // over budget; give up the slack entirely in that case.
        if w * h > budget {
            w = floor_w as f64;
            h = floor_h as f64;
        }
    }
    (w.round() as u32, h.round() as u32)
}

/// Pick the text surface's top-left corner on the canvas.
pub fn choose_placement<R: Rng + ?Sized>(
    rng: &mut R,
    canvas_w: u32,
    canvas_h: u32,
    text_w: u32,
    text_h: u32,
    strategy: PlacementStrategy,
) -> (u32, u32) {
    let slack_x = canvas_w.saturating_sub(text_w);
    let slack_y = canvas_h.saturating_sub(text_h);
    match strategy {
        PlacementStrategy::Center => (slack_x / 2, slack_y / 2),
        PlacementStrategy::UniformRandom => (
            if slack_x > 0 { rng.gen_range(0..=slack_x) } else { 0 },
            if slack_y > 0 { rng.gen_range(0..=slack_y) } else { 0 },
        ),
        PlacementStrategy::WeightedRandom => {
            // Sum of two uniforms: triangular mass peaked at the center.
            let tx = (rng.gen_range(0.0..=1.0) + rng.gen_range(0.0..=1.0)) / 2.0;
            let ty = (rng.gen_range(0.0..=1.0) + rng.gen_range(0.0..=1.0)) / 2.0;
            (
                (slack_x as f64 * tx).round() as u32,
                (slack_y as f64 * ty).round() as u32,
            )
        }
    }
}

/// Classify a background against the canvas and text dimensions. The
/// placer never stretches, so anything short of the canvas is a miss.
pub fn background_fit(
    bg_w: u32,
    bg_h: u32,
    canvas: (u32, u32),
    text: (u32, u32),
) -> BackgroundFit {
    if bg_w < text.0 || bg_h < text.1 {
        BackgroundFit::SmallerThanText
    } else if bg_w < canvas.0 || bg_h < canvas.1 {
        BackgroundFit::SmallerThanCanvas
    } else {
        BackgroundFit::Fits
    }
}

/// The average of the glyph colors: what "the text color" means when a
/// palette hands out several.
pub fn dominant_color(colors: &[Color]) -> Color {
    if colors.is_empty() {
        return Color::black();
    }
    let n = colors.len() as u32;
    let (mut r, mut g, mut b) = (0u32, 0u32, 0u32);
    for c in colors {
        r += c.r as u32;
        g += c.g as u32;
        b += c.b as u32;
    }
    Color::rgb((r / n) as u8, (g / n) as u8, (b / n) as u8)
}

/// Maximum-luminance-contrast fill for "auto" backgrounds.
pub fn auto_background_color(dominant: Color) -> Color {
    if dominant.luminance() > 127.5 {
        Color::black()
    } else {
        Color::white()
    }
}

/// Composite the text surface onto its canvas.
///
/// A usable background is cropped (never resized) at a random window;
/// otherwise the canvas is a solid fill of `fill`. Boxes are rebased
/// into the canvas frame.
pub fn compose<R: Rng + ?Sized>(
    rng: &mut R,
    text_surface: &Surface,
    boxes: &[CharBox],
    canvas_w: u32,
    canvas_h: u32,
    placement: (u32, u32),
    background: Option<&Surface>,
    fill: Color,
) -> (Surface, Vec<CharBox>) {
    let mut canvas = match background {
        Some(bg) if bg.width() >= canvas_w && bg.height() >= canvas_h => {
            let max_x = bg.width() - canvas_w;
            let max_y = bg.height() - canvas_h;
            let cx = if max_x > 0 { rng.gen_range(0..=max_x) } else { 0 };
            let cy = if max_y > 0 { rng.gen_range(0..=max_y) } else { 0 };
            bg.crop(cx, cy, canvas_w, canvas_h)
        }
        _ => Surface::filled(canvas_w, canvas_h, fill),
    };

    canvas.alpha_over(text_surface, placement.0 as i64, placement.1 as i64);

    let rebased = boxes
        .iter()
        .map(|b| {
            let mut nb = b.clone();
            nb.translate(placement.0 as f32, placement.1 as f32);
            nb
        })
        .collect();
    (canvas, rebased)
}
