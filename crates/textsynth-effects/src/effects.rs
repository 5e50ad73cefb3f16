// this_file: crates/textsynth-effects/src/effects.rs

//! The per-surface pixel effect chain.
//!
//! Effects are tagged variants applied by a single dispatch routine, in
//! the order the planner recorded them. They operate in the text-surface
//! frame and never move ink far enough to matter for boxes, so bounding
//! boxes pass through untouched. Adding an effect means adding a variant
//! and a match arm.

use crate::raster::{blur_mask, blur_surface};
use rand::Rng;
use serde::{Deserialize, Serialize};
use textsynth_core::{Color, Surface};

/// One concrete pixel effect with all parameters resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    InkBleed {
        radius: f64,
    },
    Shadow {
        dx: f64,
        dy: f64,
        blur: f64,
        color: Color,
    },
    Relief {
        mode: ReliefMode,
        depth: f64,
        azimuth: f64,
        elevation: f64,
    },
    Noise {
        density: f64,
    },
    Blur {
        radius: f64,
    },
    Brightness {
        factor: f64,
    },
    Contrast {
        factor: f64,
    },
    Morphology {
        op: MorphOp,
        kernel: u32,
    },
    Cutout {
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliefMode {
    Raised,
    Embossed,
    Engraved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MorphOp {
    Erode,
    Dilate,
}

impl Effect {
    /// Name used in the applied-effect manifest.
    pub fn name(&self) -> &'static str {
        match self {
            Effect::InkBleed { .. } => "ink_bleed",
            Effect::Shadow { .. } => "shadow",
            Effect::Relief { .. } => "relief",
            Effect::Noise { .. } => "noise",
            Effect::Blur { .. } => "blur",
            Effect::Brightness { .. } => "brightness",
            Effect::Contrast { .. } => "contrast",
            Effect::Morphology { .. } => "morphology",
            Effect::Cutout { .. } => "cutout",
        }
    }
}

/// Apply the recorded effect chain in order. `canvas_color` is the fill
/// used by cutouts; `rng` must be the image's effects stream.
pub fn apply_effects<R: Rng + ?Sized>(
    surface: &mut Surface,
    effects: &[Effect],
    canvas_color: Color,
    rng: &mut R,
) {
    for effect in effects {
        match *effect {
            Effect::InkBleed { radius } => ink_bleed(surface, radius),
            Effect::Shadow {
                dx,
                dy,
                blur,
                color,
            } => shadow(surface, dx, dy, blur, color),
            Effect::Relief {
                mode,
                depth,
                azimuth,
                elevation,
            } => relief(surface, mode, depth, azimuth, elevation),
            Effect::Noise { density } => noise(surface, density, rng),
            Effect::Blur { radius } => {
                if radius > 0.0 {
                    *surface = blur_surface(surface, radius);
                }
            }
            Effect::Brightness { factor } => brightness(surface, factor),
            Effect::Contrast { factor } => contrast(surface, factor),
            Effect::Morphology { op, kernel } => morphology(surface, op, kernel),
            Effect::Cutout { width, height } => cutout(surface, width, height, canvas_color, rng),
        }
    }
}

/// Blur the silhouette and re-composite the sharp original over it: ink
/// appears to soak outward without losing the letterform.
fn ink_bleed(surface: &mut Surface, radius: f64) {
    if radius <= 0.0 {
        return;
    }
    let original = surface.clone();
    let mut bled = blur_surface(surface, radius);
    bled.alpha_over(&original, 0, 0);
    *surface = bled;
}

/// Blurred, offset copy of the alpha under the text in a given color.
fn shadow(surface: &mut Surface, dx: f64, dy: f64, blur: f64, color: Color) {
    if dx == 0.0 && dy == 0.0 && blur <= 0.0 {
        return;
    }
    let w = surface.width() as usize;
    let h = surface.height() as usize;
    let alpha: Vec<u8> = surface.data().chunks_exact(4).map(|px| px[3]).collect();
    let soft = if blur > 0.0 {
        blur_mask(&alpha, w, h, blur)
    } else {
        alpha
    };

    let mut out = Surface::new(surface.width(), surface.height());
    out.blend_mask(
        &soft,
        surface.width(),
        surface.height(),
        dx.round() as i64,
        dy.round() as i64,
        color,
    );
    out.alpha_over(surface, 0, 0);
    *surface = out;
}

/// Lambertian shading of the alpha gradient. Raised lights the whole
/// glyph from the configured direction, embossed shades only the edges,
/// engraved is the inverted emboss.
fn relief(surface: &mut Surface, mode: ReliefMode, depth: f64, azimuth: f64, elevation: f64) {
    if depth <= 0.0 {
        return;
    }
    let w = surface.width() as i64;
    let h = surface.height() as i64;
    let alpha: Vec<f32> = surface
        .data()
        .chunks_exact(4)
        .map(|px| px[3] as f32 / 255.0)
        .collect();

    let (az_sin, az_cos) = azimuth.sin_cos();
    let (el_sin, el_cos) = elevation.sin_cos();
    let light = [el_cos * az_cos, el_cos * az_sin, el_sin];

    let sign = match mode {
        ReliefMode::Engraved => -1.0f64,
        _ => 1.0,
    };

    for y in 0..h {
        for x in 0..w {
            let i = (y * w + x) as usize;
            if alpha[i] <= 0.0 {
                continue;
            }
            let left = alpha[(y * w + (x - 1).max(0)) as usize];
            let right = alpha[(y * w + (x + 1).min(w - 1)) as usize];
            let up = alpha[(((y - 1).max(0)) * w + x) as usize];
            let down = alpha[(((y + 1).min(h - 1)) * w + x) as usize];
            let gx = (right - left) as f64 * depth * sign;
            let gy = (down - up) as f64 * depth * sign;

            let norm = (gx * gx + gy * gy + 1.0).sqrt();
            let shade = (((-gx) * light[0] + (-gy) * light[1] + light[2]) / norm).clamp(0.0, 1.0);

            // Additive shading so the relief reads on dark ink too.
            let swing = match mode {
                ReliefMode::Raised => 40.0,
                ReliefMode::Embossed | ReliefMode::Engraved => 80.0,
            };
            let delta = (shade - 0.5) * 2.0 * swing;
            let c = surface.get(x as u32, y as u32);
            surface.put(
                x as u32,
                y as u32,
                Color::rgba(
                    shift_channel(c.r, delta),
                    shift_channel(c.g, delta),
                    shift_channel(c.b, delta),
                    c.a,
                ),
            );
        }
    }
}

/// Salt-and-pepper: exactly `floor(density * W * H)` pixels, sampled
/// without replacement, half forced to black and half to white.
fn noise<R: Rng + ?Sized>(surface: &mut Surface, density: f64, rng: &mut R) {
    let total = (surface.width() as usize) * (surface.height() as usize);
    let count = ((density.clamp(0.0, 1.0)) * total as f64).floor() as usize;
    if count == 0 {
        return;
    }
    let picks = rand::seq::index::sample(rng, total, count.min(total));
    let w = surface.width();
    for (rank, idx) in picks.iter().enumerate() {
        let x = (idx % w as usize) as u32;
        let y = (idx / w as usize) as u32;
        let value = if rank < count / 2 { 0 } else { 255 };
        surface.put(x, y, Color::rgb(value, value, value));
    }
}

fn brightness(surface: &mut Surface, factor: f64) {
    if factor == 1.0 {
        return;
    }
    for px in surface.data_mut().chunks_exact_mut(4) {
        for c in px.iter_mut().take(3) {
            *c = (*c as f64 * factor).round().clamp(0.0, 255.0) as u8;
        }
    }
}

fn contrast(surface: &mut Surface, factor: f64) {
    if factor == 1.0 {
        return;
    }
    for px in surface.data_mut().chunks_exact_mut(4) {
        for c in px.iter_mut().take(3) {
            *c = ((*c as f64 - 128.0) * factor + 128.0).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Erode or dilate the alpha channel with a square min/max filter,
/// applied separably. Kernel sizes are forced odd.
fn morphology(surface: &mut Surface, op: MorphOp, kernel: u32) {
    let kernel = kernel | 1;
    if kernel <= 1 {
        return;
    }
    let half = (kernel / 2) as i64;
    let w = surface.width() as i64;
    let h = surface.height() as i64;
    let alpha: Vec<u8> = surface.data().chunks_exact(4).map(|px| px[3]).collect();

    let reduce = |a: u8, b: u8| match op {
        MorphOp::Erode => a.min(b),
        MorphOp::Dilate => a.max(b),
    };
    // Outside the surface there is no ink.
    let edge: u8 = 0;

    let mut horizontal = vec![0u8; alpha.len()];
    for y in 0..h {
        for x in 0..w {
            let mut acc: Option<u8> = None;
            for k in -half..=half {
                let sx = x + k;
                let v = if sx < 0 || sx >= w {
                    edge
                } else {
                    alpha[(y * w + sx) as usize]
                };
                acc = Some(match acc {
                    Some(a) => reduce(a, v),
                    None => v,
                });
            }
            horizontal[(y * w + x) as usize] = acc.unwrap_or(0);
        }
    }

    for y in 0..h {
        for x in 0..w {
            let mut acc: Option<u8> = None;
            for k in -half..=half {
                let sy = y + k;
                let v = if sy < 0 || sy >= h {
                    edge
                } else {
                    horizontal[(sy * w + x) as usize]
                };
                acc = Some(match acc {
                    Some(a) => reduce(a, v),
                    None => v,
                });
            }
            let i = ((y * w + x) * 4 + 3) as usize;
            surface.data_mut()[i] = acc.unwrap_or(0);
        }
    }
}

/// Fill a randomly placed rectangle with the canvas color.
fn cutout<R: Rng + ?Sized>(
    surface: &mut Surface,
    width: u32,
    height: u32,
    canvas_color: Color,
    rng: &mut R,
) {
    if width == 0 || height == 0 {
        return;
    }
    let width = width.min(surface.width());
    let height = height.min(surface.height());
    let x = rng.gen_range(0..=surface.width() - width);
    let y = rng.gen_range(0..=surface.height() - height);
    surface.fill_rect(x, y, width, height, canvas_color);
}

fn shift_channel(c: u8, delta: f64) -> u8 {
    (c as f64 + delta).round().clamp(0.0, 255.0) as u8
}
