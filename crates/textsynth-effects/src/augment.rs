// this_file: crates/textsynth-effects/src/augment.rs

//! Geometric augmentations that jointly transform pixels and boxes.
//!
//! Affine and projective transforms (rotation, perspective) move boxes
//! analytically as corner hulls. The nonlinear warps (elastic, grid,
//! optical) recompute every box from its own remapped glyph mask - the
//! single source of truth for boxes under warps that have no clean
//! inverse for rectangles.

use crate::raster::{blur_plane, remap};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use textsynth_core::{CharBox, Color, Surface};

/// One geometric augmentation with its configured parameters. Runtime
/// draws (perspective corners, displacement fields) come from the
/// image's augment RNG stream at application time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Augmentation {
    Rotation { angle: f64 },
    Perspective { magnitude: f64 },
    Elastic { alpha: f64, sigma: f64 },
    Grid { steps: u32, limit: f64 },
    Optical { limit: f64 },
}

impl Augmentation {
    pub fn name(&self) -> &'static str {
        match self {
            Augmentation::Rotation { .. } => "rotation",
            Augmentation::Perspective { .. } => "perspective",
            Augmentation::Elastic { .. } => "elastic",
            Augmentation::Grid { .. } => "grid",
            Augmentation::Optical { .. } => "optical",
        }
    }
}

/// Manifest entry: what actually ran, with every concrete value
/// including runtime draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedAugmentation {
    pub name: String,
    pub params: serde_json::Value,
}

/// Result of running the augmentation chain.
#[derive(Debug)]
pub struct AugmentOutcome {
    pub surface: Surface,
    pub boxes: Vec<CharBox>,
    pub manifest: Vec<AppliedAugmentation>,
    /// Characters whose remapped mask came back empty.
    pub occluded: Vec<char>,
}

/// Apply the chain in recorded order, then clip boxes to the image.
pub fn apply_augmentations<R: Rng + ?Sized>(
    mut surface: Surface,
    mut boxes: Vec<CharBox>,
    augmentations: &[Augmentation],
    rng: &mut R,
) -> AugmentOutcome {
    let mut manifest = Vec::with_capacity(augmentations.len());
    let mut occluded = Vec::new();

    for aug in augmentations {
        match *aug {
            Augmentation::Rotation { angle } => {
                if angle != 0.0 {
                    rotate(&mut surface, &mut boxes, angle);
                    manifest.push(AppliedAugmentation {
                        name: "rotation".to_string(),
                        params: json!({ "angle": angle }),
                    });
                }
            }
            Augmentation::Perspective { magnitude } => {
                if magnitude > 0.0 {
                    let offsets = perspective(&mut surface, &mut boxes, magnitude, rng);
                    manifest.push(AppliedAugmentation {
                        name: "perspective".to_string(),
                        params: json!({ "magnitude": magnitude, "corner_offsets": offsets }),
                    });
                }
            }
            Augmentation::Elastic { alpha, sigma } => {
                if alpha > 0.0 {
                    let field = elastic_field(
                        surface.width() as usize,
                        surface.height() as usize,
                        alpha,
                        sigma,
                        rng,
                    );
                    warp_with_field(&mut surface, &mut boxes, &mut occluded, &field);
                    manifest.push(AppliedAugmentation {
                        name: "elastic".to_string(),
                        params: json!({ "alpha": alpha, "sigma": sigma }),
                    });
                }
            }
            Augmentation::Grid { steps, limit } => {
                if steps >= 2 && limit > 0.0 {
                    let field = grid_field(
                        surface.width() as usize,
                        surface.height() as usize,
                        steps as usize,
                        limit,
                        rng,
                    );
                    warp_with_field(&mut surface, &mut boxes, &mut occluded, &field);
                    manifest.push(AppliedAugmentation {
                        name: "grid".to_string(),
                        params: json!({ "steps": steps, "limit": limit }),
                    });
                }
            }
            Augmentation::Optical { limit } => {
                if limit != 0.0 {
                    let field = optical_field(
                        surface.width() as usize,
                        surface.height() as usize,
                        limit,
                    );
                    warp_with_field(&mut surface, &mut boxes, &mut occluded, &field);
                    manifest.push(AppliedAugmentation {
                        name: "optical".to_string(),
                        params: json!({ "limit": limit }),
                    });
                }
            }
        }
    }

    // Clip everything back into frame; fully clipped boxes count as
    // occluded.
    let w = surface.width() as f32;
    let h = surface.height() as f32;
    let mut kept = Vec::with_capacity(boxes.len());
    for mut b in boxes {
        if b.clip_to(w, h) {
            kept.push(b);
        } else {
            occluded.push(b.ch);
        }
    }

    AugmentOutcome {
        surface,
        boxes: kept,
        manifest,
        occluded,
    }
}

fn rotate(surface: &mut Surface, boxes: &mut [CharBox], angle: f64) {
    let rad = angle.to_radians();
    let (sin, cos) = rad.sin_cos();
    let cx = surface.width() as f64 / 2.0;
    let cy = surface.height() as f64 / 2.0;

    *surface = remap(surface, |x, y| {
        // Inverse rotation back into the source frame.
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        (
            (dx * cos + dy * sin + cx) as f32,
            (-dx * sin + dy * cos + cy) as f32,
        )
    });

    for b in boxes.iter_mut() {
        let rotated = b.corners().map(|(x, y)| {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            (
                (dx * cos - dy * sin + cx) as f32,
                (dx * sin + dy * cos + cy) as f32,
            )
        });
        *b = b.hull_of(rotated);
    }
}

/// Projective warp. Destination corners are the image corners displaced
/// by `magnitude * min(W, H)` times a per-corner unit draw. Returns the
/// drawn offsets for the manifest.
fn perspective<R: Rng + ?Sized>(
    surface: &mut Surface,
    boxes: &mut [CharBox],
    magnitude: f64,
    rng: &mut R,
) -> Vec<[f64; 2]> {
    let w = surface.width() as f64;
    let h = surface.height() as f64;
    let scale = magnitude * w.min(h);

    let src = [[0.0, 0.0], [w, 0.0], [w, h], [0.0, h]];
    let mut offsets = Vec::with_capacity(4);
    let mut dst = [[0.0f64; 2]; 4];
    for (i, corner) in src.iter().enumerate() {
        let ox = rng.gen_range(-1.0..=1.0) * scale;
        let oy = rng.gen_range(-1.0..=1.0) * scale;
        offsets.push([ox, oy]);
        dst[i] = [corner[0] + ox, corner[1] + oy];
    }

    let forward = match homography(&src, &dst) {
        Some(m) => m,
        None => return offsets,
    };
    let inverse = match homography(&dst, &src) {
        Some(m) => m,
        None => return offsets,
    };

    *surface = remap(surface, |x, y| {
        let (sx, sy) = project(&inverse, x as f64, y as f64);
        (sx as f32, sy as f32)
    });

    for b in boxes.iter_mut() {
        let warped = b.corners().map(|(x, y)| {
            let (px, py) = project(&forward, x as f64, y as f64);
            (px as f32, py as f32)
        });
        *b = b.hull_of(warped);
    }
    offsets
}

/// Dense displacement field, dst pixel -> source offset.
struct FlowField {
    dx: Vec<f32>,
    dy: Vec<f32>,
    width: usize,
}

impl FlowField {
    fn source_for(&self, x: f32, y: f32) -> (f32, f32) {
        let xi = (x as usize).min(self.width.saturating_sub(1));
        let yi = y as usize;
        let i = yi * self.width + xi;
        if i >= self.dx.len() {
            return (x, y);
        }
        (x + self.dx[i], y + self.dy[i])
    }
}

/// Random field smoothed by a gaussian of width sigma, scaled by alpha.
fn elastic_field<R: Rng + ?Sized>(
    width: usize,
    height: usize,
    alpha: f64,
    sigma: f64,
    rng: &mut R,
) -> FlowField {
    let n = width * height;
    let mut dx = vec![0.0f32; n];
    let mut dy = vec![0.0f32; n];
    for i in 0..n {
        dx[i] = rng.gen_range(-1.0f32..=1.0);
        dy[i] = rng.gen_range(-1.0f32..=1.0);
    }
    let mut dx = blur_plane(&dx, width, height, sigma.max(0.5));
    let mut dy = blur_plane(&dy, width, height, sigma.max(0.5));
    for v in dx.iter_mut().chain(dy.iter_mut()) {
        *v *= alpha as f32;
    }
    FlowField { dx, dy, width }
}

/// Displace a regular node grid by up to +/- limit and interpolate the
/// field bicubically between nodes.
fn grid_field<R: Rng + ?Sized>(
    width: usize,
    height: usize,
    steps: usize,
    limit: f64,
    rng: &mut R,
) -> FlowField {
    let nodes = steps + 1;
    let mut node_dx = vec![0.0f64; nodes * nodes];
    let mut node_dy = vec![0.0f64; nodes * nodes];
    for i in 0..nodes * nodes {
        node_dx[i] = rng.gen_range(-limit..=limit);
        node_dy[i] = rng.gen_range(-limit..=limit);
    }

    let node_at = |plane: &[f64], gx: i64, gy: i64| -> f64 {
        let gx = gx.clamp(0, nodes as i64 - 1) as usize;
        let gy = gy.clamp(0, nodes as i64 - 1) as usize;
        plane[gy * nodes + gx]
    };

    let sample = |plane: &[f64], fx: f64, fy: f64| -> f64 {
        let gx = fx.floor() as i64;
        let gy = fy.floor() as i64;
        let tx = fx - gx as f64;
        let ty = fy - gy as f64;
        let mut rows = [0.0f64; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            let yy = gy - 1 + r as i64;
            *row = catmull_rom(
                node_at(plane, gx - 1, yy),
                node_at(plane, gx, yy),
                node_at(plane, gx + 1, yy),
                node_at(plane, gx + 2, yy),
                tx,
            );
        }
        catmull_rom(rows[0], rows[1], rows[2], rows[3], ty)
    };

    let n = width * height;
    let mut dx = vec![0.0f32; n];
    let mut dy = vec![0.0f32; n];
    let sx = steps as f64 / (width.max(2) - 1) as f64;
    let sy = steps as f64 / (height.max(2) - 1) as f64;
    for y in 0..height {
        for x in 0..width {
            let fx = x as f64 * sx;
            let fy = y as f64 * sy;
            let i = y * width + x;
            dx[i] = sample(&node_dx, fx, fy) as f32;
            dy[i] = sample(&node_dy, fx, fy) as f32;
        }
    }
    FlowField { dx, dy, width }
}

/// Single-coefficient barrel (k > 0) or pincushion (k < 0) distortion.
fn optical_field(width: usize, height: usize, k: f64) -> FlowField {
    let cx = width as f64 / 2.0;
    let cy = height as f64 / 2.0;
    let rmax = (cx * cx + cy * cy).sqrt().max(1.0);

    let n = width * height;
    let mut dx = vec![0.0f32; n];
    let mut dy = vec![0.0f32; n];
    for y in 0..height {
        for x in 0..width {
            let ox = x as f64 - cx;
            let oy = y as f64 - cy;
            let r = (ox * ox + oy * oy).sqrt() / rmax;
            let factor = 1.0 + k * r * r;
            let i = y * width + x;
            dx[i] = (ox * factor - ox) as f32;
            dy[i] = (oy * factor - oy) as f32;
        }
    }
    FlowField { dx, dy, width }
}

/// Remap pixels through the field, then recompute every box from its
/// own remapped glyph mask.
fn warp_with_field(
    surface: &mut Surface,
    boxes: &mut Vec<CharBox>,
    occluded: &mut Vec<char>,
    field: &FlowField,
) {
    let before = surface.clone();
    *surface = remap(&before, |x, y| field.source_for(x, y));

    let mut kept = Vec::with_capacity(boxes.len());
    for b in boxes.drain(..) {
        // Isolate the glyph: source alpha restricted to its own box.
        let mut mask = Surface::new(before.width(), before.height());
        let x0 = b.x0.floor().max(0.0) as u32;
        let y0 = b.y0.floor().max(0.0) as u32;
        let x1 = (b.x1.ceil() as u32).min(before.width());
        let y1 = (b.y1.ceil() as u32).min(before.height());
        for y in y0..y1 {
            for x in x0..x1 {
                let a = before.get(x, y).a;
                if a > 0 {
                    mask.put(x, y, Color::rgba(255, 255, 255, a));
                }
            }
        }
        let warped = remap(&mask, |x, y| field.source_for(x, y));
        match warped.ink_box() {
            Some((ix0, iy0, ix1, iy1)) => {
                let mut nb = b.clone();
                nb.x0 = ix0 as f32;
                nb.y0 = iy0 as f32;
                nb.x1 = ix1 as f32;
                nb.y1 = iy1 as f32;
                kept.push(nb);
            }
            None => occluded.push(b.ch),
        }
    }
    *boxes = kept;
}

fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

/// Fit the 3x3 homography mapping four source points onto four
/// destination points. Returns `None` for degenerate corner sets.
fn homography(src: &[[f64; 2]; 4], dst: &[[f64; 2]; 4]) -> Option<[f64; 9]> {
    let mut a = [[0.0f64; 9]; 8];
    for i in 0..4 {
        let [x, y] = src[i];
        let [u, v] = dst[i];
        a[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, u];
        a[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, v];
    }
    let h = solve8(&mut a)?;
    Some([h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0])
}

/// Gaussian elimination with partial pivoting on an 8x9 augmented
/// system.
fn solve8(a: &mut [[f64; 9]; 8]) -> Option<[f64; 8]> {
    for col in 0..8 {
        let pivot = (col..8).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        let div = a[col][col];
        for k in col..9 {
            a[col][k] /= div;
        }
        for row in 0..8 {
            if row != col {
                let factor = a[row][col];
                if factor != 0.0 {
                    for k in col..9 {
                        a[row][k] -= factor * a[col][k];
                    }
                }
            }
        }
    }
    let mut x = [0.0f64; 8];
    for i in 0..8 {
        x[i] = a[i][8];
    }
    Some(x)
}

fn project(h: &[f64; 9], x: f64, y: f64) -> (f64, f64) {
    let w = h[6] * x + h[7] * y + h[8];
    let w = if w.abs() < 1e-12 { 1e-12 } else { w };
    ((h[0] * x + h[1] * y + h[2]) / w, (h[3] * x + h[4] * y + h[5]) / w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn glyph_scene() -> (Surface, Vec<CharBox>) {
        let mut s = Surface::new(80, 80);
        s.fill_rect(10, 10, 10, 14, Color::black());
        s.fill_rect(30, 10, 10, 14, Color::black());
        let boxes = vec![
            CharBox::new('a', 10.0, 10.0, 20.0, 24.0),
            CharBox::new('b', 30.0, 10.0, 40.0, 24.0),
        ];
        (s, boxes)
    }

    #[test]
    fn homography_identity_when_corners_match() {
        let corners = [[0.0, 0.0], [80.0, 0.0], [80.0, 40.0], [0.0, 40.0]];
        let h = homography(&corners, &corners).unwrap();
        let (x, y) = project(&h, 12.0, 30.0);
        assert!((x - 12.0).abs() < 1e-6);
        assert!((y - 30.0).abs() < 1e-6);
    }

    #[test]
    fn rotation_90_preserves_box_area_roughly() {
        let (s, boxes) = glyph_scene();
        let mut rng = Pcg64::seed_from_u64(1);
        let out = apply_augmentations(
            s,
            boxes,
            &[Augmentation::Rotation { angle: 90.0 }],
            &mut rng,
        );
        assert_eq!(out.boxes.len(), 2);
        for b in &out.boxes {
            // 10x14 rectangle rotated a quarter turn becomes 14x10.
            assert!((b.width() - 14.0).abs() < 0.01, "w {}", b.width());
            assert!((b.height() - 10.0).abs() < 0.01, "h {}", b.height());
        }
    }

    #[test]
    fn small_rotation_keeps_boxes_over_ink() {
        let (s, boxes) = glyph_scene();
        let mut rng = Pcg64::seed_from_u64(2);
        let out = apply_augmentations(
            s,
            boxes,
            &[Augmentation::Rotation { angle: 10.0 }],
            &mut rng,
        );
        // Every inked pixel must fall inside some box.
        for y in 0..out.surface.height() {
            for x in 0..out.surface.width() {
                if out.surface.get(x, y).a > 128 {
                    let inside = out.boxes.iter().any(|b| {
                        (x as f32) >= b.x0 - 1.0
                            && (x as f32) <= b.x1 + 1.0
                            && (y as f32) >= b.y0 - 1.0
                            && (y as f32) <= b.y1 + 1.0
                    });
                    assert!(inside, "ink at ({x},{y}) outside all boxes");
                }
            }
        }
    }

    #[test]
    fn zero_angle_rotation_is_skipped() {
        let (s, boxes) = glyph_scene();
        let mut rng = Pcg64::seed_from_u64(3);
        let out = apply_augmentations(
            s.clone(),
            boxes.clone(),
            &[Augmentation::Rotation { angle: 0.0 }],
            &mut rng,
        );
        assert!(out.manifest.is_empty());
        assert_eq!(out.surface, s);
        assert_eq!(out.boxes, boxes);
    }

    #[test]
    fn perspective_records_corner_offsets() {
        let (s, boxes) = glyph_scene();
        let mut rng = Pcg64::seed_from_u64(4);
        let out = apply_augmentations(
            s,
            boxes,
            &[Augmentation::Perspective { magnitude: 0.05 }],
            &mut rng,
        );
        assert_eq!(out.manifest.len(), 1);
        let offsets = out.manifest[0].params["corner_offsets"]
            .as_array()
            .unwrap();
        assert_eq!(offsets.len(), 4);
        assert_eq!(out.boxes.len(), 2);
    }

    #[test]
    fn elastic_recomputes_boxes_from_masks() {
        let (s, boxes) = glyph_scene();
        let mut rng = Pcg64::seed_from_u64(5);
        let out = apply_augmentations(
            s,
            boxes,
            &[Augmentation::Elastic {
                alpha: 3.0,
                sigma: 4.0,
            }],
            &mut rng,
        );
        assert_eq!(out.boxes.len() + out.occluded.len(), 2);
        for b in &out.boxes {
            assert!(b.x1 > b.x0 && b.y1 > b.y0);
            // Ink cannot teleport across the surface under a 3px field.
            assert!(b.x0 < 50.0);
        }
    }

    #[test]
    fn field_warps_are_deterministic() {
        let (s, boxes) = glyph_scene();
        let augmentations = [Augmentation::Grid {
            steps: 4,
            limit: 2.0,
        }];
        let mut rng_a = Pcg64::seed_from_u64(6);
        let mut rng_b = Pcg64::seed_from_u64(6);
        let a = apply_augmentations(s.clone(), boxes.clone(), &augmentations, &mut rng_a);
        let b = apply_augmentations(s, boxes, &augmentations, &mut rng_b);
        assert_eq!(a.surface, b.surface);
        assert_eq!(a.boxes, b.boxes);
    }

    #[test]
    fn optical_is_identity_at_center() {
        let field = optical_field(21, 21, 0.5);
        let (sx, sy) = field.source_for(10.0, 10.0);
        assert!((sx - 10.0).abs() < 0.51);
        assert!((sy - 10.0).abs() < 0.51);
        // Corners move outward under barrel distortion.
        let (cx, _) = field.source_for(0.0, 0.0);
        assert!(cx < 0.0);
    }

    #[test]
    fn boxes_are_clipped_and_flagged() {
        let mut s = Surface::new(40, 40);
        s.fill_rect(0, 0, 12, 12, Color::black());
        let boxes = vec![CharBox::new('x', 0.0, 0.0, 12.0, 12.0)];
        let mut rng = Pcg64::seed_from_u64(7);
        let out = apply_augmentations(
            s,
            boxes,
            &[Augmentation::Rotation { angle: 45.0 }],
            &mut rng,
        );
        // The rotated hull pokes outside and gets clipped.
        assert_eq!(out.boxes.len(), 1);
        assert!(out.boxes[0].truncated || out.boxes[0].x0 >= 0.0);
    }
}
