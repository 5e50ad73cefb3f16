// this_file: crates/textsynth-effects/src/raster.rs

//! Low-level raster helpers shared by the effect chain and the
//! augmenter: separable gaussian blur, float planes and coordinate
//! remapping.

use textsynth_core::{Color, Surface};

/// Normalized 1D gaussian kernel with half-width `3 * sigma`.
pub fn gaussian_kernel(sigma: f64) -> Vec<f32> {
    let sigma = sigma.max(1e-3);
    let half = (sigma * 3.0).ceil() as i64;
    let mut kernel = Vec::with_capacity((2 * half + 1) as usize);
    let denom = 2.0 * sigma * sigma;
    let mut sum = 0.0f64;
    for i in -half..=half {
        let v = (-(i * i) as f64 / denom).exp();
        kernel.push(v as f32);
        sum += v;
    }
    let inv = (1.0 / sum) as f32;
    for k in &mut kernel {
        *k *= inv;
    }
    kernel
}

/// Separable gaussian blur over a float plane.
pub fn blur_plane(plane: &[f32], width: usize, height: usize, sigma: f64) -> Vec<f32> {
    if sigma <= 0.0 || plane.is_empty() {
        return plane.to_vec();
    }
    let kernel = gaussian_kernel(sigma);
    let half = (kernel.len() / 2) as i64;

    let mut horizontal = vec![0.0f32; plane.len()];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let sx = (x as i64 + k as i64 - half).clamp(0, width as i64 - 1) as usize;
                acc += plane[y * width + sx] * w;
            }
            horizontal[y * width + x] = acc;
        }
    }

    let mut out = vec![0.0f32; plane.len()];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let sy = (y as i64 + k as i64 - half).clamp(0, height as i64 - 1) as usize;
                acc += horizontal[sy * width + x] * w;
            }
            out[y * width + x] = acc;
        }
    }
    out
}

/// Gaussian blur of a full RGBA surface, performed on premultiplied
/// planes so transparent regions do not darken the result.
pub fn blur_surface(surface: &Surface, sigma: f64) -> Surface {
    if sigma <= 0.0 {
        return surface.clone();
    }
    let w = surface.width() as usize;
    let h = surface.height() as usize;
    let n = w * h;
    let mut planes = [
        vec![0.0f32; n],
        vec![0.0f32; n],
        vec![0.0f32; n],
        vec![0.0f32; n],
    ];
    for (i, px) in surface.data().chunks_exact(4).enumerate() {
        let a = px[3] as f32 / 255.0;
        planes[0][i] = px[0] as f32 * a;
        planes[1][i] = px[1] as f32 * a;
        planes[2][i] = px[2] as f32 * a;
        planes[3][i] = px[3] as f32;
    }
    let blurred: Vec<Vec<f32>> = planes
        .iter()
        .map(|p| blur_plane(p, w, h, sigma))
        .collect();

    let mut out = Surface::new(surface.width(), surface.height());
    for i in 0..n {
        let a = blurred[3][i];
        let color = if a <= 0.0 {
            Color::transparent()
        } else {
            let inv = 255.0 / a;
            Color::rgba(
                (blurred[0][i] * inv).round().clamp(0.0, 255.0) as u8,
                (blurred[1][i] * inv).round().clamp(0.0, 255.0) as u8,
                (blurred[2][i] * inv).round().clamp(0.0, 255.0) as u8,
                a.round().clamp(0.0, 255.0) as u8,
            )
        };
        let x = (i % w) as u32;
        let y = (i / w) as u32;
        out.put(x, y, color);
    }
    out
}

/// Blur only an alpha mask, returning a new mask.
pub fn blur_mask(mask: &[u8], width: usize, height: usize, sigma: f64) -> Vec<u8> {
    let plane: Vec<f32> = mask.iter().map(|&a| a as f32).collect();
    blur_plane(&plane, width, height, sigma)
        .into_iter()
        .map(|v| v.round().clamp(0.0, 255.0) as u8)
        .collect()
}

/// Remap a surface through an arbitrary destination-to-source mapping,
/// sampling bilinearly. Out-of-range sources become transparent.
pub fn remap<F>(surface: &Surface, map: F) -> Surface
where
    F: Fn(f32, f32) -> (f32, f32),
{
    let mut out = Surface::new(surface.width(), surface.height());
    for y in 0..surface.height() {
        for x in 0..surface.width() {
            let (sx, sy) = map(x as f32, y as f32);
            let c = surface.sample_bilinear(sx, sy);
            if c.a > 0 {
                out.put(x, y, c);
            }
        }
    }
    out
}
