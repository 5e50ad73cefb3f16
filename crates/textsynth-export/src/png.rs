// this_file: crates/textsynth-export/src/png.rs

//! PNG encoding of generated canvases and decoding of backgrounds.

use image::{ImageBuffer, ImageEncoder, RgbImage, RgbaImage};
use textsynth_core::{ResourceKind, Result, Surface, SynthError};

/// Encode a surface as PNG bytes.
///
/// Fully opaque surfaces are written as 8-bit RGB; anything with
/// transparency keeps its alpha channel.
pub fn encode_png(surface: &Surface) -> Result<Vec<u8>> {
    let opaque = surface
        .data()
        .chunks_exact(4)
        .all(|px| px[3] == 255);

    let mut out = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new_with_quality(
        &mut out,
        image::codecs::png::CompressionType::Default,
        image::codecs::png::FilterType::Sub,
    );

    if opaque {
        let mut rgb = Vec::with_capacity(surface.data().len() / 4 * 3);
        for px in surface.data().chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
        }
        let img: RgbImage = ImageBuffer::from_raw(surface.width(), surface.height(), rgb)
            .ok_or_else(|| {
                SynthError::InternalInvariant("RGB buffer does not match dimensions".to_string())
            })?;
        encoder
            .write_image(
                img.as_raw(),
                surface.width(),
                surface.height(),
                image::ExtendedColorType::Rgb8,
            )
            .map_err(|e| SynthError::InternalInvariant(format!("PNG encoding failed: {e}")))?;
    } else {
        let img: RgbaImage =
            ImageBuffer::from_raw(surface.width(), surface.height(), surface.data().to_vec())
                .ok_or_else(|| {
                    SynthError::InternalInvariant(
                        "RGBA buffer does not match dimensions".to_string(),
                    )
                })?;
        encoder
            .write_image(
                img.as_raw(),
                surface.width(),
                surface.height(),
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| SynthError::InternalInvariant(format!("PNG encoding failed: {e}")))?;
    }
    Ok(out)
}

/// Decode an image file (PNG or JPEG) into a surface. Used for
/// background photographs.
pub fn load_image(path: &std::path::Path) -> Result<Surface> {
    let img = image::open(path).map_err(|e| {
        log::warn!("background decode failed for {}: {e}", path.display());
        SynthError::ResourceMissing {
            kind: ResourceKind::Background,
            path: path.display().to_string(),
        }
    })?;
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    Surface::from_rgba(w, h, rgba.into_raw()).ok_or_else(|| {
        SynthError::InternalInvariant("decoded image buffer mismatch".to_string())
    })
}
