// this_file: crates/textsynth-render/src/lib.rs

//! Text layout and glyph shaping for textsynth.
//!
//! Three stages live here, in the order the executor calls them:
//!
//! 1. [`bidi`] - logical text to visual emission order
//! 2. [`layout`] - line breaking and multi-line placement math
//! 3. [`shaper`] - glyphs onto a surface with per-character boxes,
//!    straight or along arc/sine baselines, in all four directions

pub mod bidi;
pub mod layout;
pub mod shaper;

#[cfg(test)]
mod testutil;

pub use bidi::to_visual;
pub use layout::{break_into_lines, line_positions, multiline_dimensions};
pub use shaper::{shape_line, shape_text, CurveSpec, ShapeParams, ShapedLine, ShapedText};
