// this_file: crates/textsynth-effects/src/lib.rs

//! Pixel effects, geometric augmentations and canvas composition.
//!
//! The three post-shaping stages, in execution order:
//!
//! 1. [`effects`] - the fixed-order pixel effect chain on the text
//!    surface (boxes untouched)
//! 2. [`augment`] - geometric transforms that move pixels and boxes
//!    together
//! 3. [`canvas`] - canvas sizing, placement, background crop and final
//!    composition

pub mod augment;
pub mod canvas;
pub mod effects;
pub mod raster;

pub use augment::{apply_augmentations, AppliedAugmentation, Augmentation, AugmentOutcome};
pub use canvas::{
    auto_background_color, background_fit, choose_placement, compose, dominant_color,
    generate_canvas_size, BackgroundFit,
};
pub use effects::{apply_effects, Effect, MorphOp, ReliefMode};
