// this_file: crates/textsynth-core/src/lib.rs

//! Textsynth Core - shared types and deterministic primitives
//!
//! This crate provides the vocabulary the rest of the textsynth pipeline
//! speaks:
//!
//! 1. **Types** - writing directions, colors, per-character boxes
//! 2. **Surfaces** - straight-alpha RGBA buffers with compositing
//! 3. **Randomness** - seed derivation and named per-image RNG streams
//! 4. **Sampling** - the six bounded parameter distributions
//! 5. **Errors** - the workspace-wide error taxonomy
//!
//! Everything here is pure data or pure computation: no I/O, no clocks,
//! no global state. A generation run is reproducible exactly because every
//! random draw flows through [`rng::RngSet`] seeded from a plan seed.

pub mod error;
pub mod rng;
pub mod sampler;
pub mod surface;
pub mod types;

pub use error::{FailureKind, ResourceKind, Result, SynthError};
pub use sampler::Distribution;
pub use surface::Surface;
pub use types::{
    CharBox, Color, ColorMode, CurveKind, Direction, LineBreakMode, PlacementStrategy,
    TextAlignment,
};
