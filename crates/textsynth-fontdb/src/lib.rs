// this_file: crates/textsynth-fontdb/src/lib.rs

//! Font discovery, rasterization and resource health for textsynth.
//!
//! Three concerns live here because they share the notion of a font as a
//! selectable, failable resource:
//!
//! - [`library`]: weighted font pools and byte-level handle caching
//! - [`engine`]: the outline-engine seam (skrifa outlines, zeno masks)
//! - [`health`]: score/cooldown tracking that steers selection away from
//!   fonts and backgrounds that keep failing

pub mod engine;
pub mod health;
pub mod library;

pub use engine::{FontEngine, FontMetrics, RasterGlyph, SkrifaEngine};
pub use health::{HealthConfig, HealthSnapshot, HealthTracker, ResourceHealth};
pub use library::{FontHandle, FontLibrary, WeightedFont};
