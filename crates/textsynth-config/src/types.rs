// this_file: crates/textsynth-config/src/types.rs

//! Typed configuration records for a generation batch.
//!
//! These structs mirror the YAML document one-to-one. Loading produces a
//! `GeneratorConfig`; after [`crate::validate`] accepts it, the config is
//! shared read-only for the rest of the run.

use serde::{Deserialize, Serialize};
use textsynth_core::{
    ColorMode, CurveKind, Direction, Distribution, LineBreakMode, PlacementStrategy, TextAlignment,
};

/// An RGB triple as written in config files and labels.
pub type RgbTriple = [u8; 3];

/// A `(min, max, distribution)` triple, the unit of every tunable knob.
/// A `0..0` range disables the knob.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub distribution: Distribution,
}

impl ParamRange {
    pub const fn fixed(v: f64) -> Self {
        Self {
            min: v,
            max: v,
            distribution: Distribution::Uniform,
        }
    }

    pub const fn uniform(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            distribution: Distribution::Uniform,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.min == 0.0 && self.max == 0.0
    }

    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }
}

impl Default for ParamRange {
    fn default() -> Self {
        Self::fixed(0.0)
    }
}

/// Inclusive integer bounds (text length in characters, line counts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

impl CountRange {
    pub const fn fixed(v: u32) -> Self {
        Self { min: v, max: v }
    }

    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }
}

/// A file selector: a glob pattern with an optional weight. Plain strings
/// deserialize with weight 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeightedPattern {
    Plain(String),
    Weighted { pattern: String, weight: f64 },
}

impl WeightedPattern {
    pub fn pattern(&self) -> &str {
        match self {
            WeightedPattern::Plain(p) => p,
            WeightedPattern::Weighted { pattern, .. } => pattern,
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            WeightedPattern::Plain(_) => 1.0,
            WeightedPattern::Weighted { weight, .. } => *weight,
        }
    }
}

/// Baseline curvature configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    pub kind: CurveKind,
    /// Arc intensity in (0, 1]; radius is derived from rendered length.
    pub arc_intensity: ParamRange,
    /// Sine amplitude as a fraction of max glyph height.
    pub sine_amplitude: ParamRange,
    /// Extra sine cycles over the rendered length.
    pub sine_frequency: ParamRange,
    /// Sine phase offset in radians.
    pub sine_phase: ParamRange,
    /// Probability that the curve bends toward the baseline (smile).
    pub concave_probability: f64,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            kind: CurveKind::None,
            arc_intensity: ParamRange::default(),
            sine_amplitude: ParamRange::default(),
            sine_frequency: ParamRange::default(),
            sine_phase: ParamRange::default(),
            concave_probability: 0.5,
        }
    }
}

/// Palette selection: a named built-in or an explicit RGB list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaletteSpec {
    Named(String),
    Custom(Vec<RgbTriple>),
}

/// Text color configuration. The palette dialect is canonical; the
/// `color_min`/`color_max` range dialect is honored for uniform and
/// gradient modes only when no custom palette is given. Configuring both
/// is rejected by the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    pub mode: ColorMode,
    pub palette: Option<PaletteSpec>,
    pub color_min: Option<RgbTriple>,
    pub color_max: Option<RgbTriple>,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            mode: ColorMode::Uniform,
            palette: None,
            color_min: None,
            color_max: None,
        }
    }
}

/// Background fill: an explicit color or automatic contrast against the
/// dominant text color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackgroundColor {
    Named(String),
    Rgb(RgbTriple),
}

impl BackgroundColor {
    pub fn is_auto(&self) -> bool {
        matches!(self, BackgroundColor::Named(name) if name == "auto")
    }
}

impl Default for BackgroundColor {
    fn default() -> Self {
        BackgroundColor::Named("auto".to_string())
    }
}

/// Per-surface pixel effect ranges, in chain order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectRanges {
    /// Ink bleed blur radius, pixels.
    pub ink_bleed: ParamRange,
    /// Shadow offset magnitude, pixels. Zero disables the shadow.
    pub shadow_offset: ParamRange,
    /// Shadow blur radius, pixels.
    pub shadow_blur: ParamRange,
    /// Relief depth, pixels. Zero means no 3D relief.
    pub relief_depth: ParamRange,
    /// Salt-and-pepper density in [0, 1].
    pub noise_density: ParamRange,
    /// Full-surface gaussian blur radius, pixels.
    pub blur_radius: ParamRange,
    /// Brightness multiplier, centered at 1.0.
    pub brightness: ParamRange,
    /// Contrast multiplier, centered at 1.0.
    pub contrast: ParamRange,
    /// Morphology kernel size; rounded up to the next odd integer.
    pub morph_kernel: ParamRange,
    /// Cutout rectangle edge, pixels.
    pub cutout_size: ParamRange,
}

/// Geometric augmentation ranges, in application order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentRanges {
    /// Rotation angle, degrees. Ranges may span zero.
    pub rotation: ParamRange,
    /// Perspective corner displacement as a fraction of min(W, H).
    pub perspective: ParamRange,
    /// Elastic displacement scale (alpha), pixels.
    pub elastic_alpha: ParamRange,
    /// Elastic smoothing sigma, pixels.
    pub elastic_sigma: ParamRange,
    /// Grid distortion steps per axis.
    pub grid_steps: ParamRange,
    /// Grid node displacement limit, pixels.
    pub grid_limit: ParamRange,
    /// Barrel distortion coefficient.
    pub optical_limit: ParamRange,
}

/// One generation profile: direction, resources, layout and parameter
/// ranges for a fraction of the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSpec {
    pub name: String,
    pub proportion: f64,
    #[serde(default = "default_direction")]
    pub direction: Direction,
    pub corpus: Vec<WeightedPattern>,
    pub fonts: Vec<WeightedPattern>,
    #[serde(default)]
    pub backgrounds: Vec<WeightedPattern>,
    pub text_length: CountRange,
    #[serde(default = "default_line_count")]
    pub line_count: CountRange,
    #[serde(default = "default_line_break")]
    pub line_break: LineBreakMode,
    #[serde(default = "default_line_spacing")]
    pub line_spacing: ParamRange,
    #[serde(default = "default_alignment")]
    pub alignment: TextAlignment,
    #[serde(default)]
    pub curve: CurveConfig,
    #[serde(default)]
    pub color: ColorConfig,
    #[serde(default)]
    pub background_color: BackgroundColor,
    #[serde(default = "default_font_size")]
    pub font_size: ParamRange,
    /// Per-glyph advance shrink intensity in [0, 1].
    #[serde(default)]
    pub glyph_overlap: ParamRange,
    #[serde(default)]
    pub effects: EffectRanges,
    #[serde(default)]
    pub augment: AugmentRanges,
}

fn default_direction() -> Direction {
    Direction::Ltr
}

fn default_line_count() -> CountRange {
    CountRange::fixed(1)
}

fn default_line_break() -> LineBreakMode {
    LineBreakMode::Word
}

fn default_line_spacing() -> ParamRange {
    ParamRange::fixed(1.0)
}

fn default_alignment() -> TextAlignment {
    TextAlignment::Center
}

fn default_font_size() -> ParamRange {
    ParamRange::uniform(24.0, 48.0)
}

/// Runtime knobs the scheduler consumes. CLI flags override these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Tasks per streaming chunk.
    pub chunk_size: usize,
    /// Outputs flushed per I/O batch.
    pub io_batch_size: usize,
    /// Worker threads for plan + execute. Zero means one per core.
    pub generation_workers: usize,
    /// Threads for image/label writing.
    pub io_workers: usize,
    /// Canvas area cap, megapixels.
    pub max_megapixels: f64,
    /// Minimum padding around the text surface, pixels.
    pub min_padding: u32,
    pub placement: PlacementStrategy,
    /// Per-task retries with a fresh resource before skipping.
    pub retry_budget: u32,
    /// Optional wall-clock budget for the whole batch.
    pub time_budget_secs: Option<u64>,
    /// Persist health snapshots next to the outputs.
    pub persist_health: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            io_batch_size: 16,
            generation_workers: 0,
            io_workers: 1,
            max_megapixels: 4.0,
            min_padding: 8,
            placement: PlacementStrategy::WeightedRandom,
            retry_budget: 3,
            time_budget_secs: None,
            persist_health: false,
        }
    }
}

/// The whole batch: image count, master seed and the ordered spec list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub total_images: u64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    pub specs: Vec<BatchSpec>,
}

impl GeneratorConfig {
    /// Master seed with the documented default of zero when unset.
    pub fn master_seed(&self) -> u64 {
        self.seed.unwrap_or(0)
    }
}
