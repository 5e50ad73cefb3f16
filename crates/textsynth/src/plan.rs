// this_file: crates/textsynth/src/plan.rs

//! The Plan: the fully concrete parameter vector for one image.
//!
//! A plan is pure data. It is the sole input to the executor, the only
//! object that crosses the worker boundary, and the ground truth the
//! label record is built from. Re-executing the same plan in the same
//! process reproduces the image byte for byte.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use textsynth_core::{
    Color, ColorMode, CurveKind, Direction, LineBreakMode, PlacementStrategy, TextAlignment,
};
use textsynth_effects::{Augmentation, Effect};
use textsynth_render::CurveSpec;

/// A scheduled unit of work: which spec, what text, which resources,
/// and the stable image index.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub spec_index: usize,
    pub spec_name: String,
    pub image_index: u64,
    pub text: String,
    pub font_path: PathBuf,
    pub background_path: Option<PathBuf>,
}

/// Curve parameters, all present even when the kind leaves them unused
/// so label schemas stay uniform across configurations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePlan {
    pub kind: CurveKind,
    pub arc_intensity: f64,
    pub concave: bool,
    pub sine_amplitude: f64,
    pub sine_frequency: f64,
    pub sine_phase: f64,
}

impl CurvePlan {
    pub fn none() -> Self {
        Self {
            kind: CurveKind::None,
            arc_intensity: 0.0,
            concave: false,
            sine_amplitude: 0.0,
            sine_frequency: 0.0,
            sine_phase: 0.0,
        }
    }

    pub fn to_spec(self) -> CurveSpec {
        CurveSpec {
            kind: self.kind,
            arc_intensity: self.arc_intensity,
            amplitude: self.sine_amplitude,
            frequency: self.sine_frequency,
            phase: self.sine_phase,
            concave: self.concave,
        }
    }
}

/// Resolved glyph coloring: one color for uniform, two gradient
/// endpoints, or one per glyph for the per-glyph and random modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorPlan {
    pub mode: ColorMode,
    pub colors: Vec<Color>,
}

impl ColorPlan {
    /// Color of the glyph at `index` among `total` glyphs.
    pub fn color_at(&self, index: usize, total: usize) -> Color {
        if self.colors.is_empty() {
            return Color::black();
        }
        match self.mode {
            ColorMode::Uniform => self.colors[0],
            ColorMode::Gradient => {
                let from = self.colors[0];
                let to = *self.colors.last().unwrap_or(&from);
                let t = if total <= 1 {
                    0.0
                } else {
                    index as f32 / (total - 1) as f32
                };
                from.lerp(to, t)
            }
            ColorMode::PerGlyph | ColorMode::Random => self.colors[index % self.colors.len()],
        }
    }
}

/// Background fill: explicit color, or solved for contrast at
/// composition time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundPlan {
    Auto,
    Color(Color),
}

/// The concrete parameter vector for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub spec_name: String,
    pub image_index: u64,
    /// Per-image seed: `hash(master_seed, image_index, spec_name)`.
    pub seed: u64,
    pub text: String,
    pub font_path: PathBuf,
    pub direction: Direction,
    pub font_size: u32,
    pub num_lines: u32,
    pub line_break: LineBreakMode,
    pub line_spacing: f64,
    pub alignment: TextAlignment,
    pub curve: CurvePlan,
    pub overlap: f64,
    pub color: ColorPlan,
    pub background: BackgroundPlan,
    pub background_path: Option<PathBuf>,
    pub effects: Vec<Effect>,
    pub augmentations: Vec<Augmentation>,
    pub min_padding: u32,
    pub max_megapixels: f64,
    pub placement: PlacementStrategy,
}

impl Plan {
    /// Whether any box-nonlinear warp is in the chain (elastic, grid,
    /// optical). Used by tests and invariants: without one, the box
    /// count must equal the visual character count.
    pub fn has_nonlinear_warp(&self) -> bool {
        self.augmentations.iter().any(|a| {
            matches!(
                a,
                Augmentation::Elastic { .. }
                    | Augmentation::Grid { .. }
                    | Augmentation::Optical { .. }
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_interpolates_across_glyph_index() {
        let plan = ColorPlan {
            mode: ColorMode::Gradient,
            colors: vec![Color::black(), Color::white()],
        };
        assert_eq!(plan.color_at(0, 5), Color::black());
        assert_eq!(plan.color_at(4, 5), Color::white());
        let mid = plan.color_at(2, 5);
        assert!(mid.r > 100 && mid.r < 160);
    }

    #[test]
    fn uniform_ignores_index() {
        let plan = ColorPlan {
            mode: ColorMode::Uniform,
            colors: vec![Color::rgb(10, 20, 30)],
        };
        assert_eq!(plan.color_at(0, 3), plan.color_at(2, 3));
    }

    #[test]
    fn plan_round_trips_through_json() {
        let plan = Plan {
            spec_name: "latin".into(),
            image_index: 12,
            seed: 999,
            text: "Hi".into(),
            font_path: "fonts/a.ttf".into(),
            direction: Direction::Ltr,
            font_size: 32,
            num_lines: 1,
            line_break: LineBreakMode::Word,
            line_spacing: 1.0,
            alignment: TextAlignment::Center,
            curve: CurvePlan::none(),
            overlap: 0.0,
            color: ColorPlan {
                mode: ColorMode::Uniform,
                colors: vec![Color::black()],
            },
            background: BackgroundPlan::Auto,
            background_path: None,
            effects: vec![Effect::InkBleed { radius: 1.0 }],
            augmentations: vec![Augmentation::Rotation { angle: 3.0 }],
            min_padding: 8,
            max_megapixels: 4.0,
            placement: PlacementStrategy::Center,
        };
        let json = serde_json::to_string(&plan).unwrap();
        let back: Plan = serde_json::from_str(&json).unwrap();
        assert_eq!(plan, back);
    }

    #[test]
    fn nonlinear_warp_detection() {
        let mut plan: Plan = serde_json::from_str(
            &serde_json::to_string(&Plan {
                spec_name: "s".into(),
                image_index: 0,
                seed: 0,
                text: String::new(),
                font_path: PathBuf::new(),
                direction: Direction::Ltr,
                font_size: 24,
                num_lines: 1,
                line_break: LineBreakMode::Word,
                line_spacing: 1.0,
                alignment: TextAlignment::Center,
                curve: CurvePlan::none(),
                overlap: 0.0,
                color: ColorPlan {
                    mode: ColorMode::Uniform,
                    colors: vec![],
                },
                background: BackgroundPlan::Auto,
                background_path: None,
                effects: vec![],
                augmentations: vec![Augmentation::Rotation { angle: 5.0 }],
                min_padding: 8,
                max_megapixels: 4.0,
                placement: PlacementStrategy::Center,
            })
            .unwrap(),
        )
        .unwrap();
        assert!(!plan.has_nonlinear_warp());
        plan.augmentations.push(Augmentation::Elastic {
            alpha: 2.0,
            sigma: 4.0,
        });
        assert!(plan.has_nonlinear_warp());
    }
}
