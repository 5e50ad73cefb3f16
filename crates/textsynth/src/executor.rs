// this_file: crates/textsynth/src/executor.rs

//! The deterministic plan runner.
//!
//! `generate_from_plan` seeds the named RNG streams from the plan seed
//! and drives layout, shaping, effects, augmentation and composition in
//! fixed order, consuming only what the plan recorded. Running the same
//! plan twice in one process yields byte-identical output.

use crate::plan::{BackgroundPlan, Plan};
use textsynth_core::rng::RngSet;
use textsynth_core::{CharBox, Color, Result, Surface, SynthError};
use textsynth_effects::{
    apply_augmentations, apply_effects, auto_background_color, background_fit, canvas,
    dominant_color, AppliedAugmentation, BackgroundFit,
};
use textsynth_fontdb::{FontEngine, FontLibrary};
use textsynth_render::{break_into_lines, shape_text, to_visual, ShapeParams};

/// Why a configured background did not end up behind the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundIssue {
    /// Covers the text but not the canvas: moderate penalty.
    TooSmallForCanvas,
    /// Cannot even cover the text: severe penalty.
    TooSmallForText,
    /// Decode or read failure: severe penalty.
    Unreadable,
}

/// Everything one executed plan produces, ready for encoding.
#[derive(Debug)]
pub struct GenOutput {
    pub surface: Surface,
    pub boxes: Vec<CharBox>,
    pub lines: Vec<String>,
    pub applied_effects: Vec<String>,
    pub augment_manifest: Vec<AppliedAugmentation>,
    pub occluded: Vec<char>,
    pub canvas_size: (u32, u32),
    pub placement: (u32, u32),
    pub background_color: Color,
    pub background_used: bool,
    pub background_issue: Option<BackgroundIssue>,
}

/// Execute a plan against the font engine and library.
pub fn generate_from_plan(
    plan: &Plan,
    engine: &dyn FontEngine,
    fonts: &FontLibrary,
) -> Result<GenOutput> {
    let mut rngs = RngSet::from_seed(plan.seed);
    let font = fonts.load(&plan.font_path)?;

    // Layout: logical lines, then visual emission order per line.
    let lines = break_into_lines(&plan.text, plan.num_lines as usize, plan.line_break);
    let visual_lines: Vec<String> = lines
        .iter()
        .map(|line| to_visual(line, plan.direction))
        .collect();
    let glyph_total: usize = visual_lines.iter().map(|l| l.chars().count()).sum();

    let colors: Vec<Color> = (0..glyph_total)
        .map(|i| plan.color.color_at(i, glyph_total))
        .collect();
    let background_color = match plan.background {
        BackgroundPlan::Color(c) => c,
        BackgroundPlan::Auto => auto_background_color(dominant_color(&colors)),
    };

    // Shape.
    let params = ShapeParams {
        direction: plan.direction,
        font_size: plan.font_size as f32,
        overlap: plan.overlap,
        margin: (plan.font_size / 4).max(2),
        curve: plan.curve.to_spec(),
    };
    let shaped = shape_text(
        engine,
        &font,
        &visual_lines,
        &colors,
        plan.line_spacing,
        plan.alignment,
        &params,
        &mut rngs.layout,
    )?;

    // Pixel effects, boxes untouched.
    let mut surface = shaped.surface;
    apply_effects(&mut surface, &plan.effects, background_color, &mut rngs.effects);
    let applied_effects: Vec<String> =
        plan.effects.iter().map(|e| e.name().to_string()).collect();

    // Geometric augmentations, boxes tracked.
    let outcome = apply_augmentations(surface, shaped.boxes, &plan.augmentations, &mut rngs.augment);

    if !plan.has_nonlinear_warp()
        && outcome.boxes.len() + outcome.occluded.len() != glyph_total
    {
        return Err(SynthError::InternalInvariant(format!(
            "box conservation violated: {} boxes + {} occluded != {glyph_total} glyphs",
            outcome.boxes.len(),
            outcome.occluded.len()
        )));
    }

    // Canvas: size, placement, optional background.
    let text_w = outcome.surface.width();
    let text_h = outcome.surface.height();
    let canvas_size = canvas::generate_canvas_size(
        &mut rngs.placement,
        text_w,
        text_h,
        plan.min_padding,
        plan.max_megapixels,
    );
    let placement = canvas::choose_placement(
        &mut rngs.placement,
        canvas_size.0,
        canvas_size.1,
        text_w,
        text_h,
        plan.placement,
    );

    let mut background_surface = None;
    let mut background_issue = None;
    if let Some(path) = &plan.background_path {
        match textsynth_export::load_image(path) {
            Ok(img) => match background_fit(
                img.width(),
                img.height(),
                canvas_size,
                (text_w, text_h),
            ) {
                BackgroundFit::Fits => background_surface = Some(img),
                BackgroundFit::SmallerThanCanvas => {
                    background_issue = Some(BackgroundIssue::TooSmallForCanvas)
                }
                BackgroundFit::SmallerThanText => {
                    background_issue = Some(BackgroundIssue::TooSmallForText)
                }
            },
            Err(_) => background_issue = Some(BackgroundIssue::Unreadable),
        }
    }
    let background_used = background_surface.is_some();

    let (canvas_surface, boxes) = canvas::compose(
        &mut rngs.placement,
        &outcome.surface,
        &outcome.boxes,
        canvas_size.0,
        canvas_size.1,
        placement,
        background_surface.as_ref(),
        background_color,
    );

    Ok(GenOutput {
        surface: canvas_surface,
        boxes,
        lines,
        applied_effects,
        augment_manifest: outcome.manifest,
        occluded: outcome.occluded,
        canvas_size,
        placement,
        background_color,
        background_used,
        background_issue,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{ColorPlan, CurvePlan};
    use crate::testutil::{basic_plan, stub_font_library, StubEngine};
    use textsynth_core::{ColorMode, CurveKind, Direction};
    use textsynth_effects::{Augmentation, Effect};

    #[test]
    fn same_plan_twice_is_byte_identical() {
        let engine = StubEngine::default();
        let (fonts, _dir) = stub_font_library();
        let plan = basic_plan("Hello", 7);
        let a = generate_from_plan(&plan, &engine, &fonts).unwrap();
        let b = generate_from_plan(&plan, &engine, &fonts).unwrap();
        assert_eq!(a.surface, b.surface);
        assert_eq!(a.boxes, b.boxes);
        assert_eq!(a.canvas_size, b.canvas_size);
        assert_eq!(a.placement, b.placement);
    }

    #[test]
    fn box_count_matches_visual_text() {
        let engine = StubEngine::default();
        let (fonts, _dir) = stub_font_library();
        let plan = basic_plan("Hello", 1);
        let out = generate_from_plan(&plan, &engine, &fonts).unwrap();
        assert_eq!(out.boxes.len(), 5);
        assert!(out.boxes.iter().all(|b| b.line_index == 0));
    }

    #[test]
    fn boxes_are_rebased_into_canvas_frame() {
        let engine = StubEngine::default();
        let (fonts, _dir) = stub_font_library();
        let plan = basic_plan("Hi", 2);
        let out = generate_from_plan(&plan, &engine, &fonts).unwrap();
        for b in &out.boxes {
            assert!(b.x0 >= plan_placement_min(&out));
            assert!(b.x1 <= out.canvas_size.0 as f32);
            assert!(b.y1 <= out.canvas_size.1 as f32);
        }
    }

    fn plan_placement_min(out: &GenOutput) -> f32 {
        out.placement.0 as f32
    }

    #[test]
    fn auto_background_contrasts_with_black_text() {
        let engine = StubEngine::default();
        let (fonts, _dir) = stub_font_library();
        let plan = basic_plan("Hi", 3);
        let out = generate_from_plan(&plan, &engine, &fonts).unwrap();
        assert_eq!(out.background_color, Color::white());
        // Canvas corner carries the background fill.
        assert_eq!(out.surface.get(0, 0), Color::white());
    }

    #[test]
    fn effects_and_augmentations_land_in_manifest() {
        let engine = StubEngine::default();
        let (fonts, _dir) = stub_font_library();
        let mut plan = basic_plan("Hello", 4);
        plan.effects = vec![Effect::Noise { density: 0.02 }];
        plan.augmentations = vec![Augmentation::Rotation { angle: 4.0 }];
        let out = generate_from_plan(&plan, &engine, &fonts).unwrap();
        assert_eq!(out.applied_effects, vec!["noise".to_string()]);
        assert_eq!(out.augment_manifest.len(), 1);
        assert_eq!(out.augment_manifest[0].name, "rotation");
    }

    #[test]
    fn multiline_plan_assigns_line_indices() {
        let engine = StubEngine::default();
        let (fonts, _dir) = stub_font_library();
        let mut plan = basic_plan("Hello world testing", 5);
        plan.num_lines = 2;
        let out = generate_from_plan(&plan, &engine, &fonts).unwrap();
        assert_eq!(out.lines, vec!["Hello world", "testing"]);
        assert!(out.boxes.iter().any(|b| b.line_index == 0));
        assert!(out.boxes.iter().any(|b| b.line_index == 1));
    }

    #[test]
    fn rtl_plan_emits_rightmost_first() {
        let engine = StubEngine::default();
        let (fonts, _dir) = stub_font_library();
        let mut plan = basic_plan("שלום", 6);
        plan.direction = Direction::Rtl;
        let out = generate_from_plan(&plan, &engine, &fonts).unwrap();
        assert_eq!(out.boxes.len(), 4);
        let xs: Vec<f32> = out.boxes.iter().map(|b| b.center().0).collect();
        for pair in xs.windows(2) {
            assert!(pair[1] < pair[0], "boxes must run right to left: {xs:?}");
        }
        assert_eq!(out.boxes[0].ch, 'ש');
    }

    #[test]
    fn missing_background_is_reported_not_fatal() {
        let engine = StubEngine::default();
        let (fonts, _dir) = stub_font_library();
        let mut plan = basic_plan("Hi", 8);
        plan.background_path = Some("/no/such/background.png".into());
        let out = generate_from_plan(&plan, &engine, &fonts).unwrap();
        assert_eq!(out.background_issue, Some(BackgroundIssue::Unreadable));
        assert!(!out.background_used);
    }

    #[test]
    fn curve_parameters_flow_from_plan() {
        let engine = StubEngine::default();
        let (fonts, _dir) = stub_font_library();
        let mut plan = basic_plan("curved", 9);
        plan.curve = CurvePlan {
            kind: CurveKind::Arc,
            arc_intensity: 0.4,
            concave: true,
            sine_amplitude: 0.0,
            sine_frequency: 0.0,
            sine_phase: 0.0,
        };
        let out = generate_from_plan(&plan, &engine, &fonts).unwrap();
        assert_eq!(out.boxes.len(), 6);
    }

    #[test]
    fn gradient_colors_vary_across_glyphs() {
        let engine = StubEngine::default();
        let (fonts, _dir) = stub_font_library();
        let mut plan = basic_plan("gradient", 10);
        plan.color = ColorPlan {
            mode: ColorMode::Gradient,
            colors: vec![Color::rgb(0, 0, 0), Color::rgb(200, 0, 0)],
        };
        let out = generate_from_plan(&plan, &engine, &fonts).unwrap();
        // First and last glyph ink should differ in red channel.
        let first = &out.boxes[0];
        let last = &out.boxes[out.boxes.len() - 1];
        let sample_at = |b: &CharBox| {
            let (cx, cy) = b.center();
            out.surface.get(cx as u32, cy as u32)
        };
        let a = sample_at(first);
        let b = sample_at(last);
        assert!(b.r > a.r, "gradient not applied: {a:?} vs {b:?}");
    }
}
