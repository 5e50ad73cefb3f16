// this_file: crates/textsynth/src/record.rs

//! The label record: the plan plus everything execution resolved.
//!
//! The schema is additive-only. Every curve parameter key is present in
//! every record (zeros when the curve is off) so downstream consumers
//! can rely on a uniform shape, and the record carries enough to
//! reconstruct the plan and re-execute it.

use crate::executor::GenOutput;
use crate::plan::{BackgroundPlan, ColorPlan, CurvePlan, Plan};
use serde::{Deserialize, Serialize};
use textsynth_core::{
    CharBox, Color, ColorMode, CurveKind, Direction, LineBreakMode, PlacementStrategy,
    TextAlignment,
};
use textsynth_effects::{AppliedAugmentation, Augmentation, Effect};

/// Current label schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// One label record, written as JSON next to its image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub schema_version: u32,
    pub spec_name: String,
    pub image_index: u64,
    pub seed: u64,
    pub text: String,
    pub lines: Vec<String>,
    pub num_lines: u32,
    pub line_spacing: f64,
    pub line_break_mode: LineBreakMode,
    pub text_alignment: TextAlignment,
    pub direction: Direction,
    pub font_path: String,
    pub font_size: u32,
    pub curve_type: CurveKind,
    pub curve_arc_intensity: f64,
    pub curve_concave: bool,
    pub curve_sine_amplitude: f64,
    pub curve_sine_frequency: f64,
    pub curve_sine_phase: f64,
    pub glyph_overlap: f64,
    pub color_mode: ColorMode,
    pub colors: Vec<Color>,
    pub background_auto: bool,
    pub background_color: Color,
    pub background_path: Option<String>,
    pub background_used: bool,
    pub placement_strategy: PlacementStrategy,
    pub min_padding: u32,
    pub max_megapixels: f64,
    pub canvas_size: [u32; 2],
    pub text_placement: [u32; 2],
    pub effects: Vec<Effect>,
    pub augmentations: Vec<Augmentation>,
    pub applied_augmentations: Vec<AppliedAugmentation>,
    pub occluded_chars: Vec<char>,
    pub bboxes: Vec<CharBox>,
}

/// Assemble the record for one executed plan.
pub fn build_record(plan: &Plan, output: &GenOutput) -> GenerationRecord {
    GenerationRecord {
        schema_version: SCHEMA_VERSION,
        spec_name: plan.spec_name.clone(),
        image_index: plan.image_index,
        seed: plan.seed,
        text: plan.text.clone(),
        lines: output.lines.clone(),
        num_lines: output.lines.len() as u32,
        line_spacing: plan.line_spacing,
        line_break_mode: plan.line_break,
        text_alignment: plan.alignment,
        direction: plan.direction,
        font_path: plan.font_path.display().to_string(),
        font_size: plan.font_size,
        curve_type: plan.curve.kind,
        curve_arc_intensity: plan.curve.arc_intensity,
        curve_concave: plan.curve.concave,
        curve_sine_amplitude: plan.curve.sine_amplitude,
        curve_sine_frequency: plan.curve.sine_frequency,
        curve_sine_phase: plan.curve.sine_phase,
        glyph_overlap: plan.overlap,
        color_mode: plan.color.mode,
        colors: plan.color.colors.clone(),
        background_auto: matches!(plan.background, BackgroundPlan::Auto),
        background_color: output.background_color,
        background_path: plan
            .background_path
            .as_ref()
            .map(|p| p.display().to_string()),
        background_used: output.background_used,
        placement_strategy: plan.placement,
        min_padding: plan.min_padding,
        max_megapixels: plan.max_megapixels,
        canvas_size: [output.canvas_size.0, output.canvas_size.1],
        text_placement: [output.placement.0, output.placement.1],
        effects: plan.effects.clone(),
        augmentations: plan.augmentations.clone(),
        applied_augmentations: output.augment_manifest.clone(),
        occluded_chars: output.occluded.clone(),
        bboxes: output.boxes.clone(),
    }
}

/// Reconstruct the plan a record was generated from. Re-executing it
/// reproduces the image up to cross-process floating-point tolerance.
pub fn plan_from_record(record: &GenerationRecord) -> Plan {
    Plan {
        spec_name: record.spec_name.clone(),
        image_index: record.image_index,
        seed: record.seed,
        text: record.text.clone(),
        font_path: record.font_path.clone().into(),
        direction: record.direction,
        font_size: record.font_size,
        num_lines: record.num_lines,
        line_break: record.line_break_mode,
        line_spacing: record.line_spacing,
        alignment: record.text_alignment,
        curve: CurvePlan {
            kind: record.curve_type,
            arc_intensity: record.curve_arc_intensity,
            concave: record.curve_concave,
            sine_amplitude: record.curve_sine_amplitude,
            sine_frequency: record.curve_sine_frequency,
            sine_phase: record.curve_sine_phase,
        },
        overlap: record.glyph_overlap,
        color: ColorPlan {
            mode: record.color_mode,
            colors: record.colors.clone(),
        },
        background: if record.background_auto {
            BackgroundPlan::Auto
        } else {
            BackgroundPlan::Color(record.background_color)
        },
        background_path: record.background_path.clone().map(Into::into),
        effects: record.effects.clone(),
        augmentations: record.augmentations.clone(),
        min_padding: record.min_padding,
        max_megapixels: record.max_megapixels,
        placement: record.placement_strategy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::generate_from_plan;
    use crate::testutil::{basic_plan, stub_font_library, StubEngine};

    #[test]
    fn record_has_uniform_curve_keys_when_curve_is_off() {
        let engine = StubEngine::default();
        let (fonts, _path) = stub_font_library();
        let plan = basic_plan("Hi", 0);
        let out = generate_from_plan(&plan, &engine, &fonts).unwrap();
        let record = build_record(&plan, &out);

        let json = serde_json::to_value(&record).unwrap();
        for key in [
            "curve_type",
            "curve_arc_intensity",
            "curve_concave",
            "curve_sine_amplitude",
            "curve_sine_frequency",
            "curve_sine_phase",
        ] {
            assert!(json.get(key).is_some(), "missing curve key {key}");
        }
        assert_eq!(json["curve_arc_intensity"], 0.0);
        assert_eq!(json["curve_type"], "none");
    }

    #[test]
    fn every_bbox_has_line_index() {
        let engine = StubEngine::default();
        let (fonts, _path) = stub_font_library();
        let plan = basic_plan("Hello", 1);
        let out = generate_from_plan(&plan, &engine, &fonts).unwrap();
        let record = build_record(&plan, &out);
        let json = serde_json::to_value(&record).unwrap();
        for bbox in json["bboxes"].as_array().unwrap() {
            assert!(bbox.get("line_index").is_some());
            assert_eq!(bbox["line_index"], 0);
        }
    }

    #[test]
    fn plan_round_trips_through_record() {
        let engine = StubEngine::default();
        let (fonts, _path) = stub_font_library();
        let plan = basic_plan("Round trip", 2);
        let out = generate_from_plan(&plan, &engine, &fonts).unwrap();
        let record = build_record(&plan, &out);
        let rebuilt = plan_from_record(&record);
        assert_eq!(plan, rebuilt);

        // Re-executing the rebuilt plan reproduces the output exactly in
        // process.
        let again = generate_from_plan(&rebuilt, &engine, &fonts).unwrap();
        assert_eq!(again.surface, out.surface);
        assert_eq!(again.boxes, out.boxes);
    }

    #[test]
    fn record_survives_json_round_trip() {
        let engine = StubEngine::default();
        let (fonts, _path) = stub_font_library();
        let plan = basic_plan("Serialize me", 3);
        let out = generate_from_plan(&plan, &engine, &fonts).unwrap();
        let record = build_record(&plan, &out);
        let json = serde_json::to_string(&record).unwrap();
        let back: GenerationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
