// this_file: crates/textsynth-config/src/validate.rs

//! Static validation of a loaded configuration.
//!
//! Runs once before the scheduler starts and reports every problem at
//! once rather than stopping at the first. Any error aborts startup.

use crate::palette;
use crate::selector::resolve_patterns;
use crate::types::{
    BackgroundColor, BatchSpec, CurveConfig, GeneratorConfig, PaletteSpec, ParamRange,
};
use std::path::PathBuf;
use textsynth_core::{CurveKind, ResourceKind, Result, SynthError};

/// Base directories file selectors are anchored to. `None` resolves
/// patterns relative to the working directory.
#[derive(Debug, Clone, Default)]
pub struct ResourceRoots {
    pub fonts: Option<PathBuf>,
    pub corpora: Option<PathBuf>,
    pub backgrounds: Option<PathBuf>,
}

/// The batched error report produced by [`validate`].
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Collapse into a single fatal `Config` error when non-empty.
    pub fn into_result(self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(SynthError::Config(self.errors.join("; ")))
        }
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for e in &self.errors {
            writeln!(f, "  - {e}")?;
        }
        Ok(())
    }
}

const PROPORTION_TOLERANCE: f64 = 1e-3;

/// Check every static property of the configuration, resolving file
/// selectors against `roots` to prove each pool is non-empty.
pub fn validate(config: &GeneratorConfig, roots: &ResourceRoots) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.total_images == 0 {
        report.push("total_images must be at least 1");
    }
    if config.specs.is_empty() {
        report.push("at least one spec is required");
    }
    if config.runtime.chunk_size == 0 {
        report.push("runtime.chunk_size must be at least 1");
    }
    if config.runtime.io_batch_size == 0 {
        report.push("runtime.io_batch_size must be at least 1");
    }
    if config.runtime.max_megapixels <= 0.0 {
        report.push("runtime.max_megapixels must be positive");
    }

    let sum: f64 = config.specs.iter().map(|s| s.proportion).sum();
    if (sum - 1.0).abs() > PROPORTION_TOLERANCE {
        report.push(format!("spec proportions sum to {sum}, expected 1.0 +/- 0.001"));
    }

    let mut seen = std::collections::HashSet::new();
    for spec in &config.specs {
        if spec.name.is_empty() {
            report.push("spec with empty name");
        }
        if !seen.insert(spec.name.as_str()) {
            report.push(format!("duplicate spec name '{}'", spec.name));
        }
        validate_spec(spec, roots, &mut report);
    }

    report
}

fn validate_spec(spec: &BatchSpec, roots: &ResourceRoots, report: &mut ValidationReport) {
    let name = &spec.name;

    if spec.proportion < 0.0 || spec.proportion > 1.0 {
        report.push(format!("[{name}] proportion {} outside [0, 1]", spec.proportion));
    }

    for (field, range) in named_ranges(spec) {
        if !range.is_ordered() {
            report.push(format!(
                "[{name}] {field}: min {} > max {}",
                range.min, range.max
            ));
        }
    }
    if !spec.text_length.is_ordered() {
        report.push(format!("[{name}] text_length: min > max"));
    }
    if spec.text_length.min == 0 {
        report.push(format!("[{name}] text_length.min must be at least 1"));
    }
    if !spec.line_count.is_ordered() {
        report.push(format!("[{name}] line_count: min > max"));
    }
    if spec.line_count.min == 0 {
        report.push(format!("[{name}] line_count.min must be at least 1"));
    }
    if spec.font_size.min < 4.0 {
        report.push(format!("[{name}] font_size.min must be at least 4"));
    }
    if spec.effects.noise_density.max > 1.0 {
        report.push(format!("[{name}] effects.noise_density.max must not exceed 1.0"));
    }
    if spec.glyph_overlap.max > 1.0 {
        report.push(format!("[{name}] glyph_overlap.max must not exceed 1.0"));
    }
    if spec.effects.brightness.min < 0.0 || spec.effects.contrast.min < 0.0 {
        report.push(format!("[{name}] brightness/contrast must be non-negative"));
    }

    validate_curve(name, &spec.curve, report);
    validate_color(spec, report);

    if !spec.alignment.valid_for(spec.direction) {
        report.push(format!(
            "[{name}] alignment '{}' is invalid for direction '{}'",
            spec.alignment.as_str(),
            spec.direction.as_str()
        ));
    }

    check_pool(name, "fonts", &spec.fonts, roots.fonts.as_deref(), ResourceKind::Font, true, report);
    check_pool(
        name,
        "corpus",
        &spec.corpus,
        roots.corpora.as_deref(),
        ResourceKind::Corpus,
        true,
        report,
    );
    check_pool(
        name,
        "backgrounds",
        &spec.backgrounds,
        roots.backgrounds.as_deref(),
        ResourceKind::Background,
        false,
        report,
    );
}

fn validate_curve(name: &str, curve: &CurveConfig, report: &mut ValidationReport) {
    match curve.kind {
        CurveKind::None => {
            if !curve.arc_intensity.is_zero()
                || !curve.sine_amplitude.is_zero()
                || !curve.sine_frequency.is_zero()
                || !curve.sine_phase.is_zero()
            {
                report.push(format!(
                    "[{name}] curve.kind is 'none' but arc/sine ranges are non-zero"
                ));
            }
        }
        CurveKind::Arc => {
            if curve.arc_intensity.is_zero() {
                report.push(format!("[{name}] curve.kind is 'arc' but arc_intensity is zero"));
            }
            if curve.arc_intensity.max > 1.0 || curve.arc_intensity.min < 0.0 {
                report.push(format!("[{name}] curve.arc_intensity must lie in (0, 1]"));
            }
        }
        CurveKind::Sine => {
            if curve.sine_amplitude.is_zero() {
                report.push(format!("[{name}] curve.kind is 'sine' but sine_amplitude is zero"));
            }
        }
    }
    if !(0.0..=1.0).contains(&curve.concave_probability) {
        report.push(format!("[{name}] curve.concave_probability outside [0, 1]"));
    }
}

fn validate_color(spec: &BatchSpec, report: &mut ValidationReport) {
    let name = &spec.name;
    let color = &spec.color;

    let has_range = color.color_min.is_some() || color.color_max.is_some();
    match &color.palette {
        Some(PaletteSpec::Custom(list)) => {
            if list.is_empty() {
                report.push(format!("[{name}] custom palette is empty"));
            }
            if has_range {
                report.push(format!(
                    "[{name}] custom palette and color_min/color_max are mutually exclusive"
                ));
            }
        }
        Some(PaletteSpec::Named(palette_name)) => {
            if palette::lookup(palette_name).is_none() {
                report.push(format!(
                    "[{name}] unknown palette '{palette_name}' (known: {})",
                    palette::names().join(", ")
                ));
            }
        }
        None => {}
    }

    if let (Some(lo), Some(hi)) = (color.color_min, color.color_max) {
        if lo.iter().zip(hi.iter()).any(|(a, b)| a > b) {
            report.push(format!("[{name}] color_min exceeds color_max"));
        }
    }

    if let BackgroundColor::Named(bg) = &spec.background_color {
        if bg != "auto" {
            report.push(format!(
                "[{name}] background_color must be 'auto' or an RGB triple, got '{bg}'"
            ));
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn check_pool(
    name: &str,
    field: &str,
    patterns: &[crate::types::WeightedPattern],
    base: Option<&std::path::Path>,
    kind: ResourceKind,
    required: bool,
    report: &mut ValidationReport,
) {
    if patterns.is_empty() {
        if required {
            report.push(format!("[{name}] {field} selector list is empty"));
        }
        return;
    }
    for p in patterns {
        if p.weight() <= 0.0 {
            report.push(format!(
                "[{name}] {field} pattern '{}' has non-positive weight",
                p.pattern()
            ));
        }
    }
    match resolve_patterns(base, patterns, kind) {
        Ok(files) if files.is_empty() => {
            report.push(format!("[{name}] {field} selectors match no files"));
        }
        Ok(_) => {}
        Err(e) => report.push(format!("[{name}] {field}: {e}")),
    }
}

fn named_ranges(spec: &BatchSpec) -> Vec<(&'static str, ParamRange)> {
    let e = &spec.effects;
    let a = &spec.augment;
    vec![
        ("font_size", spec.font_size),
        ("line_spacing", spec.line_spacing),
        ("glyph_overlap", spec.glyph_overlap),
        ("curve.arc_intensity", spec.curve.arc_intensity),
        ("curve.sine_amplitude", spec.curve.sine_amplitude),
        ("curve.sine_frequency", spec.curve.sine_frequency),
        ("curve.sine_phase", spec.curve.sine_phase),
        ("effects.ink_bleed", e.ink_bleed),
        ("effects.shadow_offset", e.shadow_offset),
        ("effects.shadow_blur", e.shadow_blur),
        ("effects.relief_depth", e.relief_depth),
        ("effects.noise_density", e.noise_density),
        ("effects.blur_radius", e.blur_radius),
        ("effects.brightness", e.brightness),
        ("effects.contrast", e.contrast),
        ("effects.morph_kernel", e.morph_kernel),
        ("effects.cutout_size", e.cutout_size),
        ("augment.rotation", a.rotation),
        ("augment.perspective", a.perspective),
        ("augment.elastic_alpha", a.elastic_alpha),
        ("augment.elastic_sigma", a.elastic_sigma),
        ("augment.grid_steps", a.grid_steps),
        ("augment.grid_limit", a.grid_limit),
        ("augment.optical_limit", a.optical_limit),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CountRange, WeightedPattern};
    use std::fs;
    use textsynth_core::{Direction, TextAlignment};

    fn scratch_spec(dir: &std::path::Path) -> BatchSpec {
        fs::write(dir.join("words.txt"), "hello world").unwrap();
        fs::write(dir.join("font.ttf"), b"\0").unwrap();
        serde_yaml::from_str(&format!(
            r#"
name: base
proportion: 1.0
corpus: ["{0}/words.txt"]
fonts: ["{0}/font.ttf"]
text_length: {{min: 1, max: 20}}
"#,
            dir.display()
        ))
        .unwrap()
    }

    fn config_with(spec: BatchSpec) -> GeneratorConfig {
        GeneratorConfig {
            total_images: 10,
            seed: Some(1),
            runtime: Default::default(),
            specs: vec![spec],
        }
    }

    #[test]
    fn valid_config_passes() {
        let dir = tempfile::tempdir().unwrap();
        let report = validate(&config_with(scratch_spec(dir.path())), &ResourceRoots::default());
        assert!(report.is_ok(), "unexpected errors: {report}");
    }

    #[test]
    fn proportions_must_sum_to_one() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = scratch_spec(dir.path());
        spec.proportion = 0.7;
        let report = validate(&config_with(spec), &ResourceRoots::default());
        assert!(report.errors.iter().any(|e| e.contains("proportions")));
    }

    #[test]
    fn unordered_range_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = scratch_spec(dir.path());
        spec.font_size = ParamRange::uniform(48.0, 24.0);
        let report = validate(&config_with(spec), &ResourceRoots::default());
        assert!(report.errors.iter().any(|e| e.contains("font_size")));
    }

    #[test]
    fn curve_none_requires_zero_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = scratch_spec(dir.path());
        spec.curve.arc_intensity = ParamRange::uniform(0.1, 0.5);
        let report = validate(&config_with(spec), &ResourceRoots::default());
        assert!(report.errors.iter().any(|e| e.contains("curve.kind")));
    }

    #[test]
    fn vertical_alignment_needs_vertical_direction() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = scratch_spec(dir.path());
        spec.direction = Direction::Ltr;
        spec.alignment = TextAlignment::Top;
        let report = validate(&config_with(spec), &ResourceRoots::default());
        assert!(report.errors.iter().any(|e| e.contains("alignment")));
    }

    #[test]
    fn palette_and_rgb_ranges_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = scratch_spec(dir.path());
        spec.color.palette = Some(PaletteSpec::Custom(vec![[0, 0, 0]]));
        spec.color.color_min = Some([0, 0, 0]);
        let report = validate(&config_with(spec), &ResourceRoots::default());
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("mutually exclusive")));
    }

    #[test]
    fn unresolved_font_glob_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = scratch_spec(dir.path());
        spec.fonts = vec![WeightedPattern::Plain(format!(
            "{}/missing-*.ttf",
            dir.path().display()
        ))];
        let report = validate(&config_with(spec), &ResourceRoots::default());
        assert!(report.errors.iter().any(|e| e.contains("match no files")));
    }

    #[test]
    fn empty_line_count_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = scratch_spec(dir.path());
        spec.line_count = CountRange { min: 0, max: 2 };
        let report = validate(&config_with(spec), &ResourceRoots::default());
        assert!(report.errors.iter().any(|e| e.contains("line_count.min")));
    }
}
