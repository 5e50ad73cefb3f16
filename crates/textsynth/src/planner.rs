// this_file: crates/textsynth/src/planner.rs

//! Sampling a task into a fully concrete Plan.
//!
//! The planner draws every parameter from the task's derived seed and
//! never touches a surface: planning the same task twice produces the
//! same plan on any machine, worker count or schedule.

use crate::plan::{BackgroundPlan, ColorPlan, CurvePlan, Plan, Task};
use rand::Rng;
use rand_pcg::Pcg64;
use textsynth_config::{palette, BatchSpec, ColorConfig, PaletteSpec, ParamRange, RuntimeConfig};
use textsynth_core::rng::{derive_seed, stream_rng};
use textsynth_core::sampler;
use textsynth_core::{Color, ColorMode, CurveKind};
use textsynth_effects::{Augmentation, Effect, MorphOp, ReliefMode};

/// Build the plan for one task under the given master seed.
pub fn plan_task(
    spec: &BatchSpec,
    runtime: &RuntimeConfig,
    task: &Task,
    master_seed: u64,
) -> Plan {
    let seed = derive_seed(master_seed, task.image_index, &task.spec_name);
    let mut rng = stream_rng(seed, "plan");

    let font_size = sample_int(&mut rng, spec.font_size).max(4) as u32;
    let num_lines = if spec.line_count.min == spec.line_count.max {
        spec.line_count.min
    } else {
        rng.gen_range(spec.line_count.min..=spec.line_count.max)
    };
    let line_spacing = sample(&mut rng, spec.line_spacing).max(0.5);
    let overlap = sample(&mut rng, spec.glyph_overlap).clamp(0.0, 1.0);

    let curve = sample_curve(&mut rng, spec);
    let glyph_budget = task.text.chars().count().max(1);
    let color = sample_colors(&mut rng, &spec.color, glyph_budget);
    let background = match &spec.background_color {
        bg if bg.is_auto() => BackgroundPlan::Auto,
        textsynth_config::BackgroundColor::Rgb([r, g, b]) => {
            BackgroundPlan::Color(Color::rgb(*r, *g, *b))
        }
        _ => BackgroundPlan::Auto,
    };

    let effects = sample_effects(&mut rng, spec);
    let augmentations = sample_augmentations(&mut rng, spec);

    Plan {
        spec_name: task.spec_name.clone(),
        image_index: task.image_index,
        seed,
        text: task.text.clone(),
        font_path: task.font_path.clone(),
        direction: spec.direction,
        font_size,
        num_lines,
        line_break: spec.line_break,
        line_spacing,
        alignment: spec.alignment,
        curve,
        overlap,
        color,
        background,
        background_path: task.background_path.clone(),
        effects,
        augmentations,
        min_padding: runtime.min_padding,
        max_megapixels: runtime.max_megapixels,
        placement: runtime.placement,
    }
}

/// Vectorized planning: a pure function of `(specs, runtime, tasks,
/// master_seed)`.
pub fn plan_batch(
    specs: &[BatchSpec],
    runtime: &RuntimeConfig,
    tasks: &[Task],
    master_seed: u64,
) -> Vec<Plan> {
    tasks
        .iter()
        .filter_map(|task| {
            specs
                .get(task.spec_index)
                .map(|spec| plan_task(spec, runtime, task, master_seed))
        })
        .collect()
}

fn sample(rng: &mut Pcg64, range: ParamRange) -> f64 {
    sampler::sample(rng, range.min, range.max, range.distribution)
}

fn sample_int(rng: &mut Pcg64, range: ParamRange) -> i64 {
    sampler::sample_int(
        rng,
        range.min.round() as i64,
        range.max.round() as i64,
        range.distribution,
    )
}

fn sample_curve(rng: &mut Pcg64, spec: &BatchSpec) -> CurvePlan {
    let c = &spec.curve;
    match c.kind {
        CurveKind::None => CurvePlan::none(),
        CurveKind::Arc => CurvePlan {
            kind: CurveKind::Arc,
            arc_intensity: sample(rng, c.arc_intensity).clamp(0.0, 1.0),
            concave: rng.gen_bool(c.concave_probability.clamp(0.0, 1.0)),
            sine_amplitude: 0.0,
            sine_frequency: 0.0,
            sine_phase: 0.0,
        },
        CurveKind::Sine => CurvePlan {
            kind: CurveKind::Sine,
            arc_intensity: 0.0,
            concave: rng.gen_bool(c.concave_probability.clamp(0.0, 1.0)),
            sine_amplitude: sample(rng, c.sine_amplitude).max(0.0),
            sine_frequency: sample(rng, c.sine_frequency).max(0.0),
            sine_phase: sample(rng, c.sine_phase),
        },
    }
}

fn resolve_palette(color: &ColorConfig) -> Option<Vec<Color>> {
    match &color.palette {
        Some(PaletteSpec::Named(name)) => palette::lookup(name).map(|list| {
            list.iter()
                .map(|&[r, g, b]| Color::rgb(r, g, b))
                .collect()
        }),
        Some(PaletteSpec::Custom(list)) => Some(
            list.iter()
                .map(|&[r, g, b]| Color::rgb(r, g, b))
                .collect(),
        ),
        None => None,
    }
}

fn sample_rgb_in(rng: &mut Pcg64, lo: [u8; 3], hi: [u8; 3]) -> Color {
    let channel = |rng: &mut Pcg64, a: u8, b: u8| {
        if a >= b {
            a
        } else {
            rng.gen_range(a..=b)
        }
    };
    Color::rgb(
        channel(rng, lo[0], hi[0]),
        channel(rng, lo[1], hi[1]),
        channel(rng, lo[2], hi[2]),
    )
}

fn sample_colors(rng: &mut Pcg64, config: &ColorConfig, glyph_budget: usize) -> ColorPlan {
    let palette = resolve_palette(config);
    let lo = config.color_min.unwrap_or([0, 0, 0]);
    let hi = config.color_max.unwrap_or([64, 64, 64]);

    let pick = |rng: &mut Pcg64, palette: &Option<Vec<Color>>| match palette {
        Some(list) if !list.is_empty() => list[rng.gen_range(0..list.len())],
        _ => sample_rgb_in(rng, lo, hi),
    };

    let colors = match config.mode {
        ColorMode::Uniform => vec![pick(rng, &palette)],
        ColorMode::Gradient => vec![pick(rng, &palette), pick(rng, &palette)],
        ColorMode::PerGlyph => (0..glyph_budget).map(|_| pick(rng, &palette)).collect(),
        ColorMode::Random => (0..glyph_budget)
            .map(|_| Color::rgb(rng.gen(), rng.gen(), rng.gen()))
            .collect(),
    };
    ColorPlan {
        mode: config.mode,
        colors,
    }
}

/// Assemble the effect chain in its fixed order, dropping effects whose
/// sampled parameter is inert.
fn sample_effects(rng: &mut Pcg64, spec: &BatchSpec) -> Vec<Effect> {
    let e = &spec.effects;
    let mut chain = Vec::new();

    let ink_bleed = sample(rng, e.ink_bleed);
    if ink_bleed > 0.05 {
        chain.push(Effect::InkBleed { radius: ink_bleed });
    }

    let shadow_offset = sample(rng, e.shadow_offset);
    if shadow_offset > 0.5 {
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        let blur = sample(rng, e.shadow_blur).max(0.0);
        chain.push(Effect::Shadow {
            dx: shadow_offset * angle.cos(),
            dy: shadow_offset * angle.sin(),
            blur,
            color: Color::rgba(0, 0, 0, 180),
        });
    }

    let depth = sample(rng, e.relief_depth);
    if depth > 0.05 {
        let mode = match rng.gen_range(0..3u8) {
            0 => ReliefMode::Raised,
            1 => ReliefMode::Embossed,
            _ => ReliefMode::Engraved,
        };
        chain.push(Effect::Relief {
            mode,
            depth,
            azimuth: rng.gen_range(0.0..std::f64::consts::TAU),
            elevation: rng.gen_range(std::f64::consts::FRAC_PI_6..std::f64::consts::FRAC_PI_3),
        });
    }

    let density = sample(rng, e.noise_density);
    if density > 0.0 {
        chain.push(Effect::Noise { density });
    }

    let blur = sample(rng, e.blur_radius);
    if blur > 0.05 {
        chain.push(Effect::Blur { radius: blur });
    }

    if !e.brightness.is_zero() {
        let factor = sample(rng, e.brightness);
        if (factor - 1.0).abs() > 1e-3 {
            chain.push(Effect::Brightness { factor });
        }
    }
    if !e.contrast.is_zero() {
        let factor = sample(rng, e.contrast);
        if (factor - 1.0).abs() > 1e-3 {
            chain.push(Effect::Contrast { factor });
        }
    }

    let kernel = sample_int(rng, e.morph_kernel);
    if kernel >= 3 {
        let op = if rng.gen_bool(0.5) {
            MorphOp::Erode
        } else {
            MorphOp::Dilate
        };
        chain.push(Effect::Morphology {
            op,
            kernel: kernel as u32,
        });
    }

    let cutout = sample_int(rng, e.cutout_size);
    if cutout >= 2 {
        chain.push(Effect::Cutout {
            width: cutout as u32,
            height: cutout as u32,
        });
    }

    chain
}

/// Assemble the augmentation chain: rotation, perspective, elastic,
/// grid, optical.
fn sample_augmentations(rng: &mut Pcg64, spec: &BatchSpec) -> Vec<Augmentation> {
    let a = &spec.augment;
    let mut chain = Vec::new();

    if !a.rotation.is_zero() {
        let angle = sample(rng, a.rotation);
        if angle.abs() > 0.05 {
            chain.push(Augmentation::Rotation { angle });
        }
    }

    let magnitude = sample(rng, a.perspective);
    if magnitude > 1e-3 {
        chain.push(Augmentation::Perspective { magnitude });
    }

    let alpha = sample(rng, a.elastic_alpha);
    if alpha > 0.05 {
        let sigma = sample(rng, a.elastic_sigma).max(0.5);
        chain.push(Augmentation::Elastic { alpha, sigma });
    }

    let steps = sample_int(rng, a.grid_steps);
    let limit = sample(rng, a.grid_limit);
    if steps >= 2 && limit > 0.05 {
        chain.push(Augmentation::Grid {
            steps: steps as u32,
            limit,
        });
    }

    let optical = sample(rng, a.optical_limit);
    if optical.abs() > 1e-3 {
        chain.push(Augmentation::Optical { limit: optical });
    }

    chain
}
