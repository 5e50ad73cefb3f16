// this_file: crates/textsynth/tests/pipeline.rs

//! End-to-end scheduler scenarios: parallel determinism, exact quota
//! conservation, resume, and font failure recovery.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use textsynth::{Checkpoint, RunOptions, RunSummary, Scheduler, CHECKPOINT_FILE};
use textsynth_config::{parse_config, GeneratorConfig, ResourceRoots};
use textsynth_core::{Result, SynthError};
use textsynth_fontdb::{FontEngine, FontHandle, FontMetrics, RasterGlyph};

/// Rectangle-glyph engine. Fonts whose path contains "bad" cover
/// nothing, mimicking a corrupt font among the candidates.
struct RectEngine;

impl FontEngine for RectEngine {
    fn metrics(&self, _font: &FontHandle, _size: f32) -> Result<FontMetrics> {
        Ok(FontMetrics {
            ascent: 24.0,
            descent: 8.0,
        })
    }

    fn glyph(&self, font: &FontHandle, _size: f32, ch: char) -> Result<std::sync::Arc<RasterGlyph>> {
        if font.key.contains("bad") {
            return Err(SynthError::GlyphMiss {
                font: font.key.clone(),
                ch,
            });
        }
        if ch.is_whitespace() {
            return Ok(std::sync::Arc::new(RasterGlyph {
                mask: Vec::new(),
                width: 0,
                height: 0,
                bearing_x: 0,
                bearing_y: 0,
                advance: 10.0,
            }));
        }
        Ok(std::sync::Arc::new(RasterGlyph {
            mask: vec![255; 16 * 20],
            width: 16,
            height: 20,
            bearing_x: 1,
            bearing_y: 20,
            advance: 18.0,
        }))
    }

    fn has_glyph(&self, font: &FontHandle, _ch: char) -> bool {
        !font.key.contains("bad")
    }
}

struct Fixture {
    dir: tempfile::TempDir,
    config: GeneratorConfig,
}

impl Fixture {
    fn out_dir(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn fixture_with(specs_yaml: impl Fn(&Path) -> String, total: u64) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("words.txt"),
        "the quick brown fox jumps over the lazy dog again and again ".repeat(20),
    )
    .unwrap();
    std::fs::write(dir.path().join("font_a.ttf"), b"stub").unwrap();
    std::fs::write(dir.path().join("font_b.ttf"), b"stub").unwrap();

    let yaml = format!(
        "total_images: {total}\nseed: 42\nruntime:\n  chunk_size: 4\n  io_batch_size: 2\nspecs:\n{}",
        specs_yaml(dir.path())
    );
    let config = parse_config(&yaml, false).unwrap();
    Fixture { dir, config }
}

fn one_spec(base: &Path) -> String {
    format!(
        "  - name: latin\n    proportion: 1.0\n    corpus: [\"{0}/words.txt\"]\n    fonts: [\"{0}/font_*.ttf\"]\n    text_length: {{min: 4, max: 12}}\n",
        base.display()
    )
}

fn run(fixture: &Fixture, out: &Path, workers: usize) -> RunSummary {
    let mut config = fixture.config.clone();
    config.runtime.generation_workers = workers;
    let mut scheduler = Scheduler::new(
        config,
        &ResourceRoots::default(),
        Arc::new(RectEngine),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();
    scheduler
        .run(&RunOptions {
            output_dir: out.to_path_buf(),
            resume: false,
        })
        .unwrap()
}

fn read_outputs(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut out = BTreeMap::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with("image_") {
            out.insert(name, std::fs::read(entry.path()).unwrap());
        }
    }
    out
}

#[test]
fn outputs_are_invariant_under_worker_count() {
    let fixture = fixture_with(one_spec, 8);

    let dir_serial = fixture.out_dir("serial");
    let dir_parallel = fixture.out_dir("parallel");
    let a = run(&fixture, &dir_serial, 1);
    let b = run(&fixture, &dir_parallel, 8);
    assert_eq!(a.generated, 8);
    assert_eq!(b.generated, 8);

    let serial = read_outputs(&dir_serial);
    let parallel = read_outputs(&dir_parallel);
    assert_eq!(serial.len(), 16); // 8 images + 8 labels
    assert_eq!(serial, parallel, "outputs differ between worker counts");

    let cp_a = Checkpoint::load(&dir_serial.join(CHECKPOINT_FILE))
        .unwrap()
        .unwrap();
    let cp_b = Checkpoint::load(&dir_parallel.join(CHECKPOINT_FILE))
        .unwrap()
        .unwrap();
    assert_eq!(cp_a.completed, cp_b.completed);
}

#[test]
fn quotas_are_conserved_exactly() {
    let two_specs = |base: &Path| {
        format!(
            "  - name: alpha\n    proportion: 0.6\n    corpus: [\"{0}/words.txt\"]\n    fonts: [\"{0}/font_a.ttf\"]\n    text_length: {{min: 4, max: 12}}\n  - name: beta\n    proportion: 0.4\n    corpus: [\"{0}/words.txt\"]\n    fonts: [\"{0}/font_b.ttf\"]\n    text_length: {{min: 4, max: 12}}\n",
            base.display()
        )
    };
    let fixture = fixture_with(two_specs, 10);
    let out = fixture.out_dir("quota");
    let summary = run(&fixture, &out, 2);

    assert_eq!(summary.generated, 10);
    assert!(summary.skipped.is_empty());
    let counts: BTreeMap<&str, u64> = summary
        .per_spec
        .iter()
        .map(|(name, n)| (name.as_str(), *n))
        .collect();
    assert_eq!(counts["alpha"], 6);
    assert_eq!(counts["beta"], 4);
}

#[test]
fn resume_produces_zero_new_outputs() {
    let fixture = fixture_with(one_spec, 6);
    let out = fixture.out_dir("resume");
    let first = run(&fixture, &out, 2);
    assert_eq!(first.generated, 6);
    let before = read_outputs(&out);

    let mut config = fixture.config.clone();
    config.runtime.generation_workers = 2;
    let mut scheduler = Scheduler::new(
        config,
        &ResourceRoots::default(),
        Arc::new(RectEngine),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();
    let second = scheduler
        .run(&RunOptions {
            output_dir: out.clone(),
            resume: true,
        })
        .unwrap();

    assert_eq!(second.generated, 0, "resume must skip completed indices");
    assert_eq!(read_outputs(&out), before);
}

#[test]
fn bad_font_is_quarantined_and_batch_still_completes() {
    let fixture = fixture_with(one_spec, 24);
    // Drop a known-bad font into the candidate pool.
    std::fs::write(fixture.dir.path().join("font_bad.ttf"), b"junk").unwrap();
    // Re-parse so the selector sees all three fonts.
    let yaml = format!(
        "total_images: 24\nseed: 42\nruntime:\n  chunk_size: 4\nspecs:\n{}",
        one_spec(fixture.dir.path())
    );
    let config = parse_config(&yaml, false).unwrap();

    let mut scheduler = Scheduler::new(
        config,
        &ResourceRoots::default(),
        Arc::new(RectEngine),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();
    let out = fixture.out_dir("health");
    let summary = scheduler
        .run(&RunOptions {
            output_dir: out,
            resume: false,
        })
        .unwrap();

    // The coverage precheck rejects the bad font; the batch reaches its
    // full target anyway.
    assert_eq!(summary.generated, 24);
    let bad_id = fixture
        .dir
        .path()
        .join("font_bad.ttf")
        .display()
        .to_string();
    assert!(
        scheduler.font_health().score(&bad_id) < 100.0,
        "bad font was never penalized"
    );
}

#[test]
fn labels_sit_next_to_images_with_matching_indices() {
    let fixture = fixture_with(one_spec, 5);
    let out = fixture.out_dir("layout");
    run(&fixture, &out, 1);

    for i in 0..5 {
        let png = out.join(format!("image_{i:05}.png"));
        let json = out.join(format!("image_{i:05}.json"));
        assert!(png.exists(), "missing {}", png.display());
        assert!(json.exists(), "missing {}", json.display());

        let record: textsynth::GenerationRecord =
            serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(record.image_index, i);
        assert!(!record.bboxes.is_empty());
        for b in &record.bboxes {
            assert!(b.x1 > b.x0 && b.y1 > b.y0);
        }
    }
}
