// this_file: crates/textsynth/src/scheduler.rs

//! The batch scheduler: quotas, task stream, streaming parallel
//! execution, health updates, checkpointing and the run summary.
//!
//! Task indices are assigned serially and every per-task random draw is
//! derived from the image index, so outputs are invariant under worker
//! count and completion order. Workers plan and execute; a separate I/O
//! pool drains encoded results in index order.

use crate::checkpoint::{Checkpoint, CHECKPOINT_FILE};
use crate::executor::{generate_from_plan, BackgroundIssue};
use crate::plan::Task;
use crate::planner::plan_task;
use crate::record::build_record;
use crossbeam_channel::{bounded, Receiver};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use textsynth_config::{config_hash, resolve_patterns, resolve_required, GeneratorConfig, ResourceRoots};
use textsynth_core::rng::{derive_seed, stream_rng};
use textsynth_core::{FailureKind, ResourceKind, Result, SynthError};
use textsynth_corpus::{CorpusReader, CorpusSource};
use textsynth_fontdb::{FontEngine, FontLibrary, HealthTracker, WeightedFont};

const FONT_HEALTH_FILE: &str = "font_health.state";
const BACKGROUND_HEALTH_FILE: &str = "background_scores.state";
const IO_WRITE_ATTEMPTS: usize = 3;

/// One skipped index and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipRecord {
    pub image_index: u64,
    pub spec_name: String,
    pub reason: String,
}

/// End-of-run accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub requested: u64,
    pub generated: u64,
    pub skipped: Vec<SkipRecord>,
    pub per_spec: Vec<(String, u64)>,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Process exit code per the CLI contract: 0 all targets met, 3
    /// partial generation, 4 cancelled.
    pub fn exit_code(&self) -> i32 {
        if self.cancelled {
            4
        } else if !self.skipped.is_empty() {
            3
        } else {
            0
        }
    }
}

/// Integer quotas by largest remainder: they sum to `total` exactly.
pub fn allocate_quotas(total: u64, proportions: &[f64]) -> Vec<u64> {
    if proportions.is_empty() {
        return Vec::new();
    }
    let raw: Vec<f64> = proportions.iter().map(|p| p * total as f64).collect();
    let mut quotas: Vec<u64> = raw.iter().map(|r| r.floor() as u64).collect();
    let assigned: u64 = quotas.iter().sum();
    let mut leftover = total.saturating_sub(assigned);

    // Hand the remainder out by descending fractional part, earlier
    // specs winning ties.
    let mut order: Vec<usize> = (0..proportions.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = raw[a] - raw[a].floor();
        let fb = raw[b] - raw[b].floor();
        fb.partial_cmp(&fa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    for i in order {
        if leftover == 0 {
            break;
        }
        quotas[i] += 1;
        leftover -= 1;
    }
    quotas
}

struct SpecResources {
    fonts: Vec<(String, f64)>,
    backgrounds: Vec<(String, f64)>,
    reader: CorpusReader,
}

enum TaskOutcome {
    Done {
        index: u64,
        spec_index: usize,
        png: Vec<u8>,
        label: Vec<u8>,
    },
    Skip(SkipRecord),
    Fatal {
        error: String,
    },
}

/// Options that are not part of the configuration document.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    pub resume: bool,
}

/// The generation scheduler. Owns the resource pools and both health
/// trackers; shared read-only with the workers during each chunk.
pub struct Scheduler {
    config: GeneratorConfig,
    engine: Arc<dyn FontEngine>,
    fonts: Arc<FontLibrary>,
    font_health: Arc<HealthTracker>,
    background_health: Arc<HealthTracker>,
    cancel: Arc<AtomicBool>,
    resources: Vec<SpecResources>,
}

impl Scheduler {
    /// Resolve every spec's resource pools and build the shared font
    /// library. The configuration must already have passed validation.
    pub fn new(
        config: GeneratorConfig,
        roots: &ResourceRoots,
        engine: Arc<dyn FontEngine>,
        cancel: Arc<AtomicBool>,
    ) -> Result<Self> {
        let mut resources = Vec::with_capacity(config.specs.len());
        let mut library_entries: Vec<WeightedFont> = Vec::new();

        for spec in &config.specs {
            let fonts = resolve_required(roots.fonts.as_deref(), &spec.fonts, ResourceKind::Font)?;
            let corpus =
                resolve_required(roots.corpora.as_deref(), &spec.corpus, ResourceKind::Corpus)?;
            let backgrounds = resolve_patterns(
                roots.backgrounds.as_deref(),
                &spec.backgrounds,
                ResourceKind::Background,
            )?;

            for f in &fonts {
                if !library_entries.iter().any(|e| e.path == f.path) {
                    library_entries.push(WeightedFont {
                        path: f.path.clone(),
                        weight: f.weight,
                    });
                }
            }

            resources.push(SpecResources {
                fonts: fonts
                    .iter()
                    .map(|f| (f.path.display().to_string(), f.weight))
                    .collect(),
                backgrounds: backgrounds
                    .iter()
                    .map(|b| (b.path.display().to_string(), b.weight))
                    .collect(),
                reader: CorpusReader::new(
                    &corpus
                        .iter()
                        .map(|c| CorpusSource {
                            path: c.path.clone(),
                            weight: c.weight,
                        })
                        .collect::<Vec<_>>(),
                ),
            });
        }

        Ok(Self {
            config,
            engine,
            fonts: Arc::new(FontLibrary::new(library_entries)),
            font_health: Arc::new(HealthTracker::new(ResourceKind::Font)),
            background_health: Arc::new(HealthTracker::new(ResourceKind::Background)),
            cancel,
            resources,
        })
    }

    pub fn font_health(&self) -> &HealthTracker {
        &self.font_health
    }

    pub fn background_health(&self) -> &HealthTracker {
        &self.background_health
    }

    /// Build the full interleaved task list: one entry per image index,
    /// round-robin across non-exhausted specs.
    fn build_tasks(&mut self, skips: &mut Vec<SkipRecord>) -> Vec<Task> {
        let master_seed = self.config.master_seed();
        let proportions: Vec<f64> = self.config.specs.iter().map(|s| s.proportion).collect();
        let mut remaining = allocate_quotas(self.config.total_images, &proportions);
        let retry_budget = self.config.runtime.retry_budget;

        let mut tasks = Vec::with_capacity(self.config.total_images as usize);
        let mut rr = 0usize;
        for index in 0..self.config.total_images {
            // Next non-exhausted spec in rotation.
            let Some(offset) = (0..remaining.len())
                .find(|k| remaining[(rr + k) % remaining.len()] > 0)
            else {
                break;
            };
            let spec_index = (rr + offset) % remaining.len();
            remaining[spec_index] -= 1;
            rr = (spec_index + 1) % remaining.len();

            let spec = &self.config.specs[spec_index];
            let spec_name = spec.name.clone();
            let mut rng = stream_rng(derive_seed(master_seed, index, &spec_name), "task");

            let text = match self.resources[spec_index].reader.extract_segment(
                &mut rng,
                spec.text_length.min as usize,
                spec.text_length.max as usize,
            ) {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("index {index}: corpus produced no text ({e}); skipping");
                    skips.push(SkipRecord {
                        image_index: index,
                        spec_name,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            // Font selection with glyph-coverage precheck: reject fonts
            // that cannot cover the text before any rendering happens.
            let mut tried: HashSet<String> = HashSet::new();
            let mut chosen: Option<String> = None;
            for _ in 0..=retry_budget {
                let candidates: Vec<(&str, f64)> = self.resources[spec_index]
                    .fonts
                    .iter()
                    .filter(|(id, _)| !tried.contains(id))
                    .map(|(id, w)| (id.as_str(), *w))
                    .collect();
                let Ok(id) = self.font_health.select(&mut rng, &candidates) else {
                    break;
                };
                if self.font_covers(&id, &text) {
                    chosen = Some(id);
                    break;
                }
                log::debug!("font {id} lacks coverage for index {index}; penalizing");
                self.font_health.record_failure(&id, FailureKind::GlyphMiss);
                tried.insert(id);
            }
            let Some(font_id) = chosen else {
                skips.push(SkipRecord {
                    image_index: index,
                    spec_name,
                    reason: "no healthy font covers the text".to_string(),
                });
                continue;
            };

            let background_path = if self.resources[spec_index].backgrounds.is_empty() {
                None
            } else {
                let candidates: Vec<(&str, f64)> = self.resources[spec_index]
                    .backgrounds
                    .iter()
                    .map(|(id, w)| (id.as_str(), *w))
                    .collect();
                match self.background_health.select(&mut rng, &candidates) {
                    Ok(id) => Some(PathBuf::from(id)),
                    Err(_) => {
                        log::debug!("index {index}: no healthy background; using color fill");
                        None
                    }
                }
            };

            tasks.push(Task {
                spec_index,
                spec_name,
                image_index: index,
                text,
                font_path: PathBuf::from(font_id),
                background_path,
            });
        }
        tasks
    }

    fn font_covers(&self, font_id: &str, text: &str) -> bool {
        let Ok(handle) = self.fonts.load(Path::new(font_id)) else {
            return false;
        };
        text.chars()
            .filter(|c| !c.is_whitespace())
            .all(|c| self.engine.has_glyph(&handle, c))
    }

    /// Plan and execute one task, retrying with a fresh font on
    /// classified failures.
    fn run_task(&self, task: &Task) -> TaskOutcome {
        let spec = &self.config.specs[task.spec_index];
        let runtime = &self.config.runtime;
        let master_seed = self.config.master_seed();
        let mut current = task.clone();
        let mut tried: HashSet<String> = HashSet::new();

        for attempt in 0..=runtime.retry_budget {
            let plan = plan_task(spec, runtime, &current, master_seed);
            let font_id = current.font_path.display().to_string();

            match generate_from_plan(&plan, self.engine.as_ref(), &self.fonts) {
                Ok(output) => {
                    self.font_health.record_success(&font_id);
                    self.settle_background(&current, &output.background_issue, output.background_used);

                    let record = build_record(&plan, &output);
                    let png = match textsynth_export::encode_png(&output.surface) {
                        Ok(bytes) => bytes,
                        Err(e) => return self.fatal(&plan, e),
                    };
                    let label = match textsynth_export::encode_label(&record) {
                        Ok(bytes) => bytes,
                        Err(e) => return self.fatal(&plan, e),
                    };
                    return TaskOutcome::Done {
                        index: task.image_index,
                        spec_index: task.spec_index,
                        png,
                        label,
                    };
                }
                Err(e @ SynthError::InternalInvariant(_)) => return self.fatal(&plan, e),
                Err(e) => {
                    if let Some(kind) = e.failure_kind() {
                        self.font_health.record_failure(&font_id, kind);
                    }
                    log::warn!(
                        "index {} attempt {attempt} failed with {e}; retrying with a fresh font",
                        task.image_index
                    );
                    tried.insert(font_id);

                    let candidates: Vec<(&str, f64)> = self.resources[task.spec_index]
                        .fonts
                        .iter()
                        .filter(|(id, _)| !tried.contains(id))
                        .map(|(id, w)| (id.as_str(), *w))
                        .collect();
                    let mut rng = stream_rng(plan.seed, "retry");
                    match self.font_health.select(&mut rng, &candidates) {
                        Ok(next) => current.font_path = PathBuf::from(next),
                        Err(_) => {
                            return TaskOutcome::Skip(SkipRecord {
                                image_index: task.image_index,
                                spec_name: task.spec_name.clone(),
                                reason: format!("retries exhausted: {e}"),
                            })
                        }
                    }
                }
            }
        }
        TaskOutcome::Skip(SkipRecord {
            image_index: task.image_index,
            spec_name: task.spec_name.clone(),
            reason: "retry budget exhausted".to_string(),
        })
    }

    fn settle_background(
        &self,
        task: &Task,
        issue: &Option<BackgroundIssue>,
        used: bool,
    ) {
        let Some(bg) = &task.background_path else {
            return;
        };
        let id = bg.display().to_string();
        match issue {
            None if used => self.background_health.record_success(&id),
            None => {}
            Some(BackgroundIssue::TooSmallForCanvas) => {
                self.background_health.record_failure(&id, FailureKind::Other);
            }
            Some(BackgroundIssue::TooSmallForText) | Some(BackgroundIssue::Unreadable) => {
                // Severe: double penalty locks bad backgrounds out fast.
                self.background_health.record_failure(&id, FailureKind::Other);
                self.background_health.record_failure(&id, FailureKind::Other);
            }
        }
    }

    fn fatal(&self, plan: &crate::plan::Plan, error: SynthError) -> TaskOutcome {
        let plan_dump = serde_json::to_string_pretty(plan).unwrap_or_default();
        log::error!("invariant failure, dumping plan for postmortem:\n{plan_dump}");
        TaskOutcome::Fatal {
            error: error.to_string(),
        }
    }

    /// Run the whole batch: chunked parallel execution, ordered output,
    /// checkpoints after every chunk.
    pub fn run(&mut self, options: &RunOptions) -> Result<RunSummary> {
        let start = Instant::now();
        std::fs::create_dir_all(&options.output_dir)?;

        let hash = config_hash(&self.config);
        let checkpoint_path = options.output_dir.join(CHECKPOINT_FILE);
        let mut checkpoint = if options.resume {
            match Checkpoint::load(&checkpoint_path)? {
                Some(existing) => {
                    if existing.config_hash != hash {
                        log::warn!(
                            "checkpoint config hash mismatch ({:#x} vs {:#x}); resuming anyway",
                            existing.config_hash,
                            hash
                        );
                    }
                    Checkpoint {
                        config_hash: hash,
                        completed: existing.completed,
                    }
                }
                None => Checkpoint::new(hash),
            }
        } else {
            Checkpoint::new(hash)
        };

        if self.config.runtime.persist_health {
            self.font_health
                .load(&options.output_dir.join(FONT_HEALTH_FILE))?;
            self.background_health
                .load(&options.output_dir.join(BACKGROUND_HEALTH_FILE))?;
        }

        let mut skipped: Vec<SkipRecord> = Vec::new();
        let tasks = self.build_tasks(&mut skipped);
        let pending: Vec<&Task> = tasks
            .iter()
            .filter(|t| !checkpoint.contains(t.image_index))
            .collect();

        log::info!(
            "scheduling {} of {} tasks ({} already completed)",
            pending.len(),
            tasks.len(),
            checkpoint.completed.len()
        );

        // I/O pool: workers encode, these threads write.
        let (tx, rx) = bounded::<(u64, Vec<u8>, Vec<u8>)>(self.config.runtime.chunk_size.max(1));
        let io_fatal = Arc::new(AtomicBool::new(false));
        let io_errors: Arc<Mutex<Vec<SkipRecord>>> = Arc::new(Mutex::new(Vec::new()));
        let mut io_threads = Vec::new();
        for _ in 0..self.config.runtime.io_workers.max(1) {
            io_threads.push(spawn_io_writer(
                rx.clone(),
                options.output_dir.clone(),
                self.config.runtime.io_batch_size.max(1),
                io_fatal.clone(),
                io_errors.clone(),
            ));
        }
        drop(rx);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.runtime.generation_workers)
            .build()
            .map_err(|e| SynthError::Config(format!("worker pool: {e}")))?;

        let mut per_spec: Vec<(String, u64)> = self
            .config
            .specs
            .iter()
            .map(|s| (s.name.clone(), 0u64))
            .collect();
        let mut generated = 0u64;
        let mut cancelled = false;
        let time_budget = self.config.runtime.time_budget_secs.map(Duration::from_secs);

        let mut fatal_error: Option<SynthError> = None;
        for chunk in pending.chunks(self.config.runtime.chunk_size.max(1)) {
            if self.cancel.load(Ordering::SeqCst) {
                log::info!("cancellation requested; stopping task submission");
                cancelled = true;
                break;
            }
            if let Some(budget) = time_budget {
                if start.elapsed() > budget {
                    log::warn!("wall-clock budget exceeded; stopping task submission");
                    break;
                }
            }
            if io_fatal.load(Ordering::SeqCst) {
                fatal_error = Some(SynthError::Io(std::io::Error::other(
                    "persistent write failures in the I/O pool",
                )));
                break;
            }

            let outcomes: Vec<TaskOutcome> =
                pool.install(|| chunk.par_iter().map(|task| self.run_task(task)).collect());

            for outcome in outcomes {
                match outcome {
                    TaskOutcome::Done {
                        index,
                        spec_index,
                        png,
                        label,
                    } => {
                        if tx.send((index, png, label)).is_err() {
                            fatal_error = Some(SynthError::Io(std::io::Error::other(
                                "I/O pool exited early",
                            )));
                            break;
                        }
                        checkpoint.mark(index);
                        per_spec[spec_index].1 += 1;
                        generated += 1;
                    }
                    TaskOutcome::Skip(record) => {
                        log::warn!(
                            "index {} skipped: {}",
                            record.image_index,
                            record.reason
                        );
                        skipped.push(record);
                    }
                    TaskOutcome::Fatal { error, .. } => {
                        fatal_error = Some(SynthError::InternalInvariant(error));
                        break;
                    }
                }
            }
            if fatal_error.is_some() {
                break;
            }

            checkpoint.save(&checkpoint_path)?;
            log::info!(
                "chunk complete: {}/{} generated",
                checkpoint.completed.len(),
                tasks.len()
            );
        }

        drop(tx);
        for t in io_threads {
            let _ = t.join();
        }
        // Flush the checkpoint once more after the writers are done.
        checkpoint.save(&checkpoint_path)?;
        skipped.extend(io_errors.lock().drain(..));

        if self.config.runtime.persist_health {
            self.font_health
                .save(&options.output_dir.join(FONT_HEALTH_FILE))?;
            self.background_health
                .save(&options.output_dir.join(BACKGROUND_HEALTH_FILE))?;
        }

        if let Some(error) = fatal_error {
            return Err(error);
        }

        let summary = RunSummary {
            requested: self.config.total_images,
            generated,
            skipped,
            per_spec,
            cancelled,
            elapsed: start.elapsed(),
        };
        log_summary(&summary);
        Ok(summary)
    }
}

fn log_summary(summary: &RunSummary) {
    log::info!(
        "run finished: {}/{} images in {:.1}s{}",
        summary.generated,
        summary.requested,
        summary.elapsed.as_secs_f64(),
        if summary.cancelled { " (cancelled)" } else { "" }
    );
    for (name, count) in &summary.per_spec {
        log::info!("  spec '{name}': {count} images");
    }
    for skip in &summary.skipped {
        log::info!(
            "  skipped index {} ({}): {}",
            skip.image_index,
            skip.spec_name,
            skip.reason
        );
    }
}

fn spawn_io_writer(
    rx: Receiver<(u64, Vec<u8>, Vec<u8>)>,
    out_dir: PathBuf,
    batch_size: usize,
    fatal: Arc<AtomicBool>,
    errors: Arc<Mutex<Vec<SkipRecord>>>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut pending: Vec<(u64, Vec<u8>, Vec<u8>)> = Vec::with_capacity(batch_size);
        for message in rx.iter() {
            pending.push(message);
            if pending.len() >= batch_size {
                flush_batch(&mut pending, &out_dir, &fatal, &errors);
            }
        }
        flush_batch(&mut pending, &out_dir, &fatal, &errors);
    })
}

fn flush_batch(
    pending: &mut Vec<(u64, Vec<u8>, Vec<u8>)>,
    out_dir: &Path,
    fatal: &AtomicBool,
    errors: &Mutex<Vec<SkipRecord>>,
) {
    for (index, png, label) in pending.drain(..) {
        let image_path = out_dir.join(format!("image_{index:05}.png"));
        let label_path = out_dir.join(format!("image_{index:05}.json"));
        if !write_with_retry(&image_path, &png) || !write_with_retry(&label_path, &label) {
            fatal.store(true, Ordering::SeqCst);
            errors.lock().push(SkipRecord {
                image_index: index,
                spec_name: String::new(),
                reason: "write failed after retries".to_string(),
            });
        }
    }
}

fn write_with_retry(path: &Path, bytes: &[u8]) -> bool {
    for attempt in 0..IO_WRITE_ATTEMPTS {
        match std::fs::write(path, bytes) {
            Ok(()) => return true,
            Err(e) => log::warn!(
                "write attempt {} for {} failed: {e}",
                attempt + 1,
                path.display()
            ),
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotas_sum_exactly() {
        let quotas = allocate_quotas(100, &[0.5, 0.3, 0.2]);
        assert_eq!(quotas.iter().sum::<u64>(), 100);
        assert_eq!(quotas, vec![50, 30, 20]);
    }

    #[test]
    fn quotas_distribute_remainder_by_largest_fraction() {
        // 10 * [0.55, 0.45] = [5.5, 4.5]; the single leftover goes to
        // the larger fraction, ties to the earlier spec.
        let quotas = allocate_quotas(10, &[0.55, 0.45]);
        assert_eq!(quotas.iter().sum::<u64>(), 10);
        assert_eq!(quotas, vec![6, 4]);

        let thirds = allocate_quotas(10, &[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]);
        assert_eq!(thirds.iter().sum::<u64>(), 10);
        assert_eq!(thirds, vec![4, 3, 3]);
    }

    #[test]
    fn quota_of_one_spec_is_total() {
        assert_eq!(allocate_quotas(7, &[1.0]), vec![7]);
        assert_eq!(allocate_quotas(0, &[1.0]), vec![0]);
    }

    #[test]
    fn summary_exit_codes() {
        let mut summary = RunSummary {
            requested: 10,
            generated: 10,
            skipped: vec![],
            per_spec: vec![],
            cancelled: false,
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(summary.exit_code(), 0);
        summary.skipped.push(SkipRecord {
            image_index: 3,
            spec_name: "s".into(),
            reason: "r".into(),
        });
        assert_eq!(summary.exit_code(), 3);
        summary.cancelled = true;
        assert_eq!(summary.exit_code(), 4);
    }
}
