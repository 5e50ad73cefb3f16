// this_file: crates/textsynth/src/lib.rs

//! Textsynth - synthetic OCR training-image generation
//!
//! The pipeline, stage by stage:
//!
//! 1. **Config** - a validated [`textsynth_config::GeneratorConfig`]
//! 2. **Scheduler** - quotas, interleaved task stream, parallel chunks
//! 3. **Planner** - samples a [`Plan`]: the full parameter vector
//! 4. **Executor** - layout, shaping, effects, augmentation, canvas
//! 5. **Export** - PNG image plus a JSON label per index
//!
//! Determinism is the core contract: a plan's seed is derived from
//! `(master_seed, image_index, spec_name)`, every random draw flows
//! through named streams seeded from it, and outputs are invariant
//! under worker count and completion order.

pub mod checkpoint;
pub mod executor;
pub mod plan;
pub mod planner;
pub mod record;
pub mod scheduler;

#[cfg(test)]
mod testutil;

pub use checkpoint::{Checkpoint, CHECKPOINT_FILE};
pub use executor::{generate_from_plan, BackgroundIssue, GenOutput};
pub use plan::{BackgroundPlan, ColorPlan, CurvePlan, Plan, Task};
pub use planner::{plan_batch, plan_task};
pub use record::{build_record, plan_from_record, GenerationRecord, SCHEMA_VERSION};
pub use scheduler::{allocate_quotas, RunOptions, RunSummary, Scheduler, SkipRecord};
