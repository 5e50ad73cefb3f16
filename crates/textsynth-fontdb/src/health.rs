// this_file: crates/textsynth-fontdb/src/health.rs

//! Per-resource success/failure scoring with exponential-decay cooldowns.
//!
//! One tracker guards one pool (fonts or backgrounds). Workers report
//! task outcomes; selection steers probability mass toward resources
//! that keep working and locks out ones that keep failing, first by
//! score and then by a doubling cooldown.

use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use textsynth_core::{FailureKind, ResourceKind, Result, SynthError};

const SCORE_MAX: f64 = 100.0;
const SUCCESS_REWARD: f64 = 1.0;
const FAILURE_PENALTY: f64 = 10.0;

/// Tracker tuning. Defaults match the documented contract.
#[derive(Debug, Clone, Copy)]
pub struct HealthConfig {
    /// Resources below this score are never selected.
    pub threshold: f64,
    /// First-failure cooldown; doubles with each consecutive failure.
    pub base_cooldown: Duration,
    /// Cap on the doubling.
    pub max_cooldown: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            threshold: 50.0,
            base_cooldown: Duration::from_secs(2),
            max_cooldown: Duration::from_secs(300),
        }
    }
}

/// Mutable health state of one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceHealth {
    pub score: f64,
    pub consecutive_failures: u32,
    pub cooldown_until: Option<SystemTime>,
    pub last_error_kind: Option<FailureKind>,
}

impl ResourceHealth {
    fn fresh() -> Self {
        Self {
            score: SCORE_MAX,
            consecutive_failures: 0,
            cooldown_until: None,
            last_error_kind: None,
        }
    }

    fn eligible(&self, threshold: f64, now: SystemTime) -> bool {
        if self.score < threshold {
            return false;
        }
        match self.cooldown_until {
            Some(until) => now >= until,
            None => true,
        }
    }
}

/// Serialized health table for optional persistence across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub entries: Vec<HealthEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthEntry {
    pub resource_id: String,
    pub score: f64,
    pub consecutive_failures: u32,
    pub cooldown_until_epoch_secs: Option<u64>,
    pub last_error_kind: Option<FailureKind>,
}

/// Shared health tracker for one resource pool.
pub struct HealthTracker {
    kind: ResourceKind,
    config: HealthConfig,
    table: Mutex<HashMap<String, ResourceHealth>>,
}

impl HealthTracker {
    pub fn new(kind: ResourceKind) -> Self {
        Self::with_config(kind, HealthConfig::default())
    }

    pub fn with_config(kind: ResourceKind, config: HealthConfig) -> Self {
        Self {
            kind,
            config,
            table: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn record_success(&self, id: &str) {
        let mut table = self.table.lock();
        let entry = table
            .entry(id.to_string())
            .or_insert_with(ResourceHealth::fresh);
        entry.score = (entry.score + SUCCESS_REWARD).min(SCORE_MAX);
        entry.consecutive_failures = 0;
        entry.cooldown_until = None;
    }

    pub fn record_failure(&self, id: &str, kind: FailureKind) {
        let mut table = self.table.lock();
        let entry = table
            .entry(id.to_string())
            .or_insert_with(ResourceHealth::fresh);
        entry.score = (entry.score - FAILURE_PENALTY).max(0.0);
        entry.consecutive_failures += 1;
        entry.last_error_kind = Some(kind);

        let exp = entry.consecutive_failures.saturating_sub(1).min(16);
        let cooldown = self
            .config
            .base_cooldown
            .saturating_mul(1u32 << exp)
            .min(self.config.max_cooldown);
        entry.cooldown_until = Some(SystemTime::now() + cooldown);
        log::debug!(
            "{} '{id}' failed ({kind}); score {:.0}, cooldown {:?}",
            self.kind,
            entry.score,
            cooldown
        );
    }

    /// Current score, treating unseen resources as fresh.
    pub fn score(&self, id: &str) -> f64 {
        self.table
            .lock()
            .get(id)
            .map(|e| e.score)
            .unwrap_or(SCORE_MAX)
    }

    /// Weighted selection among healthy candidates: probability is
    /// proportional to `pattern_weight * score`. Candidates never seen
    /// before count as fresh.
    pub fn select<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        candidates: &[(&str, f64)],
    ) -> Result<String> {
        let now = SystemTime::now();
        let table = self.table.lock();

        let mut pool: Vec<(&str, f64)> = Vec::with_capacity(candidates.len());
        let mut total = 0.0f64;
        for &(id, weight) in candidates {
            let health = table.get(id);
            let (score, eligible) = match health {
                Some(h) => (h.score, h.eligible(self.config.threshold, now)),
                None => (SCORE_MAX, true),
            };
            if !eligible || weight <= 0.0 {
                continue;
            }
            let mass = weight * score;
            if mass > 0.0 {
                pool.push((id, mass));
                total += mass;
            }
        }
        drop(table);

        if pool.is_empty() || total <= 0.0 {
            return Err(SynthError::NoHealthyResource(self.kind));
        }

        let mut pick = rng.gen_range(0.0..total);
        for (id, mass) in &pool {
            pick -= mass;
            if pick <= 0.0 {
                return Ok((*id).to_string());
            }
        }
        // Floating-point slack lands on the last candidate.
        Ok(pool[pool.len() - 1].0.to_string())
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let table = self.table.lock();
        let mut entries: Vec<HealthEntry> = table
            .iter()
            .map(|(id, h)| HealthEntry {
                resource_id: id.clone(),
                score: h.score,
                consecutive_failures: h.consecutive_failures,
                cooldown_until_epoch_secs: h
                    .cooldown_until
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_secs()),
                last_error_kind: h.last_error_kind,
            })
            .collect();
        entries.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));
        HealthSnapshot { entries }
    }

    pub fn restore(&self, snapshot: &HealthSnapshot) {
        let mut table = self.table.lock();
        table.clear();
        for e in &snapshot.entries {
            table.insert(
                e.resource_id.clone(),
                ResourceHealth {
                    score: e.score.clamp(0.0, SCORE_MAX),
                    consecutive_failures: e.consecutive_failures,
                    cooldown_until: e
                        .cooldown_until_epoch_secs
                        .map(|s| UNIX_EPOCH + Duration::from_secs(s)),
                    last_error_kind: e.last_error_kind,
                },
            );
        }
    }

    /// Persist the snapshot as JSON, atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot();
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| SynthError::InternalInvariant(format!("snapshot encode: {e}")))?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Restore from a JSON snapshot if one exists.
    pub fn load(&self, path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        let raw = std::fs::read_to_string(path)?;
        let snapshot: HealthSnapshot = serde_json::from_str(&raw)
            .map_err(|e| SynthError::Config(format!("corrupt health snapshot {}: {e}", path.display())))?;
        self.restore(&snapshot);
        Ok(true)
    }
}
