// this_file: crates/textsynth/src/checkpoint.rs

//! Atomic run checkpoints for resume.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use textsynth_core::{Result, SynthError};

/// File name inside the output directory.
pub const CHECKPOINT_FILE: &str = ".generation_checkpoint";

/// Completed image indices plus the hash of the config that produced
/// them. Rewritten atomically after every chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub config_hash: u64,
    pub completed: BTreeSet<u64>,
}

impl Checkpoint {
    pub fn new(config_hash: u64) -> Self {
        Self {
            config_hash,
            completed: BTreeSet::new(),
        }
    }

    pub fn mark(&mut self, index: u64) {
        self.completed.insert(index);
    }

    pub fn contains(&self, index: u64) -> bool {
        self.completed.contains(&index)
    }

    /// Load an existing checkpoint, `None` when absent.
    pub fn load(path: &Path) -> Result<Option<Checkpoint>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)?;
        let checkpoint = serde_json::from_str(&raw).map_err(|e| {
            SynthError::Config(format!("corrupt checkpoint {}: {e}", path.display()))
        })?;
        Ok(Some(checkpoint))
    }

    /// Write atomically: temp file then rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self).map_err(|e| {
            SynthError::InternalInvariant(format!("checkpoint encode failed: {e}"))
        })?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CHECKPOINT_FILE);

        let mut cp = Checkpoint::new(0xDEAD);
        cp.mark(3);
        cp.mark(1);
        cp.save(&path).unwrap();

        let loaded = Checkpoint::load(&path).unwrap().unwrap();
        assert_eq!(loaded, cp);
        assert!(loaded.contains(1));
        assert!(!loaded.contains(2));
    }

    #[test]
    fn missing_checkpoint_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Checkpoint::load(&dir.path().join(CHECKPOINT_FILE))
            .unwrap()
            .is_none());
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CHECKPOINT_FILE);
        Checkpoint::new(1).save(&path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }
}
