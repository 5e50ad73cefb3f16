// this_file: crates/textsynth-fontdb/src/library.rs

//! Font file handles, loaded once and shared across workers.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use textsynth_core::{ResourceKind, Result, SynthError};

/// A font file resolved from a selector, with its pattern weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedFont {
    pub path: PathBuf,
    pub weight: f64,
}

/// Font data loaded into memory. Handles are cheap to clone and shared
/// between every worker that selects the same file.
#[derive(Debug, Clone)]
pub struct FontHandle {
    /// Stable identifier: the canonicalized path.
    pub key: String,
    pub path: PathBuf,
    pub bytes: Arc<[u8]>,
}

/// The pool of candidate fonts for one run, with a byte cache so each
/// file is read exactly once.
pub struct FontLibrary {
    entries: Vec<WeightedFont>,
    cache: Mutex<HashMap<PathBuf, Arc<FontHandle>>>,
}

impl FontLibrary {
    pub fn new(entries: Vec<WeightedFont>) -> Self {
        Self {
            entries,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn entries(&self) -> &[WeightedFont] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load (or fetch from cache) the handle for one font file.
    pub fn load(&self, path: &Path) -> Result<Arc<FontHandle>> {
        if let Some(handle) = self.cache.lock().get(path) {
            return Ok(handle.clone());
        }
        let bytes = std::fs::read(path).map_err(|e| {
            log::warn!("font read failed for {}: {e}", path.display());
            SynthError::ResourceMissing {
                kind: ResourceKind::Font,
                path: path.display().to_string(),
            }
        })?;
        let handle = Arc::new(FontHandle {
            key: path.display().to_string(),
            path: path.to_path_buf(),
            bytes: Arc::from(bytes.into_boxed_slice()),
        });
        self.cache.lock().insert(path.to_path_buf(), handle.clone());
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn load_caches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.ttf");
        fs::write(&path, b"0123").unwrap();

        let lib = FontLibrary::new(vec![WeightedFont {
            path: path.clone(),
            weight: 1.0,
        }]);
        let a = lib.load(&path).unwrap();
        let b = lib.load(&path).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.bytes.as_ref(), b"0123");
    }

    #[test]
    fn missing_font_is_resource_missing() {
        let lib = FontLibrary::new(Vec::new());
        let err = lib.load(Path::new("/nonexistent/f.ttf")).unwrap_err();
        assert!(matches!(
            err,
            SynthError::ResourceMissing {
                kind: ResourceKind::Font,
                ..
            }
        ));
    }
}
