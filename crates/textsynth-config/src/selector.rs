// this_file: crates/textsynth-config/src/selector.rs

//! Weighted glob selectors resolved to concrete file lists.

use crate::types::WeightedPattern;
use std::path::{Path, PathBuf};
use textsynth_core::{ResourceKind, Result, SynthError};

/// One file matched by a selector, carrying its pattern weight.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub weight: f64,
}

/// Expand every pattern against `base` (when the pattern is relative) and
/// return the matched files with their weights. Files matched by more than
/// one pattern keep the first weight seen. The glob crate returns matches
/// in alphabetical order, which keeps resolution deterministic.
pub fn resolve_patterns(
    base: Option<&Path>,
    patterns: &[WeightedPattern],
    kind: ResourceKind,
) -> Result<Vec<ResolvedFile>> {
    let mut out: Vec<ResolvedFile> = Vec::new();
    for wp in patterns {
        let full = anchor(base, wp.pattern());
        let matches = glob::glob(&full)
            .map_err(|e| SynthError::Config(format!("bad {kind} glob '{full}': {e}")))?;
        for entry in matches {
            let path = entry
                .map_err(|e| SynthError::Config(format!("{kind} glob '{full}': {e}")))?;
            if !path.is_file() {
                continue;
            }
            if out.iter().any(|r| r.path == path) {
                continue;
            }
            out.push(ResolvedFile {
                path,
                weight: wp.weight(),
            });
        }
    }
    Ok(out)
}

/// Like [`resolve_patterns`] but an empty result is an error; used for
/// pools that must not be empty (fonts, corpora).
pub fn resolve_required(
    base: Option<&Path>,
    patterns: &[WeightedPattern],
    kind: ResourceKind,
) -> Result<Vec<ResolvedFile>> {
    let files = resolve_patterns(base, patterns, kind)?;
    if files.is_empty() {
        let shown = patterns
            .iter()
            .map(|p| p.pattern().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(SynthError::ResourceMissing {
            kind,
            path: shown,
        });
    }
    Ok(files)
}

fn anchor(base: Option<&Path>, pattern: &str) -> String {
    match base {
        Some(base) if !Path::new(pattern).is_absolute() => {
            base.join(pattern).to_string_lossy().into_owned()
        }
        _ => pattern.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn resolves_relative_patterns_against_base() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        fs::write(dir.path().join("b.txt"), "beta").unwrap();
        fs::write(dir.path().join("c.log"), "gamma").unwrap();

        let files = resolve_patterns(
            Some(dir.path()),
            &[WeightedPattern::Plain("*.txt".into())],
            ResourceKind::Corpus,
        )
        .unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.weight == 1.0));
    }

    #[test]
    fn duplicate_matches_keep_first_weight() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x.ttf"), b"\0").unwrap();

        let files = resolve_patterns(
            Some(dir.path()),
            &[
                WeightedPattern::Weighted {
                    pattern: "*.ttf".into(),
                    weight: 3.0,
                },
                WeightedPattern::Plain("x.ttf".into()),
            ],
            ResourceKind::Font,
        )
        .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].weight, 3.0);
    }

    #[test]
    fn required_pool_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_required(
            Some(dir.path()),
            &[WeightedPattern::Plain("*.ttf".into())],
            ResourceKind::Font,
        )
        .unwrap_err();
        assert!(matches!(err, SynthError::ResourceMissing { .. }));
    }
}
