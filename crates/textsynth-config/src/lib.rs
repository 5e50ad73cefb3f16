// this_file: crates/textsynth-config/src/lib.rs

//! Configuration loading and validation for textsynth.
//!
//! The YAML document is parsed by `serde_yaml` into the typed records in
//! [`types`]; [`validate`] then checks every static property in one pass
//! and reports all problems together. A stable hash of the canonical
//! config is embedded in checkpoints so resume can detect drift.

pub mod palette;
pub mod selector;
pub mod types;
pub mod validate;

pub use selector::{resolve_patterns, resolve_required, ResolvedFile};
pub use types::{
    AugmentRanges, BackgroundColor, BatchSpec, ColorConfig, CountRange, CurveConfig, EffectRanges,
    GeneratorConfig, PaletteSpec, ParamRange, RgbTriple, RuntimeConfig, WeightedPattern,
};
pub use validate::{validate, ResourceRoots, ValidationReport};

use siphasher::sip::SipHasher13;
use std::hash::Hasher;
use std::path::Path;
use textsynth_core::{Result, SynthError};

/// Load a configuration document from disk.
pub fn load_config(path: &Path) -> Result<GeneratorConfig> {
    let raw = std::fs::read_to_string(path)?;
    parse_config(&raw, false)
}

/// Load with unknown-key rejection.
pub fn load_config_strict(path: &Path) -> Result<GeneratorConfig> {
    let raw = std::fs::read_to_string(path)?;
    parse_config(&raw, true)
}

/// Parse a configuration document. In strict mode any key in the document
/// that the schema did not consume is an error.
pub fn parse_config(raw: &str, strict: bool) -> Result<GeneratorConfig> {
    let config: GeneratorConfig =
        serde_yaml::from_str(raw).map_err(|e| SynthError::Config(format!("parse error: {e}")))?;

    if strict {
        let document: serde_yaml::Value = serde_yaml::from_str(raw)
            .map_err(|e| SynthError::Config(format!("parse error: {e}")))?;
        let reference = serde_yaml::to_value(&config)
            .map_err(|e| SynthError::Config(format!("re-serialization failed: {e}")))?;
        let mut unknown = Vec::new();
        collect_unknown_keys(&document, &reference, "", &mut unknown);
        if !unknown.is_empty() {
            return Err(SynthError::Config(format!(
                "unknown configuration keys: {}",
                unknown.join(", ")
            )));
        }
    }

    Ok(config)
}

/// Stable hash of the canonical (JSON-serialized) configuration, used to
/// tie checkpoints to the config that produced them.
pub fn config_hash(config: &GeneratorConfig) -> u64 {
    let canonical = serde_json::to_string(config).unwrap_or_default();
    let mut h = SipHasher13::new_with_keys(0x636f_6e66_6967, 0x6861_7368);
    h.write(canonical.as_bytes());
    h.finish()
}

/// Walk the user document against the re-serialized schema and collect
/// mapping keys the schema does not know about.
fn collect_unknown_keys(
    document: &serde_yaml::Value,
    reference: &serde_yaml::Value,
    path: &str,
    out: &mut Vec<String>,
) {
    use serde_yaml::Value;
    match (document, reference) {
        (Value::Mapping(doc), Value::Mapping(known)) => {
            for (key, value) in doc {
                let key_name = key.as_str().unwrap_or("?");
                let child_path = if path.is_empty() {
                    key_name.to_string()
                } else {
                    format!("{path}.{key_name}")
                };
                match known.get(key) {
                    Some(reference_child) => {
                        collect_unknown_keys(value, reference_child, &child_path, out)
                    }
                    None => out.push(child_path),
                }
            }
        }
        (Value::Sequence(doc), Value::Sequence(known)) => {
            for (i, (value, reference_child)) in doc.iter().zip(known.iter()).enumerate() {
                let child_path = format!("{path}[{i}]");
                collect_unknown_keys(value, reference_child, &child_path, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
total_images: 100
seed: 7
specs:
  - name: latin
    proportion: 1.0
    corpus: ["corpora/*.txt"]
    fonts: ["fonts/*.ttf"]
    text_length: {min: 1, max: 24}
"#;

    #[test]
    fn minimal_document_parses() {
        let config = parse_config(MINIMAL, false).unwrap();
        assert_eq!(config.total_images, 100);
        assert_eq!(config.specs.len(), 1);
        assert_eq!(config.master_seed(), 7);
    }

    #[test]
    fn strict_mode_rejects_unknown_keys() {
        let doc = format!("{MINIMAL}    typo_knob: 3\n");
        assert!(parse_config(&doc, false).is_ok());
        let err = parse_config(&doc, true).unwrap_err();
        assert!(err.to_string().contains("typo_knob"), "{err}");
    }

    #[test]
    fn hash_is_sensitive_to_content() {
        let a = parse_config(MINIMAL, false).unwrap();
        let mut b = a.clone();
        assert_eq!(config_hash(&a), config_hash(&b));
        b.total_images = 101;
        assert_ne!(config_hash(&a), config_hash(&b));
    }
}
