// this_file: crates/textsynth-export/src/json.rs

//! Label record writing.

use serde::Serialize;
use std::path::Path;
use textsynth_core::Result;

/// Serialize a label record to pretty JSON bytes.
pub fn encode_label<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(record).map_err(|e| {
        textsynth_core::SynthError::InternalInvariant(format!("label encode failed: {e}"))
    })?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Write a label record next to its image.
pub fn write_label<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    std::fs::write(path, encode_label(record)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Probe {
        text: String,
        font_size: u32,
    }

    #[test]
    fn labels_are_pretty_json_with_trailing_newline() {
        let bytes = encode_label(&Probe {
            text: "hi".into(),
            font_size: 32,
        })
        .unwrap();
        let s = String::from_utf8(bytes).unwrap();
        assert!(s.ends_with('\n'));
        assert!(s.contains("\"text\": \"hi\""));
    }

    #[test]
    fn write_label_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image_00000.json");
        write_label(
            &path,
            &Probe {
                text: "x".into(),
                font_size: 12,
            },
        )
        .unwrap();
        assert!(path.exists());
    }
}
