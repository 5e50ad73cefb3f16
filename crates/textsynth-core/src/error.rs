// this_file: crates/textsynth-core/src/error.rs

//! Error taxonomy shared by every textsynth crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SynthError>;

/// Which pool a resource belongs to, for health bookkeeping and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Font,
    Background,
    Corpus,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Font => write!(f, "font"),
            ResourceKind::Background => write!(f, "background"),
            ResourceKind::Corpus => write!(f, "corpus"),
        }
    }
}

/// Main error type for textsynth.
///
/// Fatal-before-generation: `Config`, `ResourceMissing`. Per-task and
/// retryable: `GlyphMiss`, `RenderPanic`, `BackgroundTooSmall`, `Io`.
/// Per-task and skipped: `CorpusEmpty`, `NoHealthyResource`.
/// `InternalInvariant` aborts the current chunk.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{kind} resource missing: {path}")]
    ResourceMissing { kind: ResourceKind, path: String },

    #[error("font '{font}' has no glyph for {ch:?}")]
    GlyphMiss { font: String, ch: char },

    #[error("rasterizer failure in '{font}': {detail}")]
    RenderPanic { font: String, detail: String },

    #[error("background '{path}' is {got_w}x{got_h}, needs at least {need_w}x{need_h}")]
    BackgroundTooSmall {
        path: String,
        got_w: u32,
        got_h: u32,
        need_w: u32,
        need_h: u32,
    },

    #[error("corpus produced no text")]
    CorpusEmpty,

    #[error("no healthy {0} resource available")]
    NoHealthyResource(ResourceKind),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl SynthError {
    /// Classify for the health tracker. `None` means the error does not
    /// implicate a selectable resource.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            SynthError::GlyphMiss { .. } => Some(FailureKind::GlyphMiss),
            SynthError::RenderPanic { .. } => Some(FailureKind::RasterizerPanic),
            SynthError::ResourceMissing {
                kind: ResourceKind::Font,
                ..
            } => Some(FailureKind::FontLoad),
            SynthError::BackgroundTooSmall { .. } => Some(FailureKind::Other),
            SynthError::Io(_) => Some(FailureKind::Io),
            _ => None,
        }
    }

    /// True for errors that terminate the whole run rather than one task.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SynthError::Config(_)
                | SynthError::ResourceMissing { .. }
                | SynthError::InternalInvariant(_)
        )
    }
}

/// Worker failure classes recorded against resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    FontLoad,
    GlyphMiss,
    RasterizerPanic,
    Io,
    Other,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::FontLoad => "font_load",
            FailureKind::GlyphMiss => "glyph_miss",
            FailureKind::RasterizerPanic => "rasterizer_panic",
            FailureKind::Io => "io",
            FailureKind::Other => "other",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyph_miss_classifies_for_health() {
        let err = SynthError::GlyphMiss {
            font: "a.ttf".into(),
            ch: '種',
        };
        assert_eq!(err.failure_kind(), Some(FailureKind::GlyphMiss));
        assert!(!err.is_fatal());
    }

    #[test]
    fn config_errors_are_fatal() {
        assert!(SynthError::Config("bad".into()).is_fatal());
        assert!(SynthError::InternalInvariant("bad".into()).is_fatal());
        assert!(!SynthError::CorpusEmpty.is_fatal());
    }
}
