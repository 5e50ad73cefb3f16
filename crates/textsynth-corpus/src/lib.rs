// this_file: crates/textsynth-corpus/src/lib.rs

//! Streamed text segment extraction from weighted corpus files.
//!
//! A reader owns a cursor into each of its source files and hands out
//! bounded-length character segments. Buffering is capped at a small
//! constant per reader regardless of corpus size; files wrap around at
//! EOF so a small corpus can feed an arbitrarily large batch. Each
//! worker owns its own reader, so no cursor coordination is needed.

use rand::Rng;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use textsynth_core::{Result, SynthError};

/// One corpus file with its selection weight.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusSource {
    pub path: PathBuf,
    pub weight: f64,
}

/// Bytes read from disk per refill.
const READ_CHUNK: usize = 8 * 1024;
/// Upper bound on decoded characters buffered per source. With 4-byte
/// characters this keeps each source under 64 KiB of buffer.
const PENDING_CAP: usize = 16 * 1024;
/// Source re-picks before giving up on a segment.
const EXTRACT_RETRIES: usize = 3;

struct SourceState {
    path: PathBuf,
    weight: f64,
    file: Option<File>,
    /// Undecoded byte tail carried between reads (UTF-8 boundary split).
    carry: Vec<u8>,
    /// Decoded characters, newlines already collapsed to spaces.
    pending: VecDeque<char>,
    /// Set when the file turned out to be empty or unreadable.
    dead: bool,
}

impl SourceState {
    fn new(source: &CorpusSource) -> Self {
        Self {
            path: source.path.clone(),
            weight: source.weight,
            file: None,
            carry: Vec::new(),
            pending: VecDeque::new(),
            dead: false,
        }
    }

    /// Top up `pending` to at least `want` characters, wrapping at EOF.
    fn refill(&mut self, want: usize) -> Result<()> {
        if self.dead {
            return Ok(());
        }
        let mut wrapped = false;
        while self.pending.len() < want.min(PENDING_CAP) {
            if self.file.is_none() {
                match File::open(&self.path) {
                    Ok(f) => self.file = Some(f),
                    Err(e) => {
                        log::warn!("corpus open failed for {}: {e}", self.path.display());
                        self.dead = true;
                        return Ok(());
                    }
                }
            }
            let mut chunk = vec![0u8; READ_CHUNK];
            let n = match self.file.as_mut() {
                Some(f) => f.read(&mut chunk)?,
                None => 0,
            };
            if n == 0 {
                if wrapped {
                    // A full wrap produced nothing new; a file that stays
                    // empty is dead, a short file returns what it has.
                    self.dead = self.pending.is_empty() && self.carry.is_empty();
                    return Ok(());
                }
                if let Some(f) = self.file.as_mut() {
                    f.seek(SeekFrom::Start(0))?;
                }
                wrapped = true;
                continue;
            }
            chunk.truncate(n);
            self.carry.extend_from_slice(&chunk);
            self.decode_carry();
        }
        Ok(())
    }

    /// Decode the valid UTF-8 prefix of the carry buffer into `pending`,
    /// collapsing whitespace runs into single spaces.
    fn decode_carry(&mut self) {
        let (valid, rest_start) = match std::str::from_utf8(&self.carry) {
            Ok(s) => (s.to_string(), self.carry.len()),
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                let s = std::str::from_utf8(&self.carry[..valid_up_to])
                    .unwrap_or("")
                    .to_string();
                (s, valid_up_to)
            }
        };
        self.carry.drain(..rest_start);

        for ch in valid.chars() {
            if self.pending.len() >= PENDING_CAP {
                break;
            }
            if ch.is_whitespace() {
                if self.pending.back().is_some_and(|&c| c != ' ') {
                    self.pending.push_back(' ');
                }
            } else {
                self.pending.push_back(ch);
            }
        }
    }

    /// Pop up to `len` characters off the front of the buffer.
    fn take(&mut self, len: usize) -> String {
        let mut out = String::with_capacity(len);
        for _ in 0..len {
            match self.pending.pop_front() {
                Some(c) => out.push(c),
                None => break,
            }
        }
        out
    }
}

/// Streamed segment extractor over one or more weighted text files.
pub struct CorpusReader {
    sources: Vec<SourceState>,
}

impl CorpusReader {
    pub fn new(sources: &[CorpusSource]) -> Self {
        Self {
            sources: sources.iter().map(SourceState::new).collect(),
        }
    }

    /// Extract one text segment of `min_len..=max_len` characters.
    ///
    /// Picks a source by weight, refills its buffer, and returns the next
    /// run of characters with whitespace collapsed. Fails with
    /// [`SynthError::CorpusEmpty`] when no source can produce text after
    /// a few retries.
    pub fn extract_segment<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        min_len: usize,
        max_len: usize,
    ) -> Result<String> {
        let min_len = min_len.max(1);
        let max_len = max_len.max(min_len);

        for _ in 0..=EXTRACT_RETRIES {
            let Some(idx) = self.pick_source(rng) else {
                break;
            };
            let target = rng.gen_range(min_len..=max_len);
            let source = &mut self.sources[idx];
            source.refill(target)?;
            let segment = source.take(target);
            let trimmed = segment.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }
        Err(SynthError::CorpusEmpty)
    }

    /// Weighted draw over sources that are still alive.
    fn pick_source<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        let total: f64 = self
            .sources
            .iter()
            .filter(|s| !s.dead && s.weight > 0.0)
            .map(|s| s.weight)
            .sum();
        if total <= 0.0 {
            return None;
        }
        let mut pick = rng.gen_range(0.0..total);
        for (i, s) in self.sources.iter().enumerate() {
            if s.dead || s.weight <= 0.0 {
                continue;
            }
            pick -= s.weight;
            if pick <= 0.0 {
                return Some(i);
            }
        }
        self.sources.iter().position(|s| !s.dead && s.weight > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;
    use std::io::Write;

    fn source(dir: &tempfile::TempDir, name: &str, content: &str, weight: f64) -> CorpusSource {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        CorpusSource { path, weight }
    }

    #[test]
    fn segments_respect_length_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(&dir, "a.txt", &"lorem ipsum dolor sit amet ".repeat(50), 1.0);
        let mut reader = CorpusReader::new(&[src]);
        let mut rng = Pcg64::seed_from_u64(1);
        for _ in 0..100 {
            let seg = reader.extract_segment(&mut rng, 5, 20).unwrap();
            let n = seg.chars().count();
            assert!(n <= 20, "segment too long: {n}");
            assert!(!seg.is_empty());
        }
    }

    #[test]
    fn newlines_collapse_to_single_spaces() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(&dir, "a.txt", "alpha\nbeta\r\n\n  gamma\tdelta", 1.0);
        let mut reader = CorpusReader::new(&[src]);
        let mut rng = Pcg64::seed_from_u64(2);
        let seg = reader.extract_segment(&mut rng, 10, 26).unwrap();
        assert!(!seg.contains('\n'));
        assert!(!seg.contains("  "), "run of spaces in {seg:?}");
    }

    #[test]
    fn small_corpus_wraps_around() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(&dir, "tiny.txt", "abcdef", 1.0);
        let mut reader = CorpusReader::new(&[src]);
        let mut rng = Pcg64::seed_from_u64(3);
        // Far more characters than the file holds.
        for _ in 0..50 {
            let seg = reader.extract_segment(&mut rng, 3, 5).unwrap();
            assert!(!seg.is_empty());
        }
    }

    #[test]
    fn empty_corpus_reports_empty() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(&dir, "empty.txt", "", 1.0);
        let mut reader = CorpusReader::new(&[src]);
        let mut rng = Pcg64::seed_from_u64(4);
        let err = reader.extract_segment(&mut rng, 1, 10).unwrap_err();
        assert!(matches!(err, SynthError::CorpusEmpty));
    }

    #[test]
    fn weights_bias_source_choice() {
        let dir = tempfile::tempdir().unwrap();
        let heavy = source(&dir, "heavy.txt", &"x".repeat(4000), 9.0);
        let light = source(&dir, "light.txt", &"y".repeat(4000), 1.0);
        let mut reader = CorpusReader::new(&[heavy, light]);
        let mut rng = Pcg64::seed_from_u64(5);
        let mut from_heavy = 0usize;
        let n = 2000;
        for _ in 0..n {
            let seg = reader.extract_segment(&mut rng, 1, 1).unwrap();
            if seg.starts_with('x') {
                from_heavy += 1;
            }
        }
        let share = from_heavy as f64 / n as f64;
        assert!((share - 0.9).abs() < 0.05, "heavy share {share}");
    }

    #[test]
    fn multibyte_text_never_splits_characters() {
        let dir = tempfile::tempdir().unwrap();
        let src = source(&dir, "jp.txt", &"東京都渋谷区 ".repeat(300), 1.0);
        let mut reader = CorpusReader::new(&[src]);
        let mut rng = Pcg64::seed_from_u64(6);
        for _ in 0..50 {
            let seg = reader.extract_segment(&mut rng, 2, 8).unwrap();
            assert!(seg.chars().all(|c| "東京都渋谷区 ".contains(c)), "{seg:?}");
        }
    }
}
