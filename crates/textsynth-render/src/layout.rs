// this_file: crates/textsynth-render/src/layout.rs

//! Line breaking and multi-line placement math.

use textsynth_core::{Direction, LineBreakMode, Result, SynthError, TextAlignment};

/// Break `text` into at most `num_lines` lines.
///
/// Word mode respects whitespace boundaries and packs greedily toward an
/// even character count per line; character mode distributes characters
/// as evenly as possible with remainders on earlier lines. A single
/// requested line returns the input unchanged; empty text returns one
/// empty line. Fewer lines than requested come back when the text cannot
/// fill them (e.g. two words across three lines).
pub fn break_into_lines(text: &str, num_lines: usize, mode: LineBreakMode) -> Vec<String> {
    if num_lines <= 1 {
        return vec![text.to_string()];
    }
    if text.is_empty() {
        return vec![String::new()];
    }

    match mode {
        LineBreakMode::Character => break_characters(text, num_lines),
        LineBreakMode::Word => break_words(text, num_lines),
    }
}

fn break_characters(text: &str, num_lines: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let lines = num_lines.min(n).max(1);
    let base = n / lines;
    let remainder = n % lines;

    let mut out = Vec::with_capacity(lines);
    let mut start = 0usize;
    for i in 0..lines {
        let len = base + usize::from(i < remainder);
        let line: String = chars[start..start + len].iter().collect();
        out.push(line.trim().to_string());
        start += len;
    }
    out.retain(|l| !l.is_empty());
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

fn break_words(text: &str, num_lines: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return vec![String::new()];
    }
    let lines = num_lines.min(words.len());
    let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();
    let target = (total_chars + lines - 1) / lines;

    let mut out: Vec<String> = Vec::with_capacity(lines);
    let mut current = String::new();
    let mut current_len = 0usize;
    for word in &words {
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word.chars().count();
        // Flush once the line reaches its share, keeping the last slot
        // open for everything that remains.
        if current_len >= target && out.len() + 1 < lines {
            out.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Total surface size for a stack of rendered lines.
///
/// For horizontal directions height accumulates with the spacing
/// multiplier and width is the widest line; vertical directions swap the
/// roles.
pub fn multiline_dimensions(
    line_sizes: &[(u32, u32)],
    spacing: f64,
    direction: Direction,
) -> (u32, u32) {
    if line_sizes.is_empty() {
        return (1, 1);
    }
    if direction.is_horizontal() {
        let width = line_sizes.iter().map(|&(w, _)| w).max().unwrap_or(1);
        let height = stacked_extent(line_sizes.iter().map(|&(_, h)| h), spacing);
        (width.max(1), height.max(1))
    } else {
        let width = stacked_extent(line_sizes.iter().map(|&(w, _)| w), spacing);
        let height = line_sizes.iter().map(|&(_, h)| h).max().unwrap_or(1);
        (width.max(1), height.max(1))
    }
}

/// Cumulative extent along the stacking axis: each line advances by its
/// own size times the spacing multiplier, except the last which only
/// needs its own size.
fn stacked_extent(sizes: impl Iterator<Item = u32>, spacing: f64) -> u32 {
    let sizes: Vec<u32> = sizes.collect();
    let mut total = 0.0f64;
    for (i, s) in sizes.iter().enumerate() {
        if i + 1 == sizes.len() {
            total += *s as f64;
        } else {
            total += *s as f64 * spacing.max(0.1);
        }
    }
    total.ceil() as u32
}

/// Per-line offsets within the total surface.
///
/// Returns one `(dx, dy)` per line. Alignment must be valid for the
/// direction; the validator guarantees this for configured values, so a
/// mismatch here is a configuration error.
pub fn line_positions(
    line_sizes: &[(u32, u32)],
    total: (u32, u32),
    spacing: f64,
    alignment: TextAlignment,
    direction: Direction,
) -> Result<Vec<(f32, f32)>> {
    if !alignment.valid_for(direction) {
        return Err(SynthError::Config(format!(
            "alignment '{}' is invalid for direction '{}'",
            alignment.as_str(),
            direction.as_str()
        )));
    }

    let mut out = Vec::with_capacity(line_sizes.len());
    let mut cursor = 0.0f64;
    for &(w, h) in line_sizes {
        if direction.is_horizontal() {
            let dx = match alignment {
                TextAlignment::Left => 0.0,
                TextAlignment::Right => (total.0.saturating_sub(w)) as f32,
                _ => (total.0.saturating_sub(w)) as f32 / 2.0,
            };
            out.push((dx, cursor as f32));
            cursor += h as f64 * spacing.max(0.1);
        } else {
            let dy = match alignment {
                TextAlignment::Top => 0.0,
                TextAlignment::Bottom => (total.1.saturating_sub(h)) as f32,
                _ => (total.1.saturating_sub(h)) as f32 / 2.0,
            };
            out.push((cursor as f32, dy));
            cursor += w as f64 * spacing.max(0.1);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_is_unchanged() {
        let lines = break_into_lines("Hello world", 1, LineBreakMode::Word);
        assert_eq!(lines, vec!["Hello world"]);
    }

    #[test]
    fn empty_text_gives_one_empty_line() {
        let lines = break_into_lines("", 3, LineBreakMode::Character);
        assert_eq!(lines, vec![String::new()]);
    }

    #[test]
    fn word_break_two_lines() {
        let lines = break_into_lines("Hello world testing", 2, LineBreakMode::Word);
        assert_eq!(lines, vec!["Hello world", "testing"]);
    }

    #[test]
    fn word_break_never_splits_words() {
        let lines = break_into_lines("alpha beta gamma delta epsilon", 3, LineBreakMode::Word);
        assert_eq!(lines.len(), 3);
        for line in &lines {
            for word in line.split(' ') {
                assert!(
                    ["alpha", "beta", "gamma", "delta", "epsilon"].contains(&word),
                    "split word {word:?}"
                );
            }
        }
    }

    #[test]
    fn word_break_with_fewer_words_than_lines() {
        let lines = break_into_lines("one two", 4, LineBreakMode::Word);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn character_break_distributes_evenly() {
        let lines = break_into_lines("abcdefg", 3, LineBreakMode::Character);
        // 7 chars over 3 lines: remainder lands on earlier lines.
        assert_eq!(lines, vec!["abc", "de", "fg"]);
    }

    #[test]
    fn horizontal_dimensions_accumulate_height() {
        let sizes = [(100, 40), (60, 40)];
        let (w, h) = multiline_dimensions(&sizes, 1.5, Direction::Ltr);
        assert_eq!(w, 100);
        assert_eq!(h, 100); // 40 * 1.5 + 40
    }

    #[test]
    fn vertical_dimensions_accumulate_width() {
        let sizes = [(40, 200), (40, 160)];
        let (w, h) = multiline_dimensions(&sizes, 1.0, Direction::Ttb);
        assert_eq!(w, 80);
        assert_eq!(h, 200);
    }

    #[test]
    fn center_alignment_centers_short_lines() {
        let sizes = [(100, 40), (60, 40)];
        let total = multiline_dimensions(&sizes, 1.2, Direction::Ltr);
        let positions =
            line_positions(&sizes, total, 1.2, TextAlignment::Center, Direction::Ltr).unwrap();
        assert_eq!(positions[0].0, 0.0);
        assert_eq!(positions[1].0, 20.0);
        assert!(positions[1].1 > positions[0].1);
    }

    #[test]
    fn invalid_alignment_is_config_error() {
        let sizes = [(10, 10)];
        let err = line_positions(&sizes, (10, 10), 1.0, TextAlignment::Top, Direction::Ltr);
        assert!(err.is_err());
    }
}
