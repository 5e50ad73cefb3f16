// this_file: crates/textsynth-render/src/bidi.rs

//! Logical-to-visual reordering.
//!
//! The shaper always iterates the *visual* character sequence. For RTL
//! batches that sequence starts at the glyph displayed rightmost, so the
//! emitted box list reads in the natural direction of the script.

use textsynth_core::Direction;
use unicode_bidi::{BidiInfo, Level};

/// Reorder `text` into visual emission order for the given base
/// direction. Pure function: LTR and vertical directions pass through
/// unchanged; RTL applies the Unicode bidi algorithm and enumerates from
/// the rightmost displayed character.
pub fn to_visual(text: &str, direction: Direction) -> String {
    if direction != Direction::Rtl || text.is_empty() {
        return text.to_string();
    }

    let bidi = BidiInfo::new(text, Some(Level::rtl()));
    let Some(paragraph) = bidi.paragraphs.first() else {
        return text.to_string();
    };
    let display = bidi.reorder_line(paragraph, paragraph.range.clone());
    // reorder_line yields left-to-right display order; emission order for
    // an RTL base starts at the right edge.
    display.chars().rev().collect()
}
