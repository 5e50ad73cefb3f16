// this_file: crates/textsynth-export/src/lib.rs

//! Output codecs for textsynth: PNG images and JSON label records.

pub mod json;
pub mod png;

pub use json::{encode_label, write_label};
pub use png::{encode_png, load_image};
