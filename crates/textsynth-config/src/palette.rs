// this_file: crates/textsynth-config/src/palette.rs

//! Built-in named palettes for text color configuration.

use crate::types::RgbTriple;

const BLACK: [RgbTriple; 1] = [[0, 0, 0]];

const INK: [RgbTriple; 4] = [[10, 10, 12], [28, 28, 34], [16, 24, 48], [40, 32, 28]];

const DARK: [RgbTriple; 5] = [
    [20, 20, 20],
    [48, 48, 48],
    [32, 16, 16],
    [16, 32, 16],
    [16, 16, 40],
];

const LIGHT: [RgbTriple; 4] = [
    [235, 235, 235],
    [250, 245, 230],
    [220, 230, 245],
    [245, 225, 225],
];

const PRIMARY: [RgbTriple; 6] = [
    [180, 30, 30],
    [30, 140, 40],
    [30, 60, 180],
    [200, 140, 20],
    [120, 40, 140],
    [20, 130, 130],
];

/// Look up a named palette. Unknown names are a validation error.
pub fn lookup(name: &str) -> Option<&'static [RgbTriple]> {
    match name {
        "black" => Some(&BLACK),
        "ink" => Some(&INK),
        "dark" => Some(&DARK),
        "light" => Some(&LIGHT),
        "primary" => Some(&PRIMARY),
        _ => None,
    }
}

/// Names of every built-in palette, for error messages and `info` output.
pub fn names() -> &'static [&'static str] {
    &["black", "ink", "dark", "light", "primary"]
}
