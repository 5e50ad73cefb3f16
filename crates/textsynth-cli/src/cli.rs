// this_file: crates/textsynth-cli/src/cli.rs

//! CLI argument definitions using Clap v4.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Textsynth - labeled OCR training images from the command line
#[derive(Parser, Debug)]
#[command(name = "textsynth")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Logging level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a batch of images and labels
    #[command(alias = "g")]
    Generate(Box<GenerateArgs>),

    /// Validate a configuration file and exit
    #[command(alias = "v")]
    Validate(InspectArgs),

    /// Show resolved fonts, corpora and backgrounds per spec
    #[command(alias = "i")]
    Info(InspectArgs),
}

/// Arguments for the generate command
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Configuration file (YAML)
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,

    /// Directory for images, labels and the checkpoint
    #[arg(short = 'o', long = "output-dir", default_value = "output")]
    pub output_dir: PathBuf,

    /// Base directory for relative font selectors
    #[arg(long = "font-dir")]
    pub font_dir: Option<PathBuf>,

    /// Base directory for relative background selectors
    #[arg(long = "background-dir")]
    pub background_dir: Option<PathBuf>,

    /// Base directory for relative corpus selectors
    #[arg(long = "corpus-dir")]
    pub corpus_dir: Option<PathBuf>,

    /// Worker threads for planning and rendering (0 = one per core)
    #[arg(short = 'j', long = "generation-workers")]
    pub generation_workers: Option<usize>,

    /// Threads writing images and labels
    #[arg(long = "io-workers")]
    pub io_workers: Option<usize>,

    /// Tasks per streaming chunk
    #[arg(long = "chunk-size")]
    pub chunk_size: Option<usize>,

    /// Outputs flushed per I/O batch
    #[arg(long = "io-batch-size")]
    pub io_batch_size: Option<usize>,

    /// Skip indices already present in the checkpoint
    #[arg(long)]
    pub resume: bool,

    /// Override the master seed from the configuration
    #[arg(long = "seed-override")]
    pub seed_override: Option<u64>,

    /// Persist font/background health snapshots in the output directory
    #[arg(long = "persist-health")]
    pub persist_health: bool,

    /// Reject unknown configuration keys
    #[arg(long)]
    pub strict: bool,

    /// Wall-clock budget in seconds; submission stops when exceeded
    #[arg(long = "time-budget-secs")]
    pub time_budget_secs: Option<u64>,
}

/// Arguments shared by validate and info
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Configuration file (YAML)
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,

    /// Base directory for relative font selectors
    #[arg(long = "font-dir")]
    pub font_dir: Option<PathBuf>,

    /// Base directory for relative background selectors
    #[arg(long = "background-dir")]
    pub background_dir: Option<PathBuf>,

    /// Base directory for relative corpus selectors
    #[arg(long = "corpus-dir")]
    pub corpus_dir: Option<PathBuf>,

    /// Reject unknown configuration keys
    #[arg(long)]
    pub strict: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_with_overrides() {
        let cli = Cli::try_parse_from([
            "textsynth",
            "generate",
            "--config",
            "batch.yaml",
            "--output-dir",
            "/tmp/out",
            "-j",
            "8",
            "--chunk-size",
            "50",
            "--resume",
            "--seed-override",
            "99",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.config, PathBuf::from("batch.yaml"));
                assert_eq!(args.generation_workers, Some(8));
                assert_eq!(args.chunk_size, Some(50));
                assert!(args.resume);
                assert_eq!(args.seed_override, Some(99));
            }
            other => panic!("wrong command: {other:?}"),
        }
    }

    #[test]
    fn validate_alias_works() {
        let cli = Cli::try_parse_from(["textsynth", "v", "-c", "batch.yaml"]).unwrap();
        assert!(matches!(cli.command, Commands::Validate(_)));
    }

    #[test]
    fn log_level_is_global() {
        let cli = Cli::try_parse_from([
            "textsynth",
            "info",
            "-c",
            "batch.yaml",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
    }
}
