// this_file: crates/textsynth-cli/src/main.rs

//! Textsynth CLI - generate labeled OCR training images.
//!
//! Exit codes: 0 all targets met, 2 validation failure, 3 partial
//! generation, 4 cancelled, 1 unexpected error.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, GenerateArgs, InspectArgs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use textsynth::{RunOptions, Scheduler};
use textsynth_config::{
    load_config, load_config_strict, resolve_patterns, validate, GeneratorConfig, ResourceRoots,
};
use textsynth_core::{ResourceKind, SynthError};
use textsynth_fontdb::SkrifaEngine;

const EXIT_OK: i32 = 0;
const EXIT_UNEXPECTED: i32 = 1;
const EXIT_VALIDATION: i32 = 2;

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .parse_filters(&cli.log_level)
        .init();

    let code = match cli.command {
        Commands::Generate(args) => generate(*args),
        Commands::Validate(args) => inspect(args, false),
        Commands::Info(args) => inspect(args, true),
    };
    std::process::exit(code);
}

fn load(path: &std::path::Path, strict: bool) -> Result<GeneratorConfig, SynthError> {
    if strict {
        load_config_strict(path)
    } else {
        load_config(path)
    }
}

fn roots_from(
    font_dir: Option<std::path::PathBuf>,
    background_dir: Option<std::path::PathBuf>,
    corpus_dir: Option<std::path::PathBuf>,
) -> ResourceRoots {
    ResourceRoots {
        fonts: font_dir,
        backgrounds: background_dir,
        corpora: corpus_dir,
    }
}

fn inspect(args: InspectArgs, show_resources: bool) -> i32 {
    let config = match load(&args.config, args.strict) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return EXIT_VALIDATION;
        }
    };
    let roots = roots_from(args.font_dir, args.background_dir, args.corpus_dir);

    let report = validate(&config, &roots);
    if !report.is_ok() {
        eprintln!("configuration invalid:\n{report}");
        return EXIT_VALIDATION;
    }

    if show_resources {
        print_resources(&config, &roots);
    } else {
        println!(
            "configuration valid: {} images across {} specs",
            config.total_images,
            config.specs.len()
        );
    }
    EXIT_OK
}

fn print_resources(config: &GeneratorConfig, roots: &ResourceRoots) {
    for spec in &config.specs {
        println!("[{}] proportion {}", spec.name, spec.proportion);
        let pools = [
            ("fonts", &spec.fonts, roots.fonts.as_deref(), ResourceKind::Font),
            ("corpus", &spec.corpus, roots.corpora.as_deref(), ResourceKind::Corpus),
            (
                "backgrounds",
                &spec.backgrounds,
                roots.backgrounds.as_deref(),
                ResourceKind::Background,
            ),
        ];
        for (label, patterns, base, kind) in pools {
            match resolve_patterns(base, patterns, kind) {
                Ok(files) => {
                    println!("  {label}: {} files", files.len());
                    for f in files.iter().take(5) {
                        println!("    {} (weight {})", f.path.display(), f.weight);
                    }
                    if files.len() > 5 {
                        println!("    ... and {} more", files.len() - 5);
                    }
                }
                Err(e) => println!("  {label}: error: {e}"),
            }
        }
    }
}

fn generate(args: GenerateArgs) -> i32 {
    let mut config = match load(&args.config, args.strict) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return EXIT_VALIDATION;
        }
    };

    // CLI overrides beat the document's runtime section.
    if let Some(seed) = args.seed_override {
        config.seed = Some(seed);
    }
    if let Some(workers) = args.generation_workers {
        config.runtime.generation_workers = workers;
    }
    if let Some(io_workers) = args.io_workers {
        config.runtime.io_workers = io_workers;
    }
    if let Some(chunk_size) = args.chunk_size {
        config.runtime.chunk_size = chunk_size;
    }
    if let Some(io_batch_size) = args.io_batch_size {
        config.runtime.io_batch_size = io_batch_size;
    }
    if let Some(budget) = args.time_budget_secs {
        config.runtime.time_budget_secs = Some(budget);
    }
    if args.persist_health {
        config.runtime.persist_health = true;
    }

    let roots = roots_from(args.font_dir, args.background_dir, args.corpus_dir);
    let report = validate(&config, &roots);
    if !report.is_ok() {
        eprintln!("configuration invalid:\n{report}");
        return EXIT_VALIDATION;
    }

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            log::warn!("interrupt received; finishing in-flight tasks");
            cancel.store(true, Ordering::SeqCst);
        }) {
            log::warn!("could not install interrupt handler: {e}");
        }
    }

    let engine = Arc::new(SkrifaEngine::new());
    let mut scheduler = match Scheduler::new(config, &roots, engine, cancel) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            eprintln!("startup failed: {e}");
            return exit_code_for(&e);
        }
    };

    let options = RunOptions {
        output_dir: args.output_dir,
        resume: args.resume,
    };
    match scheduler.run(&options) {
        Ok(summary) => summary.exit_code(),
        Err(e) => {
            eprintln!("generation failed: {e}");
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &SynthError) -> i32 {
    match error {
        SynthError::Config(_) | SynthError::ResourceMissing { .. } => EXIT_VALIDATION,
        _ => EXIT_UNEXPECTED,
    }
}
