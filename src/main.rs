//! # vif
//!
//! **vif** pins the state of git-backed dependencies declared in a version
//! information file.
//!
//! - `vif --file deps.yaml` clones or updates every dependency and reports
//!   the revision each one ended up at
//! - `--no-update` only re-inspects working copies already on disk
//! - `--output-file` writes the resolved manifest back out
//! - `--print-version <name>` prints one dependency's resolved revision
//!
//! The exit status is non-zero if any dependency failed; failures are
//! reported per dependency and never abort the rest of the batch.
//!
//! This CLI is built with [clap](https://docs.rs/clap).

use anyhow::{Result, bail};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use vif::{Git2Backend, Manifest, inspect_all, reconcile_all};

/// Command-line interface definition.
///
/// Parsed using `clap` derive macros.
#[derive(Parser, Debug)]
#[command(
    name = "vif",
    version,
    about = "resolve, fetch and pin git-backed dependencies from a version information file"
)]
struct Cli {
    /// Input manifest file
    #[arg(long, short = 'f')]
    file: PathBuf,

    /// Root directory holding the working copies (defaults to the current directory)
    #[arg(long, short = 'C', value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Skip reconciliation; only re-inspect working copies already on disk
    #[arg(long)]
    no_update: bool,

    /// Write the resolved manifest to this file
    #[arg(long, value_name = "PATH")]
    output_file: Option<PathBuf>,

    /// Print the resolved revision of one dependency and suppress progress output
    #[arg(long, value_name = "NAME")]
    print_version: Option<String>,
}

/// CLI entry point.
///
/// Loads the manifest, reconciles (or merely inspects) every dependency,
/// then performs the requested output actions. A manifest that cannot be
/// parsed is fatal; individual dependency failures are collected and
/// reported at the end.
fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let root = match cli.directory {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let quiet = cli.print_version.is_some();

    let mut manifest = Manifest::load(&cli.file)?;
    let vcs = Git2Backend;
    let outcomes = if cli.no_update {
        inspect_all(&mut manifest, &root, &vcs)
    } else {
        reconcile_all(&mut manifest, &root, &vcs, quiet)
    };

    if let Some(path) = &cli.output_file {
        manifest.save(path)?;
    }
    if let Some(name) = &cli.print_version {
        println!("{}", manifest.lookup_resolved_version(name));
    }

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        for o in &outcomes {
            if let Err(e) = &o.result {
                eprintln!("{} {}", "✘".red(), e);
            }
        }
        bail!("{failed} of {} dependencies failed", outcomes.len());
    }
    Ok(())
}
