//! host-validate CLI tool.
//!
//! Usage:
//! ```bash
//! host-validate [OPTIONS] [DRIVER]
//! ```
//!
//! Loads every `*.yaml` rule document from the rules directory, merges
//! them into a single fact list and evaluates it against this host.
//! Exit status: 0 when every check passes, 1 on load or evaluation
//! errors, 2 when any fact misses its expected value.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use host_validate_core::{load_file, Engine, FactList, OutputMode};
use tracing_subscriber::EnvFilter;

/// Validate this host against declarative fact rules
#[derive(Parser)]
#[command(name = "host-validate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Show raw fact names and values as they are set
    #[arg(short = 'f', long)]
    show_facts: bool,

    /// Don't report on fact checks
    #[arg(short, long)]
    quiet: bool,

    /// Directory to load validation rules from
    #[arg(short, long, default_value = "/usr/share/libvirt/host-validate")]
    rules_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Restrict validation to a single virtualization driver
    driver: Option<String>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(0) => std::process::exit(0),
        Ok(failed) => {
            tracing::debug!("{failed} fact(s) failed validation");
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("host-validate: {e:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<u64> {
    let paths = rule_files(&cli.rules_dir)
        .with_context(|| format!("unable to load rules from '{}'", cli.rules_dir.display()))?;

    let mut lists = Vec::with_capacity(paths.len());
    for path in &paths {
        let facts = load_file(path)
            .with_context(|| format!("unable to load facts from '{}'", path.display()))?;
        lists.push(facts);
    }
    let facts = FactList::merge(lists);

    tracing::debug!(
        "loaded {} facts from {} rule file(s)",
        facts.len(),
        paths.len()
    );

    let output = OutputMode {
        show_facts: cli.show_facts,
        show_reports: !cli.quiet,
    };
    let mut engine = Engine::new(output, cli.driver.clone());
    engine.validate(facts).context("unable to validate facts")
}

/// Enumerates `*.yaml` rule documents in `dir`, non-recursively, in
/// name order so merge order is deterministic.
fn rule_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "yaml") && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
