//! Binary entry point for kinship.
//!
//! This binary provides the CLI interface for the kinship record keeper.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use clap::{Parser, Subcommand};
use kinship::cli::{cmd_diff, cmd_export, cmd_import, cmd_link, cmd_status, ApplyMode, LinkKind};
use kinship::observability::{init_logging, LoggingConfig};
use kinship::KinshipConfig;
use std::path::PathBuf;
use std::process::ExitCode;

/// Kinship - a genealogy record keeper with portable archive synchronization.
#[derive(Parser)]
#[command(name = "kinship")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "KINSHIP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Merge a snapshot archive into the record store.
    Import {
        /// Path to the archive.
        archive: PathBuf,

        /// Unattended conflict decision (prompts when omitted).
        #[arg(long, value_enum)]
        apply: Option<ApplyMode>,

        /// Ids to apply with `--apply selected` (comma-separated).
        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,
    },

    /// Serialize the record store into a snapshot archive.
    Export {
        /// Destination path for the archive.
        dest: PathBuf,

        /// Only export these ids (comma-separated; default: everyone).
        #[arg(long, value_delimiter = ',')]
        ids: Vec<String>,
    },

    /// Preview an archive against the store without writing.
    Diff {
        /// Path to the archive.
        archive: PathBuf,
    },

    /// Show record store statistics.
    Status,

    /// Edit a family relation; the paired edge is maintained automatically.
    Link {
        /// The relation to edit.
        #[arg(value_enum)]
        kind: LinkKind,

        /// First person id (the child, for father/mother).
        a: String,

        /// Second person id (ignored when removing a parent).
        b: String,

        /// Remove the relation instead of adding it.
        #[arg(long)]
        remove: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(LoggingConfig::new().with_verbose(cli.verbose));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => KinshipConfig::load_from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => KinshipConfig::load_default(),
    };

    match cli.command {
        Commands::Import {
            archive,
            apply,
            select,
        } => {
            let report = cmd_import(&config, &archive, apply, &select)?;
            if !report.ok() {
                anyhow::bail!("import cancelled");
            }
        },
        Commands::Export { dest, ids } => cmd_export(&config, &dest, &ids)?,
        Commands::Diff { archive } => cmd_diff(&config, &archive)?,
        Commands::Status => cmd_status(&config)?,
        Commands::Link { kind, a, b, remove } => cmd_link(&config, kind, &a, &b, remove)?,
    }
    Ok(())
}
