// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `depjobs`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "depjobs",
    version,
    about = "Run a dependency graph of jobs concurrently, each job after all of its upstream jobs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the graph document (YAML, or JSON with a `.json` extension).
    #[arg(long, value_name = "PATH")]
    pub graph: PathBuf,

    /// Path to the runner settings (TOML).
    ///
    /// Default: `Depjobs.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Number of scheduling cycles; overrides `[cycle].count`.
    ///
    /// `0` keeps cycling until Ctrl+C.
    #[arg(long, value_name = "N")]
    pub cycles: Option<u32>,

    /// Write the loaded graph back out to this path before running.
    #[arg(long, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DEPJOBS_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the graph, but don't run any job.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
