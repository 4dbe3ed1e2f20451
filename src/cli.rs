// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `geoflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "geoflow",
    version,
    about = "Run geospatial analysis workflows as dependency-ordered tasks.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Geoflow.toml` in the current working directory. When the
    /// default file does not exist, built-in defaults are used.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Process eligible tasks until none remain, then exit. No HTTP server.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `GEOFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate config and workflow definition, print the task graph, and
    /// execute nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Create a workflow from the configured definition with the GeoJSON in
    /// this file, print its id and exit.
    #[arg(long, value_name = "PAYLOAD_FILE", requires = "client_id")]
    pub submit: Option<PathBuf>,

    /// Client identifier for `--submit`.
    #[arg(long, value_name = "ID")]
    pub client_id: Option<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
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
