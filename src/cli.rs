// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `conductor`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "conductor",
    version,
    about = "Run several commands side by side, restarting and chaining them.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Conductor.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CONDUCTOR_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load, validate and link the group, print it, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Forward lines typed on this terminal to the named process's stdin.
    #[arg(long, value_name = "NAME")]
    pub stdin_to: Option<String>,
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
