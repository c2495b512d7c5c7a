//! CLI argument definitions.
//!
//! All Clap derive structs for greenwave command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// Adaptive traffic-signal control agent.
#[derive(Parser, Debug)]
#[command(name = "greenwave", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "GREENWAVE_COLOR")]
    pub color: ColorChoice,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the signal control agent.
    Run(RunArgs),

    /// Validate a configuration file without starting the agent.
    Validate(ValidateArgs),

    /// Display version information.
    Version,
}

// ============================================================================
// Run
// ============================================================================

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the YAML configuration file.
    #[arg(short, long, env = "GREENWAVE_CONFIG")]
    pub config: PathBuf,

    /// Override the detector listener address (`host:port`).
    #[arg(long)]
    pub listen: Option<String>,

    /// Override the controller address (`host:port`).
    #[arg(long)]
    pub controller: Option<String>,

    /// Expose Prometheus metrics on `127.0.0.1:<port>`.
    #[arg(long)]
    pub metrics_port: Option<u16>,

    /// Emit logs as newline-delimited JSON.
    #[arg(long)]
    pub log_json: bool,

    /// Emit the structured event stream as JSONL on stderr.
    #[arg(long)]
    pub events: bool,
}

// ============================================================================
// Validate
// ============================================================================

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the YAML configuration file.
    #[arg(short, long, env = "GREENWAVE_CONFIG")]
    pub config: PathBuf,
}

// ============================================================================
// Shared value enums
// ============================================================================

/// Color output control.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Color when stderr is a terminal and `NO_COLOR` is unset.
    #[default]
    Auto,
    /// Always color.
    Always,
    /// Never color.
    Never,
}
