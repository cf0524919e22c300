//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// flowprobe -- network flow feature compiler.
///
/// Use `flowprobe <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "flowprobe", version, about, long_about = None)]
pub struct Cli {
    /// Path to the flowprobe.toml configuration file.
    #[arg(short, long, default_value = "flowprobe.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a feature specification and show the resulting program.
    Compile(CompileArgs),

    /// List the built-in feature catalog.
    Features(FeaturesArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- compile ----

/// Compile a feature specification.
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Specification file (default: `spec.path` from the configuration).
    pub spec: Option<PathBuf>,
}

// ---- features ----

/// List catalog entries.
#[derive(Args, Debug)]
pub struct FeaturesArgs {
    /// Show only entries with this name.
    #[arg(long)]
    pub name: Option<String>,
}

// ---- config ----

/// Manage flowprobe configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, compiler, spec).
        #[arg(long)]
        section: Option<String>,
    },
}
