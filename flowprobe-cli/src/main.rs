//! flowprobe CLI -- compile and inspect network flow feature specifications

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use flowprobe_core::config::FlowprobeConfig;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = match (load_config(&cli.config).await, &cli.command) {
        (Ok(config), _) => config,
        // `config validate` reports load failures itself
        (Err(_), Commands::Config(_)) => FlowprobeConfig::default(),
        (Err(e), _) => return Err(e),
    };
    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
        config
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
    }

    logging::init_tracing(&config.general)?;
    tracing::debug!(config = %cli.config.display(), "flowprobe-cli starting");

    let writer = OutputWriter::new(cli.output);
    match cli.command {
        Commands::Compile(args) => commands::compile::execute(args, &config, &writer).await,
        Commands::Features(args) => commands::features::execute(args, &writer),
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    }
}

/// Load the configuration file, falling back to defaults when it does not exist.
async fn load_config(path: &Path) -> Result<FlowprobeConfig, CliError> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(FlowprobeConfig::load(path).await?);
    }
    let mut config = FlowprobeConfig::default();
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}
