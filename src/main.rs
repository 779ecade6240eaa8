//! intent CLI entry point.

use anyhow::Result;
use clap::Parser;

use intent_inference::cli::{handle_error, Cli, Commands};
use intent_inference::domain::models::Config;
use intent_inference::infrastructure::{ConfigLoader, LogConfig, LoggerImpl};

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    // Held until exit so buffered file logs are flushed.
    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Infer(args) => {
            intent_inference::cli::commands::infer::execute(args, config, cli.json).await
        }
        Commands::Config(command) => {
            intent_inference::cli::commands::config::execute(command, config, cli.json).await
        }
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
