//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "intent")]
#[command(about = "Turn free-text scraping requests into validated specifications", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .intent/config.yaml)
    #[arg(short, long, global = true, env = "INTENT_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Infer a specification from a request and review it
    Infer(InferArgs),

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug, Clone)]
pub struct InferArgs {
    /// Scraping request in plain language
    pub query: String,

    /// Use local heuristics instead of the inference API
    #[arg(long)]
    pub offline: bool,

    /// Override the validation round budget
    #[arg(short, long)]
    pub max_iterations: Option<u32>,

    /// Approve the first specification that reaches review
    #[arg(short = 'y', long)]
    pub auto_approve: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
}
