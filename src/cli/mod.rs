//! CLI module for Plansmith
//!
//! Provides commands:
//! - `plan`: Run a planning task against several models
//! - `models`: List configured models and whether their keys are set

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

pub mod models;
pub mod plan;

/// Plansmith multi-model planner
#[derive(Parser, Debug)]
#[command(name = "plansmith")]
#[command(about = "Send one planning task to several LLMs and merge their plans")]
#[command(version)]
pub struct Cli {
    /// Configuration file layered over the defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a planning task
    Plan(PlanArgs),
    /// List configured models
    Models,
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Task description
    pub task: String,

    /// Files or directories to include as context
    #[arg(short, long = "file")]
    pub files: Vec<PathBuf>,

    /// Models to query (comma separated); defaults come from config
    #[arg(short, long, value_delimiter = ',')]
    pub models: Vec<String>,

    /// Model that merges the successful plans
    #[arg(short, long)]
    pub synthesis: Option<String>,

    /// Skip synthesis even if the config names a synthesis model
    #[arg(long, conflicts_with = "synthesis")]
    pub no_synthesis: bool,

    /// Directory plans are written to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Exit 0 when at least one model succeeded
    #[arg(long)]
    pub partial_success_ok: bool,

    /// Whole-run deadline in seconds (0 disables)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Only count prompt tokens per model
    #[arg(long)]
    pub dry_run: bool,

    /// Print the result as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = crate::app::loader::load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Plan(args) => plan::run(args, config).await,
        Commands::Models => models::run(&config),
    }
}
