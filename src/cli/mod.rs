//! CLI module for AURA
//!
//! Provides commands:
//! - `run`: execute an assembly on the simulated cell
//! - `validate`: load and check an assembly graph
//! - `metrics`: per-step analytics for an assembly

use crate::app::AppConfig;
use clap::{Args, Parser, Subcommand};

pub mod metrics;
pub mod run;
pub mod validate;

/// AURA assembly execution engine CLI
#[derive(Parser, Debug)]
#[command(name = "aura")]
#[command(about = "Robotic assembly execution engine")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute an assembly
    Run(RunArgs),
    /// Validate an assembly graph
    Validate {
        /// Graph file or assembly id
        graph: String,
    },
    /// Show per-step analytics
    Metrics {
        /// Assembly id
        assembly_id: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Graph file or assembly id
    pub graph: String,
    /// Simulate every step instead of dispatching it
    #[arg(long)]
    pub demo: bool,
    /// Make the first N calls of every primitive fail
    #[arg(long)]
    pub fail_first: Option<u32>,
    /// Print every state snapshot as a JSON line
    #[arg(long)]
    pub json_events: bool,
}

/// Run the CLI command
pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Run(args)) => run::run(config, args).await,
        Some(Commands::Validate { graph }) => validate::run(&config, &graph),
        Some(Commands::Metrics { assembly_id, json }) => {
            metrics::run(&config, &assembly_id, json).await
        }
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}
