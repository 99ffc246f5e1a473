//! AURA - Robotic assembly execution engine
//!
//! CLI entry point.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let config = app::load_config()?;
    let json = config.logging.is_json();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    let cli = cli::Cli::parse();

    if cli.command.is_some() {
        info!("Starting AURA v{}", env!("CARGO_PKG_VERSION"));
        debug!(
            assemblies_dir = %config.data.assemblies_dir.display(),
            analytics_backend = %config.data.analytics_backend,
            "Configuration loaded"
        );
    }

    cli::run(cli, config).await
}
