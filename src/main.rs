//! Main entry point for the vision-sync CLI

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;
use vision_sync::cli::{Cli, Commands};
use vision_sync::metrics::init_metrics;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vision_sync=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr {
        if let Err(e) = init_metrics(addr).await {
            error!("Failed to start metrics exporter: {}", e);
            std::process::exit(1);
        }
    }

    let result = match cli.command {
        Commands::Discover(ref args) => args.execute(&cli).await.map_err(|e| anyhow::anyhow!(e)),
        Commands::Download(ref args) => args.execute(&cli).await.map_err(|e| anyhow::anyhow!(e)),
        Commands::Sync(ref args) => args.execute(&cli).await.map_err(|e| anyhow::anyhow!(e)),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}
