//! Live points-auction service
//!
//! Initializes all components, starts the auction engine and gateway, and
//! provides graceful shutdown handling.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use auction_service::{
    graceful_shutdown, initialize_logging, load_configuration, setup_signal_handlers, ServiceState,
};

#[derive(Parser)]
#[command(name = "auction-service")]
#[command(about = "Live points-auction platform", version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_configuration(cli.config.as_deref()).context("failed to load configuration")?;
    initialize_logging(&config.logging)?;

    info!("starting auction service v{}", env!("CARGO_PKG_VERSION"));

    let service_state = Arc::new(ServiceState::new(config)?);
    info!("service state initialized");

    let mut shutdown_signal = setup_signal_handlers()?;
    info!("signal handlers configured");

    let gateway_handle = {
        let state = service_state.clone();
        tokio::spawn(async move {
            if let Err(e) = state.start_gateway().await {
                error!("gateway failed: {}", e);
            }
        })
    };

    info!("auction service is running; press Ctrl+C to shut down");
    let _ = shutdown_signal.recv().await;

    info!("shutdown signal received");
    graceful_shutdown(service_state, gateway_handle).await?;

    info!("auction service shutdown complete");
    Ok(())
}
