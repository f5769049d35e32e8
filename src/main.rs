//! route-registrar server binary.

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use route_registrar::config::{load_config, ServerConfig};
use route_registrar::lifecycle::{build_application, wait_for_signal};
use route_registrar::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "route-registrar")]
#[command(about = "Typed route registration server", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "route-registrar starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        max_body_bytes = config.limits.max_body_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let app = build_application(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    app.run(listener, wait_for_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
