//! souschefd: the souschef HTTP daemon.
//!
//! Serves ingredient recognition and recipe suggestion over HTTP.

use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use souschef::server::config::{Config, Secrets};
use souschef::server::{AppState, router};

/// souschef daemon: generative recipe and ingredient service.
#[derive(Parser)]
#[command(name = "souschefd")]
#[command(version)]
#[command(about = "souschef recipe and ingredient service")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "SOUSCHEF_CONFIG")]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;

    let addr: SocketAddr = config.server.address.parse().map_err(|e| {
        souschef::SouschefError::Configuration(format!("Invalid address: {e}"))
    })?;

    let state = AppState::from_config(&config, &secrets).await?;
    let app = router(state);

    info!(version = env!("CARGO_PKG_VERSION"), %addr, "souschefd starting");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("souschefd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
