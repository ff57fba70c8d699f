//! frd-ingest service entry point
//!
//! Loads configuration, wires connectors and stores, and serves the review
//! API until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use frd_common::config::TomlConfig;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use frd_ingest::{build_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "frd-ingest")]
#[command(about = "Review ingestion and query service")]
#[command(version)]
struct Args {
    /// Configuration file (default: <config dir>/flex-reviews/frd-ingest.toml)
    #[arg(short, long, env = "FRD_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long, env = "FRD_HOST")]
    host: Option<String>,

    /// Listen port
    #[arg(short, long, env = "FRD_PORT")]
    port: Option<u16>,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "FRD_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.apply_env_overrides();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    let default_filter = format!("frd_ingest={0},frd_common={0},tower_http=info", config.logging.level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    source.log();

    info!(
        "Starting frd-ingest v{} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if config.hostaway.client_id.is_empty() || config.hostaway.client_secret.is_empty() {
        warn!("Review provider credentials not configured, serving seed data only");
    }
    if config.places_api_key().is_none() && !config.places.sources.is_empty() {
        warn!(
            sources = config.places.sources.len(),
            "Place sources configured without an API key, they will return no reviews"
        );
    }

    let state = AppState::from_config(&config)
        .await
        .context("Failed to initialize service state")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .context("Failed to bind to address")?;
    let addr: SocketAddr = listener.local_addr().context("Failed to read listen address")?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
