//! HTTP server for transit coverage analysis.
//!
//! Serves the raw dataset layers for display and runs coverage computations
//! on demand against the file-backed datasets.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use desserte::config::Config;
use desserte::GeoJsonFileSource;

mod handlers;
use handlers::AppState;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "serve")]
#[command(about = "Transit coverage analysis server")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "desserte.toml")]
    config: PathBuf,

    /// Listen address, overrides the configured one
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Desserte coverage server");
    info!("Loading configuration from {}", args.config.display());

    let config = Config::load_from_file(&args.config)?;
    let listen = args.listen.unwrap_or_else(|| config.server.listen.clone());

    let source = GeoJsonFileSource::load(config.datasets.clone())
        .context("Failed to load datasets")?;
    let summary = source.summary();
    info!(
        "Datasets ready in {}: {} stops, lines: {}, addresses: {}",
        summary.crs,
        summary.stops.features,
        summary.lines.as_ref().map_or(0, |l| l.features),
        summary.addresses.as_ref().map_or(0, |a| a.features),
    );

    let state = Arc::new(AppState {
        source: RwLock::new(source),
        config,
    });

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/data/stops", get(handlers::stops))
        .route("/data/lines", get(handlers::lines))
        .route("/data/addresses", get(handlers::addresses))
        .route("/data/line_buffer", get(handlers::line_buffer))
        .route("/debug/datasets", get(handlers::datasets))
        .route("/compute_coverage", post(handlers::compute))
        .route("/admin/reload", post(handlers::reload))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", listen);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
