//! One-shot coverage analysis.
//!
//! Loads the configured datasets, runs a single coverage computation and
//! writes the full response as JSON.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use desserte::config::Config;
use desserte::{compute_coverage, CoverageRequest, GeoJsonFileSource};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "analyze")]
#[command(about = "Compute transit coverage once and write it as JSON")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "desserte.toml")]
    config: PathBuf,

    /// Stop buffer radius in meters (defaults to the configured one)
    #[arg(short, long)]
    radius: Option<f64>,

    /// Line buffer radius in meters, enables the two-tier classification
    #[arg(long)]
    line_radius: Option<f64>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Logs go to stderr so that stdout can carry the JSON
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = Config::load_from_file(&args.config)?;

    let request = CoverageRequest {
        radius_m: args.radius.unwrap_or(config.analysis.default_radius_m),
        line_radius_m: args.line_radius.or(config.analysis.default_line_radius_m),
    };

    let source =
        GeoJsonFileSource::load(config.datasets.clone()).context("Failed to load datasets")?;
    let response = compute_coverage(&source, &request, &config.engine_options())?;

    let stats = &response.stats;
    info!("Addresses: {}", stats.total_addresses);
    info!("Served by stop: {} ({}%)", stats.served_count, stats.pct_served);
    if let Some(near) = stats.near_line_count {
        info!("Near a line only: {}", near);
    }
    info!("Unserved: {}", stats.unserved_count);
    info!("Stops covered: {}/{}", stats.covered_stops, stats.total_stops);
    if let Some(km) = stats.covered_line_length_km {
        info!("Line length through the buffer: {} km", km);
    }
    if let Some(population) = stats.population_covered {
        info!("Population covered: {}", population);
    }
    for missing in &response.missing_datasets {
        info!("Missing dataset: {:?}", missing);
    }

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    serde_json::to_writer_pretty(&mut writer, &response)?;
    writeln!(writer)?;
    writer.flush()?;

    if let Some(path) = &args.output {
        info!("Wrote {}", path.display());
    }

    Ok(())
}
