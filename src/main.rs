//! Zone statistics batch job
//!
//! Reads the trip CSV and zone directory, computes statistics for every zone
//! plus the city-wide record, and writes the store as one JSON file.
//!
//! Usage:
//!   cargo run --release --bin nyc_zone_stats -- [OPTIONS]

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use nyc_zone_stats::builder::{BuildOptions, StoreBuilder};
use nyc_zone_stats::dataset::TripDataset;
use nyc_zone_stats::engine::{EngineConfig, ZoneStatsEngine, DEFAULT_TOP_DESTINATIONS};
use nyc_zone_stats::zone_directory::ZoneDirectory;
use tracing::info;

/// Precompute per-zone ride statistics for the dashboard
#[derive(Parser, Debug)]
#[command(name = "nyc_zone_stats")]
#[command(about = "Build the per-zone ride statistics store")]
struct Args {
    /// Trip CSV path
    #[arg(long, default_value = "raw-data/trips.csv")]
    trips: PathBuf,

    /// Zone directory JSON path
    #[arg(long, default_value = "aux_data/zone.json")]
    zones: PathBuf,

    /// Output store path
    #[arg(long, default_value = "aux_data/zone_data.json")]
    output: PathBuf,

    /// Worker threads (default: one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Number of ranked destinations per zone
    #[arg(long, default_value_t = DEFAULT_TOP_DESTINATIONS)]
    top_k: usize,

    /// Mean fare reported for weekday/hour cells without trips
    #[arg(long, default_value_t = 0.0)]
    empty_fare: f64,
}

fn main() -> Result<()> {
    nyc_zone_stats::init_tracing();
    let args = Args::parse();
    let start = Instant::now();

    let directory = ZoneDirectory::load(&args.zones)
        .with_context(|| format!("loading zone directory {:?}", args.zones))?;
    let dataset = TripDataset::load_csv(&args.trips)
        .with_context(|| format!("loading trips {:?}", args.trips))?;

    let config = EngineConfig {
        top_k: args.top_k,
        empty_fare_fallback: args.empty_fare,
        ..EngineConfig::default()
    };
    let engine = ZoneStatsEngine::new(&dataset, &directory, config)?;
    let builder = StoreBuilder::new(
        engine,
        BuildOptions {
            threads: args.threads,
        },
    );

    let store = builder.build_all().context("building zone statistics")?;
    store
        .write_atomic(&args.output)
        .with_context(|| format!("writing store {:?}", args.output))?;

    let city = store.aggregate();
    info!(
        "Done in {:.2}s: {} records, {} trips city-wide",
        start.elapsed().as_secs_f64(),
        store.len(),
        city.trip_count
    );

    Ok(())
}
