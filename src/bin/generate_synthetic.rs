//! Synthetic trip generator
//!
//! Writes a trip CSV and a matching zone directory so the statistics job can
//! be run without the real taxi dataset. Zone popularity and pickup hours are
//! weighted so the resulting profiles look roughly like city traffic.
//!
//! Usage:
//!   cargo run --release --bin generate_synthetic -- [OPTIONS]
//!
//! Options:
//!   --zones <N>            Number of zones in the directory (default: 40)
//!   --trips <N>            Number of trips to generate (default: 200000)
//!   --seed <N>             Random seed for reproducibility (optional)
//!   --trips-output <PATH>  Trip CSV path (default: raw-data/trips.csv)
//!   --zones-output <PATH>  Zone directory path (default: aux_data/zone.json)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use clap::Parser;
use csv::WriterBuilder;
use nyc_zone_stats::models::{TripCsvRecord, ZoneId};
use nyc_zone_stats::zone_directory::ZoneDirectory;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::info;

/// Synthetic data generator for the zone statistics job
#[derive(Parser, Debug)]
#[command(name = "generate_synthetic")]
#[command(about = "Generate a synthetic trip dataset and zone directory")]
struct Args {
    /// Number of zones in the directory
    #[arg(long, default_value = "40")]
    zones: usize,

    /// Number of trips to generate
    #[arg(long, default_value = "200000")]
    trips: usize,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output trip CSV path
    #[arg(long, default_value = "raw-data/trips.csv")]
    trips_output: PathBuf,

    /// Output zone directory path
    #[arg(long, default_value = "aux_data/zone.json")]
    zones_output: PathBuf,
}

/// Taxi zone names used for the first synthetic ids
const ZONE_NAMES: &[&str] = &[
    "Newark Airport",
    "Jamaica Bay",
    "Allerton/Pelham Gardens",
    "Alphabet City",
    "Arden Heights",
    "Arrochar/Fort Wadsworth",
    "Astoria",
    "Astoria Park",
    "Auburndale",
    "Baisley Park",
    "Bath Beach",
    "Battery Park",
    "Battery Park City",
    "Bay Ridge",
    "Bay Terrace/Fort Totten",
    "Bayside",
    "Bedford",
    "Bedford Park",
    "Bellerose",
    "Belmont",
];

/// Relative pickup volume per hour of day
const HOUR_WEIGHTS: [u32; 24] = [
    30, 22, 15, 10, 8, 10, 25, 45, 60, 55, 48, 50, //
    55, 52, 54, 56, 58, 70, 85, 80, 72, 65, 55, 42,
];

fn zone_name(id: usize) -> String {
    ZONE_NAMES
        .get(id)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("Zone {}", id))
}

/// Format datetime for CSV output
fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Random pickup time during 2012 with weighted hour of day
fn pickup_time(start: NaiveDateTime, hours: &WeightedIndex<u32>, rng: &mut impl Rng) -> NaiveDateTime {
    let day = rng.gen_range(0..366);
    let hour = hours.sample(rng) as i64;
    let second = rng.gen_range(0..3600);
    start + Duration::days(day) + Duration::hours(hour) + Duration::seconds(second)
}

/// Fare grows with the id distance between zones, plus a night surcharge
fn fare(pickup: usize, dropoff: usize, hour: u32, rng: &mut impl Rng) -> f64 {
    let hops = pickup.abs_diff(dropoff) as f64;
    let surcharge = if !(6..20).contains(&hour) { 1.0 } else { 0.0 };
    let fare = 3.0 + hops * 1.75 + surcharge + rng.gen_range(0.0..6.0);
    (fare * 100.0).round() / 100.0
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    nyc_zone_stats::init_tracing();
    let args = Args::parse();
    anyhow::ensure!(args.zones > 0, "--zones must be at least 1");

    let mut rng: StdRng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    // Zipf-like popularity: a few busy zones, a long quiet tail
    let zone_weights: Vec<f64> = (0..args.zones).map(|i| 1.0 / (i as f64 + 1.0)).collect();
    let zones = WeightedIndex::new(&zone_weights)?;
    let hours = WeightedIndex::new(HOUR_WEIGHTS)?;

    let directory = ZoneDirectory::new((0..args.zones).map(|id| (id as ZoneId, zone_name(id))))?;
    ensure_parent(&args.zones_output)?;
    std::fs::write(&args.zones_output, directory.to_json()?)
        .with_context(|| format!("writing {:?}", args.zones_output))?;
    info!("Wrote {} zones to {:?}", directory.len(), args.zones_output);

    ensure_parent(&args.trips_output)?;
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(&args.trips_output)?;

    let start = NaiveDate::from_ymd_opt(2012, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .context("invalid start date")?;

    for i in 0..args.trips {
        let pickup = zones.sample(&mut rng);
        let dropoff = zones.sample(&mut rng);
        let when = pickup_time(start, &hours, &mut rng);
        let hour = chrono::Timelike::hour(&when);

        writer.serialize(TripCsvRecord {
            pickup_datetime: Some(format_datetime(&when)),
            pickup_day: None,
            pickup_hour: None,
            pickup_zone: pickup as ZoneId,
            dropoff_zone: dropoff as ZoneId,
            total_amount: fare(pickup, dropoff, hour, &mut rng),
        })?;

        if (i + 1) % 100_000 == 0 {
            info!("Generated {}/{} trips...", i + 1, args.trips);
        }
    }
    writer.flush()?;

    info!("Wrote {} trips to {:?}", args.trips, args.trips_output);
    Ok(())
}
