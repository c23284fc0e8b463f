//! Zone report - console view of a built statistics store
//!
//! Run: ./target/release/zone_report [--store PATH] [--zone ID]
//! Without --zone the city-wide record is shown.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use nyc_zone_stats::models::{ZoneStatistics, HOURS_PER_DAY, WEEKDAYS};
use nyc_zone_stats::store::ZoneStatsStore;

#[derive(Parser, Debug)]
#[command(name = "zone_report")]
#[command(about = "Print precomputed statistics for one zone")]
struct Args {
    /// Statistics store written by nyc_zone_stats
    #[arg(long, default_value = "aux_data/zone_data.json")]
    store: PathBuf,

    /// Zone id to show (default: entire city)
    #[arg(long, allow_negative_numbers = true)]
    zone: Option<i64>,
}

fn print_section_header(title: &str) {
    println!("\n{}", "═".repeat(80));
    println!("  {}", title);
    println!("{}\n", "═".repeat(80));
}

fn print_subsection(title: &str) {
    println!("\n{}", title);
    println!("{}", "─".repeat(70));
}

fn bar(value: f64, scale: f64) -> String {
    "█".repeat((value.abs() * scale).round() as usize)
}

fn print_daily(stats: &ZoneStatistics) {
    print_subsection("Rides per Weekday (deviation from average day)");
    for (day, value) in WEEKDAYS.iter().zip(stats.daily.iter()) {
        let sign = if *value < 0.0 { '-' } else { '+' };
        println!("  {:<4} {:>+8.1}%  {}{}", day, value * 100.0, sign, bar(*value, 200.0));
    }
}

fn print_hourly(stats: &ZoneStatistics) {
    print_subsection("Rides per Hour");
    for (hour, share) in stats.hourly.iter().enumerate() {
        println!("  {:02}:00 {:>7.1}%  {}", hour, share * 100.0, bar(*share, 400.0));
    }
}

fn print_destinations(stats: &ZoneStatistics) {
    print_subsection("Top Destination Zones");
    println!("  {:40} {:>8}", "Zone", "%");
    println!("  {}", "─".repeat(50));
    for (name, share) in stats.destinations.iter() {
        println!("  {:40} {:>7.1}%", name, share * 100.0);
    }
}

fn print_heatmap(stats: &ZoneStatistics) {
    print_subsection("Average Fare by Weekday and Hour");
    print!("  {:4}", "");
    for hour in (0..HOURS_PER_DAY).step_by(3) {
        print!("{:>8}", format!("{:02}h", hour));
    }
    println!();
    for (day, row) in WEEKDAYS.iter().zip(stats.heatmap.iter()) {
        print!("  {:<4}", day);
        for fare in row.iter().step_by(3) {
            print!("{:>8.2}", fare);
        }
        println!();
    }
}

fn print_pickups(store: &ZoneStatsStore) {
    print_subsection("Busiest Pickup Zones");
    let mut ranked: Vec<&ZoneStatistics> = store.zones().collect();
    ranked.sort_by(|a, b| b.trip_count.cmp(&a.trip_count).then(a.zone_id.cmp(&b.zone_id)));
    for stats in ranked.iter().take(10) {
        println!("  {:>5}  {:40} {:>10}", stats.zone_id, stats.name, stats.trip_count);
    }
}

fn main() -> Result<()> {
    nyc_zone_stats::init_tracing();
    let args = Args::parse();
    let store = ZoneStatsStore::load(&args.store)
        .with_context(|| format!("loading store {:?}", args.store))?;

    let stats = store.lookup(args.zone);
    if let Some(requested) = args.zone {
        if requested != stats.zone_id {
            println!("Unknown zone {}, showing the entire city", requested);
        }
    }

    print_section_header(&format!(
        "{} (zone {}) - {} trips",
        stats.name, stats.zone_id, stats.trip_count
    ));
    print_daily(stats);
    print_hourly(stats);
    print_destinations(stats);
    print_heatmap(stats);
    if stats.is_aggregate() {
        print_pickups(&store);
    }

    println!("\n{}", "═".repeat(80));
    Ok(())
}
