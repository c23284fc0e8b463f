//! Zone statistics engine
//!
//! Computes one [`ZoneStatistics`] record from the trip dataset, either for a
//! single pickup zone or for the whole city:
//!
//! - weekday deviation profile: per-day share minus the mean share
//! - hourly share profile
//! - destination ranking: top-k dropoff zones by share plus an `Other` residual
//! - fare heatmap: mean fare per (weekday, hour) cell
//!
//! Every normalization checks for an empty selection first, so a zone without
//! trips yields zeros rather than NaN.

use std::collections::HashMap;

use tracing::debug;

use crate::dataset::{FareCells, TripDataset};
use crate::error::{Result, ZoneStatsError};
use crate::models::{
    DailyProfile, Destinations, FareHeatmap, HourlyProfile, ZoneId, ZoneStatistics, ALL_ZONES,
    DAYS_PER_WEEK, HOURS_PER_DAY, OTHER_DESTINATIONS,
};
use crate::zone_directory::ZoneDirectory;

pub const DEFAULT_TOP_DESTINATIONS: usize = 5;
pub const DEFAULT_SHARE_PRECISION: u32 = 4;
pub const DEFAULT_FARE_PRECISION: u32 = 2;
pub const DEFAULT_AGGREGATE_NAME: &str = "entire city";

/// Tunables for the engine, fixed for the lifetime of a build
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Number of ranked destinations before the `Other` bucket
    pub top_k: usize,
    /// Decimal places kept for daily, hourly and destination shares
    pub share_precision: u32,
    /// Decimal places kept for heatmap fares
    pub fare_precision: u32,
    /// Value stored in heatmap cells without any trips
    pub empty_fare_fallback: f64,
    /// Name of the city-wide record
    pub aggregate_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_DESTINATIONS,
            share_precision: DEFAULT_SHARE_PRECISION,
            fare_precision: DEFAULT_FARE_PRECISION,
            empty_fare_fallback: 0.0,
            aggregate_name: DEFAULT_AGGREGATE_NAME.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(ZoneStatsError::InvalidConfig(
                "top_k must be at least 1".to_string(),
            ));
        }
        // JSON has no representation for NaN or infinities
        if !self.empty_fare_fallback.is_finite() {
            return Err(ZoneStatsError::InvalidConfig(format!(
                "empty fare fallback {} is not finite",
                self.empty_fare_fallback
            )));
        }
        if self.share_precision > 15 || self.fare_precision > 15 {
            return Err(ZoneStatsError::InvalidConfig(
                "precision above 15 decimals is not representable".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct ZoneStatsEngine<'a> {
    dataset: &'a TripDataset,
    directory: &'a ZoneDirectory,
    config: EngineConfig,
}

impl<'a> ZoneStatsEngine<'a> {
    pub fn new(
        dataset: &'a TripDataset,
        directory: &'a ZoneDirectory,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            dataset,
            directory,
            config,
        })
    }

    pub fn directory(&self) -> &ZoneDirectory {
        self.directory
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Statistics for trips picked up in `zone`, or for every trip when `None`
    pub fn compute(&self, zone: Option<ZoneId>) -> Result<ZoneStatistics> {
        let (zone_id, name) = match zone {
            Some(id) => {
                let name = self
                    .directory
                    .name(id)
                    .ok_or(ZoneStatsError::UnknownZone(id))?;
                (id, name.to_string())
            }
            None => (ALL_ZONES, self.config.aggregate_name.clone()),
        };

        let selection = self.dataset.select(zone);
        let trip_count = selection.count();
        if trip_count == 0 {
            debug!("Zone {} ({}) has no trips", zone_id, name);
        }

        let precision = self.config.share_precision;
        let daily = weekday_deviation(&selection.count_by_weekday(), precision);
        let hourly = hourly_shares(&selection.count_by_hour(), precision);
        let destinations = rank_destinations(
            &selection.count_by_dropoff(),
            self.directory,
            self.config.top_k,
            precision,
        );
        let heatmap = fare_heatmap(
            &selection.fare_by_day_hour(),
            self.config.fare_precision,
            self.config.empty_fare_fallback,
        );

        Ok(ZoneStatistics {
            zone_id,
            name,
            trip_count,
            daily,
            hourly,
            destinations,
            heatmap,
            pickup_counts: None,
        })
    }

    /// Raw pickups for every directory zone, in directory order, unfiltered
    pub fn pickup_counts(&self) -> Vec<u64> {
        let counts = self.dataset.pickup_counts();
        self.directory
            .ids()
            .map(|id| counts.get(&id).copied().unwrap_or(0))
            .collect()
    }
}

/// Round half away from zero to `decimals` places, folding `-0.0` into `0.0`
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Per-day share of rides minus the mean share across the week
pub fn weekday_deviation(counts: &[u64; DAYS_PER_WEEK], decimals: u32) -> DailyProfile {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return [0.0; DAYS_PER_WEEK];
    }

    let shares = counts.map(|c| c as f64 / total as f64);
    let mean = shares.iter().sum::<f64>() / DAYS_PER_WEEK as f64;
    shares.map(|share| round_to(share - mean, decimals))
}

/// Per-hour share of rides
pub fn hourly_shares(counts: &[u64; HOURS_PER_DAY], decimals: u32) -> HourlyProfile {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return [0.0; HOURS_PER_DAY];
    }
    counts.map(|c| round_to(c as f64 / total as f64, decimals))
}

/// Top `top_k` destinations by share plus an `Other` bucket for the rest
///
/// Destinations are ordered by trip count descending, then zone id ascending,
/// which is the same order as share descending without float comparisons.
/// Only destinations with at least one trip are ranked, so a sparse zone may
/// yield fewer than `top_k` entries: the mapping then holds fewer than
/// `top_k + 1` keys rather than a fixed-width shape, and a zone without trips
/// maps to `{"Other": 0.0}` alone. Zero-share zones are never padded in.
pub fn rank_destinations(
    counts: &HashMap<ZoneId, u64>,
    directory: &ZoneDirectory,
    top_k: usize,
    decimals: u32,
) -> Destinations {
    let mut destinations = Destinations::new();
    let total: u64 = counts.values().sum();
    if total == 0 {
        destinations.insert(OTHER_DESTINATIONS.to_string(), 0.0);
        return destinations;
    }

    let mut ranked: Vec<(ZoneId, u64)> = counts
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(zone, count)| (*zone, *count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let split = top_k.min(ranked.len());
    let (top, rest) = ranked.split_at(split);

    for (zone, count) in top {
        let name = unique_destination_name(&destinations, directory.display_name(*zone), *zone);
        destinations.insert(name, round_to(*count as f64 / total as f64, decimals));
    }

    let other: u64 = rest.iter().map(|(_, count)| count).sum();
    destinations.insert(
        OTHER_DESTINATIONS.to_string(),
        round_to(other as f64 / total as f64, decimals),
    );
    destinations
}

/// Zone names are not unique in every directory, and a suffixed name can
/// itself be another zone's name. Suffix with the zone id, then count up,
/// until the key is free.
fn unique_destination_name(destinations: &Destinations, base: String, zone: ZoneId) -> String {
    let taken = |name: &str| destinations.contains(name) || name == OTHER_DESTINATIONS;
    if !taken(&base) {
        return base;
    }
    let mut name = format!("{} ({})", base, zone);
    let mut n = 2;
    while taken(&name) {
        name = format!("{} ({}-{})", base, zone, n);
        n += 1;
    }
    name
}

/// Mean fare per (weekday, hour) cell; empty cells take `fallback`
pub fn fare_heatmap(cells: &FareCells, decimals: u32, fallback: f64) -> FareHeatmap {
    let mut heatmap = [[fallback; HOURS_PER_DAY]; DAYS_PER_WEEK];
    for day in 0..DAYS_PER_WEEK {
        for hour in 0..HOURS_PER_DAY {
            let count = cells.count[day][hour];
            if count > 0 {
                heatmap[day][hour] = round_to(cells.sum[day][hour] / count as f64, decimals);
            }
        }
    }
    heatmap
}
