//! Store builder: fans `compute` out over every zone and assembles the store

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::engine::ZoneStatsEngine;
use crate::error::{Result, ZoneStatsError};
use crate::models::{ZoneId, ALL_ZONES};
use crate::store::ZoneStatsStore;

/// Zones between progress messages
const PROGRESS_INTERVAL: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Worker threads; `None` uses one per available core
    pub threads: Option<usize>,
}

pub struct StoreBuilder<'a> {
    engine: ZoneStatsEngine<'a>,
    options: BuildOptions,
}

impl<'a> StoreBuilder<'a> {
    pub fn new(engine: ZoneStatsEngine<'a>, options: BuildOptions) -> Self {
        Self { engine, options }
    }

    /// Build a store covering every zone in the engine's directory
    pub fn build_all(&self) -> Result<ZoneStatsStore> {
        let zones: Vec<ZoneId> = self.engine.directory().ids().collect();
        self.build(&zones)
    }

    /// Compute one record per zone plus the city-wide record under `-1`
    ///
    /// Any failing zone aborts the whole build; no partial store is returned.
    pub fn build(&self, zones: &[ZoneId]) -> Result<ZoneStatsStore> {
        let zones: Vec<ZoneId> = zones
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut pool = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = self.options.threads {
            pool = pool.num_threads(threads);
        }
        let pool = pool
            .build()
            .map_err(|e| ZoneStatsError::InvalidConfig(format!("worker pool: {}", e)))?;

        info!(
            "Computing statistics for {} zones on {} threads",
            zones.len(),
            pool.current_num_threads()
        );

        let done = AtomicUsize::new(0);
        let (per_zone, aggregate) = pool.install(|| {
            rayon::join(
                || {
                    zones
                        .par_iter()
                        .map(|&zone| {
                            let stats = self.engine.compute(Some(zone)).map_err(|e| {
                                ZoneStatsError::PartialBuild {
                                    zone,
                                    source: Box::new(e),
                                }
                            })?;
                            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                            if n % PROGRESS_INTERVAL == 0 {
                                debug!("Computed {}/{} zones...", n, zones.len());
                            }
                            Ok(stats)
                        })
                        .collect::<Result<Vec<_>>>()
                },
                || self.engine.compute(None),
            )
        });

        let per_zone = per_zone?;
        let mut aggregate = aggregate.map_err(|e| ZoneStatsError::PartialBuild {
            zone: ALL_ZONES,
            source: Box::new(e),
        })?;
        aggregate.pickup_counts = Some(self.engine.pickup_counts());

        let mut records = BTreeMap::new();
        records.insert(ALL_ZONES, aggregate);
        for stats in per_zone {
            records.insert(stats.zone_id, stats);
        }

        info!("Built statistics for {} records", records.len());
        ZoneStatsStore::from_records(records)
    }
}
