use chrono::Weekday;
use rand::prelude::*;
use rand::rngs::StdRng;

use crate::dataset::TripDataset;
use crate::models::{Trip, ZoneId, WEEKDAYS};
use crate::zone_directory::ZoneDirectory;

pub(crate) fn trip(pickup: ZoneId, dropoff: ZoneId, weekday: Weekday, hour: u8, fare: f64) -> Trip {
    Trip::new(pickup, dropoff, weekday, hour, fare).unwrap()
}

/// Directory of `n` zones with ids `0..n` named `Zone-<id>`
pub(crate) fn directory(n: ZoneId) -> ZoneDirectory {
    ZoneDirectory::new((0..n).map(|id| (id, format!("Zone-{}", id)))).unwrap()
}

/// Random trips between zones `0..zones`, reproducible for a given seed
pub(crate) fn random_dataset(zones: ZoneId, trips: usize, seed: u64) -> TripDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    TripDataset::from_trips((0..trips).map(|_| {
        trip(
            rng.gen_range(0..zones),
            rng.gen_range(0..zones),
            WEEKDAYS[rng.gen_range(0..WEEKDAYS.len())],
            rng.gen_range(0..24),
            rng.gen_range(2.5..80.0),
        )
    }))
}
