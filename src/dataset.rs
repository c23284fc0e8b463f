//! Trip dataset: a read-only columnar table of trips
//!
//! Rows are stored column by column and indexed by pickup zone, so selecting
//! one zone's trips touches only that zone's rows. All aggregation goes
//! through a [`Selection`], which is either the whole table or one pickup
//! zone's rows.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{debug, info, warn};

use crate::error::{Result, ZoneStatsError};
use crate::models::{
    weekday_index, FareHeatmap, Trip, TripCsvRecord, ZoneId, DAYS_PER_WEEK, HOURS_PER_DAY,
};

/// Row-level problems reported individually before going quiet
const MAX_REPORTED_ERRORS: usize = 5;

#[derive(Debug, Default)]
pub struct TripDataset {
    pickup_zone: Vec<ZoneId>,
    dropoff_zone: Vec<ZoneId>,
    weekday: Vec<u8>,
    hour: Vec<u8>,
    fare: Vec<f64>,
    by_pickup: HashMap<ZoneId, Vec<usize>>,
}

impl TripDataset {
    pub fn from_trips(trips: impl IntoIterator<Item = Trip>) -> Self {
        let mut dataset = Self::default();
        for trip in trips {
            dataset.push(trip);
        }
        dataset
    }

    fn push(&mut self, trip: Trip) {
        let row = self.pickup_zone.len();
        self.pickup_zone.push(trip.pickup_zone);
        self.dropoff_zone.push(trip.dropoff_zone);
        self.weekday.push(weekday_index(trip.weekday) as u8);
        self.hour.push(trip.hour);
        self.fare.push(trip.fare);
        self.by_pickup.entry(trip.pickup_zone).or_default().push(row);
    }

    /// Load trips from a CSV file with a header row
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading trips from {:?}", path);
        let file = std::fs::File::open(path).map_err(|e| ZoneStatsError::io(path, e))?;
        Self::from_csv_reader(file)
    }

    /// Parse trips from any CSV source. Malformed rows are skipped and counted.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
        // Surface a broken header up front rather than as a per-row error
        reader.headers()?;

        let mut dataset = Self::default();
        let mut error_count = 0;

        for (i, result) in reader.deserialize::<TripCsvRecord>().enumerate() {
            let parsed = result
                .map_err(|e| e.to_string())
                .and_then(|record| record.to_trip());
            match parsed {
                Ok(trip) => dataset.push(trip),
                Err(reason) => {
                    if error_count < MAX_REPORTED_ERRORS {
                        let err = ZoneStatsError::InvalidTrip { row: i + 1, reason };
                        warn!("Skipping record: {}", err);
                    }
                    error_count += 1;
                }
            }

            if (i + 1) % 1_000_000 == 0 {
                debug!("Parsed {} records...", i + 1);
            }
        }

        info!(
            "Loaded {} trips across {} pickup zones, {} rows skipped",
            dataset.len(),
            dataset.by_pickup.len(),
            error_count
        );
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.pickup_zone.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pickup_zone.is_empty()
    }

    /// Trips whose pickup zone equals `zone`, or every trip for `None`
    pub fn select(&self, zone: Option<ZoneId>) -> Selection<'_> {
        let rows = zone.map(|z| self.by_pickup.get(&z).map(Vec::as_slice).unwrap_or(&[]));
        Selection { dataset: self, rows }
    }

    /// Raw pickup count per zone over the whole table
    pub fn pickup_counts(&self) -> HashMap<ZoneId, u64> {
        self.by_pickup
            .iter()
            .map(|(zone, rows)| (*zone, rows.len() as u64))
            .collect()
    }
}

/// A filtered view over a [`TripDataset`]
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    dataset: &'a TripDataset,
    rows: Option<&'a [usize]>,
}

impl Selection<'_> {
    fn for_each_row(&self, f: impl FnMut(usize)) {
        match self.rows {
            Some(rows) => rows.iter().copied().for_each(f),
            None => (0..self.dataset.len()).for_each(f),
        }
    }

    pub fn count(&self) -> u64 {
        match self.rows {
            Some(rows) => rows.len() as u64,
            None => self.dataset.len() as u64,
        }
    }

    /// Trip counts per weekday, Mon..Sun
    pub fn count_by_weekday(&self) -> [u64; DAYS_PER_WEEK] {
        let mut counts = [0u64; DAYS_PER_WEEK];
        self.for_each_row(|row| counts[self.dataset.weekday[row] as usize] += 1);
        counts
    }

    /// Trip counts per pickup hour, 0..23
    pub fn count_by_hour(&self) -> [u64; HOURS_PER_DAY] {
        let mut counts = [0u64; HOURS_PER_DAY];
        self.for_each_row(|row| counts[self.dataset.hour[row] as usize] += 1);
        counts
    }

    pub fn count_by_dropoff(&self) -> HashMap<ZoneId, u64> {
        let mut counts = HashMap::new();
        self.for_each_row(|row| *counts.entry(self.dataset.dropoff_zone[row]).or_insert(0) += 1);
        counts
    }

    /// Fare sum and trip count per (weekday, hour) cell
    pub fn fare_by_day_hour(&self) -> FareCells {
        let mut cells = FareCells::default();
        self.for_each_row(|row| {
            let day = self.dataset.weekday[row] as usize;
            let hour = self.dataset.hour[row] as usize;
            cells.sum[day][hour] += self.dataset.fare[row];
            cells.count[day][hour] += 1;
        });
        cells
    }
}

/// Per-cell fare accumulators for the weekday x hour grid
#[derive(Debug, Clone, PartialEq)]
pub struct FareCells {
    pub sum: FareHeatmap,
    pub count: [[u64; HOURS_PER_DAY]; DAYS_PER_WEEK],
}

impl Default for FareCells {
    fn default() -> Self {
        Self {
            sum: [[0.0; HOURS_PER_DAY]; DAYS_PER_WEEK],
            count: [[0; HOURS_PER_DAY]; DAYS_PER_WEEK],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::trip;
    use chrono::Weekday;

    fn sample() -> TripDataset {
        TripDataset::from_trips([
            trip(1, 2, Weekday::Mon, 8, 10.0),
            trip(1, 3, Weekday::Mon, 8, 20.0),
            trip(1, 2, Weekday::Sun, 23, 5.0),
            trip(2, 1, Weekday::Wed, 0, 7.5),
        ])
    }

    #[test]
    fn test_select_zone() {
        let ds = sample();
        assert_eq!(ds.select(Some(1)).count(), 3);
        assert_eq!(ds.select(Some(2)).count(), 1);
        assert_eq!(ds.select(Some(42)).count(), 0);
        assert_eq!(ds.select(None).count(), 4);
    }

    #[test]
    fn test_grouped_counts() {
        let ds = sample();
        let zone = ds.select(Some(1));
        assert_eq!(zone.count_by_weekday(), [2, 0, 0, 0, 0, 0, 1]);

        let hours = zone.count_by_hour();
        assert_eq!(hours[8], 2);
        assert_eq!(hours[23], 1);
        assert_eq!(hours.iter().sum::<u64>(), 3);

        let dropoffs = zone.count_by_dropoff();
        assert_eq!(dropoffs.get(&2), Some(&2));
        assert_eq!(dropoffs.get(&3), Some(&1));
    }

    #[test]
    fn test_fare_cells() {
        let cells = sample().select(Some(1)).fare_by_day_hour();
        assert_eq!(cells.count[0][8], 2);
        assert_eq!(cells.sum[0][8], 30.0);
        assert_eq!(cells.count[6][23], 1);
        assert_eq!(cells.count[2][0], 0);
    }

    #[test]
    fn test_pickup_counts() {
        let counts = sample().pickup_counts();
        assert_eq!(counts.get(&1), Some(&3));
        assert_eq!(counts.get(&2), Some(&1));
        assert_eq!(counts.get(&3), None);
    }

    #[test]
    fn test_csv_skips_bad_rows() {
        let csv = "\
pickup_datetime,pickup_zone,dropoff_zone,total_amount
2012-01-02 08:15:00,1,2,11.5
not-a-date,1,2,9.0
2012-01-08 23:59:59,2,1,20.0
2012-01-03 10:00:00,abc,1,3.0
";
        let ds = TripDataset::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.select(Some(1)).count_by_weekday()[0], 1);
        // 2012-01-08 was a Sunday
        assert_eq!(ds.select(Some(2)).count_by_weekday()[6], 1);
    }

    #[test]
    fn test_csv_categorical_columns() {
        let csv = "\
pickup_day,pickup_hour,pickup_zone,dropoff_zone,total_amount
Tue,5,3,4,8.0
Sun,23,3,4,12.0
";
        let ds = TripDataset::from_csv_reader(csv.as_bytes()).unwrap();
        let zone = ds.select(Some(3));
        assert_eq!(zone.count_by_weekday(), [0, 1, 0, 0, 0, 0, 1]);
        assert_eq!(zone.count_by_hour()[5], 1);
    }
}
