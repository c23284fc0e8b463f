use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Zone identifier as used by the zone directory and trip records
pub type ZoneId = i64;

/// Reserved key for the city-wide record
pub const ALL_ZONES: ZoneId = -1;

/// Key of the residual destination bucket
pub const OTHER_DESTINATIONS: &str = "Other";

pub const DAYS_PER_WEEK: usize = 7;
pub const HOURS_PER_DAY: usize = 24;

/// Calendar order used for every weekday-indexed series
pub const WEEKDAYS: [Weekday; DAYS_PER_WEEK] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub type DailyProfile = [f64; DAYS_PER_WEEK];
pub type HourlyProfile = [f64; HOURS_PER_DAY];
pub type FareHeatmap = [[f64; HOURS_PER_DAY]; DAYS_PER_WEEK];

/// Raw record from CSV ingestion
///
/// Either `pickup_datetime` or the `pickup_day` / `pickup_hour` pair must be
/// present. The categorical columns win when both are.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TripCsvRecord {
    #[serde(default)]
    pub pickup_datetime: Option<String>,
    #[serde(default)]
    pub pickup_day: Option<String>,
    #[serde(default)]
    pub pickup_hour: Option<u8>,
    pub pickup_zone: ZoneId,
    pub dropoff_zone: ZoneId,
    pub total_amount: f64,
}

/// A single trip, reduced to the columns the engine aggregates over
///
/// Only constructed through [`Trip::new`], so `hour` is always below 24 and
/// `fare` is finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trip {
    pub(crate) pickup_zone: ZoneId,
    pub(crate) dropoff_zone: ZoneId,
    pub(crate) weekday: Weekday,
    pub(crate) hour: u8,
    pub(crate) fare: f64,
}

impl Trip {
    pub fn new(
        pickup_zone: ZoneId,
        dropoff_zone: ZoneId,
        weekday: Weekday,
        hour: u8,
        fare: f64,
    ) -> Result<Self, String> {
        if hour as usize >= HOURS_PER_DAY {
            return Err(format!("pickup_hour {} out of range", hour));
        }
        if !fare.is_finite() {
            return Err("total_amount is not a finite number".to_string());
        }
        Ok(Self {
            pickup_zone,
            dropoff_zone,
            weekday,
            hour,
            fare,
        })
    }

    pub fn pickup_zone(&self) -> ZoneId {
        self.pickup_zone
    }

    pub fn dropoff_zone(&self) -> ZoneId {
        self.dropoff_zone
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn fare(&self) -> f64 {
        self.fare
    }
}

impl TripCsvRecord {
    pub fn to_trip(&self) -> Result<Trip, String> {
        let (weekday, hour) = match (&self.pickup_day, self.pickup_hour) {
            (Some(day), Some(hour)) => {
                let weekday =
                    parse_weekday(day).ok_or_else(|| format!("unrecognised pickup_day {:?}", day))?;
                (weekday, hour)
            }
            _ => {
                let raw = self
                    .pickup_datetime
                    .as_deref()
                    .ok_or("missing pickup_datetime and pickup_day/pickup_hour")?;
                let ts = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                    .map_err(|e| format!("bad pickup_datetime {:?}: {}", raw, e))?;
                (ts.weekday(), ts.hour() as u8)
            }
        };

        Trip::new(
            self.pickup_zone,
            self.dropoff_zone,
            weekday,
            hour,
            self.total_amount,
        )
    }
}

/// Parse a weekday label: `Mon`, `Monday` (any case), or `0`..`6` Monday-first
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    let s = s.trim();
    if let Ok(idx) = s.parse::<usize>() {
        return WEEKDAYS.get(idx).copied();
    }
    s.parse::<Weekday>().ok()
}

/// Position of a weekday in [`WEEKDAYS`]
pub fn weekday_index(day: Weekday) -> usize {
    day.num_days_from_monday() as usize
}

/// Ordered destination-zone name to share mapping
///
/// Holds the ranked destinations in descending share order followed by the
/// `Other` residual. Serializes as a JSON object with key order preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Destinations(IndexMap<String, f64>);

impl Destinations {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: String, share: f64) {
        self.0.insert(name, share);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Share of the residual bucket (0 when absent)
    pub fn other(&self) -> f64 {
        self.get(OTHER_DESTINATIONS).unwrap_or(0.0)
    }

    /// Ranked entries, excluding `Other`, in stored order
    pub fn ranked(&self) -> impl Iterator<Item = (&str, f64)> {
        self.iter().filter(|(name, _)| *name != OTHER_DESTINATIONS)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }
}

/// Precomputed statistics for one zone, or for the whole city under [`ALL_ZONES`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneStatistics {
    pub zone_id: ZoneId,
    pub name: String,
    /// Number of trips the record was computed over
    pub trip_count: u64,
    /// Per-weekday share minus the mean share, Mon..Sun
    pub daily: DailyProfile,
    /// Per-hour share, 0..23
    pub hourly: HourlyProfile,
    pub destinations: Destinations,
    /// Mean fare, rows Mon..Sun, columns hour 0..23
    pub heatmap: FareHeatmap,
    /// Raw pickups per directory zone; only set on the city-wide record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_counts: Option<Vec<u64>>,
}

impl ZoneStatistics {
    pub fn is_aggregate(&self) -> bool {
        self.zone_id == ALL_ZONES
    }
}
