//! Zone statistics store
//!
//! An immutable mapping from zone id (plus `-1` for the whole city) to its
//! [`ZoneStatistics`]. The builder produces it in one pass; it is persisted as
//! a single JSON object keyed by stringified zone id and read back wholesale
//! by consumers, which only ever look records up.
//!
//! Per-zone records are kept in ascending id order for enumeration and
//! serialization, with a hash index on top so lookups are constant time.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Result, ZoneStatsError};
use crate::models::{ZoneId, ZoneStatistics, ALL_ZONES};

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneStatsStore {
    aggregate: ZoneStatistics,
    zones: Vec<ZoneStatistics>,
    index: HashMap<ZoneId, usize>,
}

impl ZoneStatsStore {
    /// Assemble a store, checking that `-1` is present and is the only record
    /// carrying pickup counts
    pub fn from_records(mut records: BTreeMap<ZoneId, ZoneStatistics>) -> Result<Self> {
        let aggregate = records
            .remove(&ALL_ZONES)
            .ok_or_else(|| ZoneStatsError::InvalidStore("missing city-wide record -1".to_string()))?;
        if aggregate.pickup_counts.is_none() {
            return Err(ZoneStatsError::InvalidStore(
                "city-wide record has no pickup_counts".to_string(),
            ));
        }

        for (key, stats) in &records {
            if stats.zone_id != *key {
                return Err(ZoneStatsError::InvalidStore(format!(
                    "record under key {} has zone_id {}",
                    key, stats.zone_id
                )));
            }
            if stats.pickup_counts.is_some() {
                return Err(ZoneStatsError::InvalidStore(format!(
                    "zone {} carries pickup_counts",
                    key
                )));
            }
        }
        if aggregate.zone_id != ALL_ZONES {
            return Err(ZoneStatsError::InvalidStore(format!(
                "city-wide record has zone_id {}",
                aggregate.zone_id
            )));
        }

        let zones: Vec<ZoneStatistics> = records.into_values().collect();
        let index = zones
            .iter()
            .enumerate()
            .map(|(pos, stats)| (stats.zone_id, pos))
            .collect();
        Ok(Self {
            aggregate,
            zones,
            index,
        })
    }

    pub fn get(&self, zone: ZoneId) -> Option<&ZoneStatistics> {
        if zone == ALL_ZONES {
            Some(&self.aggregate)
        } else {
            self.index.get(&zone).map(|&pos| &self.zones[pos])
        }
    }

    /// Record for the selected zone; no selection or an unknown zone yields
    /// the city-wide record
    pub fn lookup(&self, zone: Option<ZoneId>) -> &ZoneStatistics {
        match zone {
            None => &self.aggregate,
            Some(id) => self.get(id).unwrap_or_else(|| {
                warn!("No statistics for zone {}, showing city-wide record", id);
                &self.aggregate
            }),
        }
    }

    pub fn aggregate(&self) -> &ZoneStatistics {
        &self.aggregate
    }

    pub fn pickup_counts(&self) -> &[u64] {
        self.aggregate.pickup_counts.as_deref().unwrap_or(&[])
    }

    /// Per-zone records in ascending id order, excluding `-1`
    pub fn zones(&self) -> impl Iterator<Item = &ZoneStatistics> {
        self.zones.iter()
    }

    /// Number of records including the city-wide one
    pub fn len(&self) -> usize {
        self.zones.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.as_map())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let records: BTreeMap<ZoneId, ZoneStatistics> = serde_json::from_str(json)?;
        Self::from_records(records)
    }

    fn as_map(&self) -> BTreeMap<ZoneId, &ZoneStatistics> {
        std::iter::once((ALL_ZONES, &self.aggregate))
            .chain(self.zones.iter().map(|stats| (stats.zone_id, stats)))
            .collect()
    }

    /// Write the store to `path` in one step
    ///
    /// The JSON goes to a sibling temp file which is synced and renamed over
    /// `path`, so readers see either the previous file or the complete new one.
    pub fn write_atomic(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ZoneStatsError::io(parent, e))?;
        }

        let tmp = temp_path(path);
        if let Err(e) = self.write_file(&tmp) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(ZoneStatsError::io(path, e));
        }

        info!("Wrote {} zone records to {:?}", self.len(), path);
        Ok(())
    }

    fn write_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| ZoneStatsError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &self.as_map())?;
        writer.flush().map_err(|e| ZoneStatsError::io(path, e))?;
        let file = writer
            .into_inner()
            .map_err(|e| ZoneStatsError::io(path, e.into_error()))?;
        file.sync_all().map_err(|e| ZoneStatsError::io(path, e))
    }

    /// Load a store written by [`ZoneStatsStore::write_atomic`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| ZoneStatsError::io(path, e))?;
        let store = Self::from_json(&json)?;
        info!("Loaded {} zone records from {:?}", store.len(), path);
        Ok(store)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildOptions, StoreBuilder};
    use crate::engine::{EngineConfig, ZoneStatsEngine};
    use crate::models::Destinations;
    use crate::test_utils::{directory, random_dataset};

    fn built_store() -> ZoneStatsStore {
        let ds = random_dataset(8, 1_500, 11);
        let dir = directory(8);
        let engine = ZoneStatsEngine::new(&ds, &dir, EngineConfig::default()).unwrap();
        StoreBuilder::new(engine, BuildOptions::default())
            .build_all()
            .unwrap()
    }

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("nyc_zone_stats_{}_{}", name, std::process::id()))
            .join("zone_data.json")
    }

    fn empty_record(zone_id: ZoneId) -> ZoneStatistics {
        ZoneStatistics {
            zone_id,
            name: format!("Zone-{}", zone_id),
            trip_count: 0,
            daily: [0.0; 7],
            hourly: [0.0; 24],
            destinations: Destinations::new(),
            heatmap: [[0.0; 24]; 7],
            pickup_counts: None,
        }
    }

    #[test]
    fn test_json_round_trip() {
        let store = built_store();
        let back = ZoneStatsStore::from_json(&store.to_json().unwrap()).unwrap();
        assert_eq!(back, store);
    }

    #[test]
    fn test_json_shape() {
        let store = built_store();
        let value: serde_json::Value = serde_json::from_str(&store.to_json().unwrap()).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 9);
        assert!(object["-1"].get("pickup_counts").is_some());
        for key in ["0", "3", "7"] {
            let record = &object[key];
            assert!(record.get("pickup_counts").is_none());
            assert_eq!(record["daily"].as_array().unwrap().len(), 7);
            assert_eq!(record["hourly"].as_array().unwrap().len(), 24);
            assert_eq!(record["heatmap"].as_array().unwrap().len(), 7);
            assert_eq!(record["heatmap"][0].as_array().unwrap().len(), 24);
            assert!(record["destinations"].get("Other").is_some());
        }
    }

    #[test]
    fn test_write_and_load() {
        let store = built_store();
        let path = scratch_path("write_and_load");
        store.write_atomic(&path).unwrap();

        let loaded = ZoneStatsStore::load(&path).unwrap();
        assert_eq!(loaded, store);

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_lookup_defaults_to_city() {
        let store = built_store();
        assert_eq!(store.lookup(None).zone_id, ALL_ZONES);
        assert_eq!(store.lookup(Some(4)).zone_id, 4);
        assert_eq!(store.lookup(Some(1234)).zone_id, ALL_ZONES);
        assert!(store.get(1234).is_none());
        assert_eq!(store.pickup_counts().len(), 8);
        assert_eq!(store.zones().count(), 8);
    }

    #[test]
    fn test_rejects_missing_aggregate() {
        let records: BTreeMap<ZoneId, ZoneStatistics> = [(0, empty_record(0))].into_iter().collect();
        assert!(matches!(
            ZoneStatsStore::from_records(records),
            Err(ZoneStatsError::InvalidStore(_))
        ));
    }

    #[test]
    fn test_rejects_pickup_counts_on_zone() {
        let mut aggregate = empty_record(ALL_ZONES);
        aggregate.pickup_counts = Some(vec![0]);
        let mut zone = empty_record(0);
        zone.pickup_counts = Some(vec![0]);

        let records: BTreeMap<ZoneId, ZoneStatistics> =
            [(ALL_ZONES, aggregate), (0, zone)].into_iter().collect();
        assert!(matches!(
            ZoneStatsStore::from_records(records),
            Err(ZoneStatsError::InvalidStore(_))
        ));
    }

    fn temp_leftovers(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.to_string_lossy().ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn test_write_fails_when_parent_is_a_file() {
        let store = built_store();
        let root = scratch_path("parent_is_file").parent().unwrap().to_path_buf();
        fs::create_dir_all(&root).unwrap();
        let blocker = root.join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let err = store.write_atomic(blocker.join("zone_data.json")).unwrap_err();
        assert!(matches!(err, ZoneStatsError::Io { .. }));
        assert!(temp_leftovers(&root).is_empty());
        assert_eq!(fs::read(&blocker).unwrap(), b"not a directory");

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let store = built_store();
        let path = scratch_path("rename_fails");
        let root = path.parent().unwrap().to_path_buf();
        // a directory in place of the target makes the final rename fail
        fs::create_dir_all(path.join("occupied")).unwrap();

        let err = store.write_atomic(&path).unwrap_err();
        assert!(matches!(err, ZoneStatsError::Io { .. }));
        assert!(temp_leftovers(&root).is_empty());
        assert!(path.join("occupied").is_dir());

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_failed_write_keeps_previous_store() {
        let store = built_store();
        let path = scratch_path("keeps_previous");
        store.write_atomic(&path).unwrap();
        let before = fs::read(&path).unwrap();

        // occupy the temp file name so creating it fails
        let tmp = temp_path(&path);
        fs::create_dir_all(&tmp).unwrap();

        let mut other = store.clone();
        other.aggregate.trip_count += 1;
        let err = other.write_atomic(&path).unwrap_err();
        assert!(matches!(err, ZoneStatsError::Io { .. }));
        assert_eq!(fs::read(&path).unwrap(), before);
        assert_eq!(ZoneStatsStore::load(&path).unwrap(), store);

        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_zones_ordered_and_indexed() {
        let mut aggregate = empty_record(ALL_ZONES);
        aggregate.pickup_counts = Some(vec![0; 3]);
        let records: BTreeMap<ZoneId, ZoneStatistics> = [
            (ALL_ZONES, aggregate),
            (42, empty_record(42)),
            (3, empty_record(3)),
            (17, empty_record(17)),
        ]
        .into_iter()
        .collect();
        let store = ZoneStatsStore::from_records(records).unwrap();

        let ids: Vec<ZoneId> = store.zones().map(|z| z.zone_id).collect();
        assert_eq!(ids, vec![3, 17, 42]);
        for id in [3, 17, 42] {
            assert_eq!(store.get(id).unwrap().zone_id, id);
        }
        assert!(store.get(4).is_none());
        assert_eq!(store.len(), 4);

        let back = ZoneStatsStore::from_json(&store.to_json().unwrap()).unwrap();
        assert_eq!(back, store);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ZoneStatsStore::load(scratch_path("missing")).unwrap_err();
        assert!(matches!(err, ZoneStatsError::Io { .. }));
    }
}
