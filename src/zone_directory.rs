//! Zone directory: maps zone ids to display names
//! Loaded once from a JSON object keyed by stringified zone ids

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::info;

use crate::error::{Result, ZoneStatsError};
use crate::models::{ZoneId, ALL_ZONES};

/// Immutable zone-id to name lookup, enumerated in ascending id order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneDirectory {
    zones: BTreeMap<ZoneId, String>,
}

impl ZoneDirectory {
    /// Build a directory, rejecting duplicate ids and the reserved city-wide id
    pub fn new(zones: impl IntoIterator<Item = (ZoneId, String)>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for (id, name) in zones {
            if id == ALL_ZONES {
                return Err(ZoneStatsError::InvalidDirectory(format!(
                    "zone id {} is reserved for the entire city",
                    ALL_ZONES
                )));
            }
            if map.insert(id, name).is_some() {
                return Err(ZoneStatsError::InvalidDirectory(format!("duplicate zone id {}", id)));
            }
        }
        Ok(Self { zones: map })
    }

    /// Parse `{"0": "Newark Airport", "1": "Jamaica Bay", ...}`
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, String> = serde_json::from_str(json)?;
        let zones = raw
            .into_iter()
            .map(|(key, name)| {
                let id: ZoneId = key.trim().parse().map_err(|_| {
                    ZoneStatsError::InvalidDirectory(format!("non-integer zone id {:?}", key))
                })?;
                Ok((id, name))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(zones)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ZoneStatsError::io(path, e))?;
        let directory = Self::from_json(&json)?;
        info!("Loaded {} zones from {:?}", directory.len(), path);
        Ok(directory)
    }

    pub fn to_json(&self) -> Result<String> {
        let raw: BTreeMap<String, &str> = self
            .zones
            .iter()
            .map(|(id, name)| (id.to_string(), name.as_str()))
            .collect();
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    pub fn contains(&self, zone: ZoneId) -> bool {
        self.zones.contains_key(&zone)
    }

    pub fn name(&self, zone: ZoneId) -> Option<&str> {
        self.zones.get(&zone).map(String::as_str)
    }

    /// Display name, falling back to `Zone <id>` for ids outside the directory
    pub fn display_name(&self, zone: ZoneId) -> String {
        self.name(zone)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Zone {}", zone))
    }

    /// Zone ids in enumeration order
    pub fn ids(&self) -> impl Iterator<Item = ZoneId> + '_ {
        self.zones.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ZoneId, &str)> {
        self.zones.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_zone() {
        let dir = ZoneDirectory::from_json(r#"{"1": "Newark Airport", "0": "EWR"}"#).unwrap();
        assert_eq!(dir.name(1), Some("Newark Airport"));
        assert_eq!(dir.display_name(0), "EWR");
        assert!(dir.contains(0));
        assert_eq!(dir.len(), 2);
    }

    #[test]
    fn test_unknown_zone() {
        let dir = ZoneDirectory::new([(3, "Allerton/Pelham Gardens".to_string())]).unwrap();
        assert_eq!(dir.name(99), None);
        assert_eq!(dir.display_name(99), "Zone 99");
    }

    #[test]
    fn test_enumeration_is_ascending() {
        let dir = ZoneDirectory::from_json(r#"{"10": "c", "2": "a", "5": "b"}"#).unwrap();
        assert_eq!(dir.ids().collect::<Vec<_>>(), vec![2, 5, 10]);
    }

    #[test]
    fn test_rejects_non_integer_keys() {
        let err = ZoneDirectory::from_json(r#"{"abc": "Nowhere"}"#).unwrap_err();
        assert!(matches!(err, ZoneStatsError::InvalidDirectory(_)));
    }

    #[test]
    fn test_rejects_city_wide_id() {
        let err = ZoneDirectory::from_json(r#"{"-1": "Everywhere", "0": "EWR"}"#).unwrap_err();
        assert!(matches!(err, ZoneStatsError::InvalidDirectory(_)));

        let err = ZoneDirectory::new([(ALL_ZONES, "Everywhere".to_string())]).unwrap_err();
        assert!(matches!(err, ZoneStatsError::InvalidDirectory(_)));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err = ZoneDirectory::from_json(r#"{"4": "a", " 4": "b"}"#).unwrap_err();
        assert!(matches!(err, ZoneStatsError::InvalidDirectory(_)));
    }

    #[test]
    fn test_json_round_trip() {
        let dir = ZoneDirectory::new([(0, "Alphabet City".to_string()), (7, "Astoria".to_string())]).unwrap();
        let back = ZoneDirectory::from_json(&dir.to_json().unwrap()).unwrap();
        assert_eq!(back, dir);
    }
}
