//! Error type shared by the dataset loader, engine, builder and store

use std::path::PathBuf;
use thiserror::Error;

use crate::models::ZoneId;

pub type Result<T> = std::result::Result<T, ZoneStatsError>;

#[derive(Debug, Error)]
pub enum ZoneStatsError {
    /// Zone filter not present in the zone directory
    #[error("unknown zone id {0}")]
    UnknownZone(ZoneId),

    /// A single zone failed during a full store build
    #[error("failed to compute statistics for zone {zone}")]
    PartialBuild {
        zone: ZoneId,
        #[source]
        source: Box<ZoneStatsError>,
    },

    #[error("failed to (de)serialize zone statistics")]
    Serialization(#[from] serde_json::Error),

    #[error("i/o error on {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read trip csv")]
    Csv(#[from] csv::Error),

    #[error("invalid trip at row {row}: {reason}")]
    InvalidTrip { row: usize, reason: String },

    #[error("invalid zone directory: {0}")]
    InvalidDirectory(String),

    #[error("invalid zone statistics store: {0}")]
    InvalidStore(String),

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

impl ZoneStatsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ZoneStatsError::Io {
            path: path.into(),
            source,
        }
    }
}
