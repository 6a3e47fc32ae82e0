//! Station registry: ICAO-keyed index with spatial queries.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use super::parser::{parse_stations_csv, StationParseError};
use super::Station;

/// Error type for registry construction.
#[derive(Debug, thiserror::Error)]
pub enum StationRegistryError {
    #[error("station database not found at: {0}")]
    NotFound(PathBuf),
    #[error("failed to parse station database: {0}")]
    Parse(#[from] StationParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Immutable index of known weather stations.
///
/// Lookup by ICAO is O(1); spatial queries are a linear scan, which is
/// fine for the tens of thousands of stations a worldwide database holds.
/// The registry is read-only after load and safe to share across ticks.
#[derive(Debug, Default)]
pub struct StationRegistry {
    stations: HashMap<String, Station>,
}

impl StationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from an in-memory station list (tests, embedding).
    pub fn from_stations(stations: impl IntoIterator<Item = Station>) -> Self {
        let mut registry = Self::new();
        for station in stations {
            registry.stations.insert(station.icao.clone(), station);
        }
        registry
    }

    /// Build a registry from a station CSV file.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, StationRegistryError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StationRegistryError::NotFound(path.to_path_buf()));
        }
        Self::from_reader(File::open(path)?)
    }

    /// Build a registry from any CSV reader.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, StationRegistryError> {
        let stations = parse_stations_csv(reader)?;
        let registry = Self::from_stations(stations);
        tracing::info!(count = registry.len(), "Built station registry");
        Ok(registry)
    }

    /// Get a station by ICAO code, case-insensitive.
    pub fn get(&self, icao: &str) -> Option<&Station> {
        self.stations.get(&icao.to_uppercase())
    }

    /// Returns the number of stations in the registry.
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Returns true if the registry holds no stations.
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// All stations within `radius_nm` of a point, closest first.
    ///
    /// Ties on distance are broken by ICAO so the result is deterministic
    /// for a given registry and position. At most `max_results` entries.
    pub fn nearest_within(
        &self,
        lat: f64,
        lon: f64,
        radius_nm: f64,
        max_results: usize,
    ) -> Vec<(&Station, f64)> {
        let mut hits: Vec<(&Station, f64)> = self
            .stations
            .values()
            .map(|s| (s, s.distance_to(lat, lon)))
            .filter(|(_, d)| *d <= radius_nm)
            .collect();

        hits.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.icao.cmp(&b.0.icao))
        });
        hits.truncate(max_results);
        hits
    }

    /// The single closest station regardless of distance.
    pub fn nearest(&self, lat: f64, lon: f64) -> Option<(&Station, f64)> {
        self.stations
            .values()
            .map(|s| (s, s.distance_to(lat, lon)))
            .min_by(|a, b| {
                a.1.partial_cmp(&b.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.icao.cmp(&b.0.icao))
            })
    }
}
