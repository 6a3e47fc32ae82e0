//! Weather station database and selection.
//!
//! - [`Station`] - immutable station record (ICAO, coordinates)
//! - [`StationRegistry`] - ICAO-keyed index with nearest-neighbour queries
//! - [`StationSelector`] - picks the injection scopes for an aircraft position
//! - [`Scope`] - a station ICAO or the synthetic global scope

mod parser;
mod registry;
mod selector;

pub use parser::{parse_stations_csv, StationParseError};
pub use registry::{StationRegistry, StationRegistryError};
pub use selector::{SelectedScope, StationSelector};

/// A weather reporting station.
///
/// Immutable once registered; the registry hands out references only.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    /// 4-letter ICAO identifier, uppercase. Unique key.
    pub icao: String,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Field elevation in feet, when known.
    pub elevation_ft: Option<f32>,
    /// Human-readable name, when known.
    pub name: Option<String>,
}

impl Station {
    pub fn new(icao: &str, lat: f64, lon: f64) -> Self {
        Self {
            icao: icao.to_uppercase(),
            lat,
            lon,
            elevation_ft: None,
            name: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Great-circle distance from this station to a point, in NM.
    pub fn distance_to(&self, lat: f64, lon: f64) -> f64 {
        crate::geo::great_circle_nm(self.lat, self.lon, lat, lon)
    }
}

/// Injection scope: a specific station or the whole world.
///
/// The simulator's weather interface addresses observations either to a
/// station identifier or to the reserved `GLOB` pseudo-station.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Station(String),
    Global,
}

impl Scope {
    /// The identifier emitted in the synthesized METAR.
    pub fn id(&self) -> &str {
        match self {
            Self::Station(icao) => icao,
            Self::Global => "GLOB",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
