//! Station selection driven by aircraft position.

use super::{Scope, StationRegistry};
use crate::config::StationSettings;

/// One scope the engine should inject weather for this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedScope {
    /// Where the synthesized METAR is addressed.
    pub scope: Scope,
    /// The station whose reports feed this scope. For the global scope
    /// this is the closest station on Earth, whatever its distance.
    pub station_icao: String,
    /// Distance from the aircraft to the data station, in NM.
    pub distance_nm: f64,
}

/// Picks injection scopes from the registry for an aircraft position.
///
/// Pure and deterministic: the same registry, position and settings always
/// produce the same list, ordered by ascending distance with ties broken
/// by ICAO.
#[derive(Debug, Clone)]
pub struct StationSelector {
    settings: StationSettings,
}

impl StationSelector {
    pub fn new(settings: StationSettings) -> Self {
        Self { settings }
    }

    /// Select up to `max_stations` scopes within `radius_nm` of the
    /// aircraft.
    ///
    /// When nothing qualifies and `fallback_to_global` is set, a single
    /// [`Scope::Global`] entry backed by the nearest station on Earth is
    /// returned; otherwise the list is empty. An empty registry always
    /// yields an empty list.
    pub fn select(&self, registry: &StationRegistry, lat: f64, lon: f64) -> Vec<SelectedScope> {
        let hits = registry.nearest_within(
            lat,
            lon,
            self.settings.radius_nm,
            self.settings.max_stations,
        );

        if !hits.is_empty() {
            return hits
                .into_iter()
                .map(|(station, distance_nm)| SelectedScope {
                    scope: Scope::Station(station.icao.clone()),
                    station_icao: station.icao.clone(),
                    distance_nm,
                })
                .collect();
        }

        if self.settings.fallback_to_global {
            if let Some((station, distance_nm)) = registry.nearest(lat, lon) {
                tracing::debug!(
                    station = %station.icao,
                    distance_nm = format!("{distance_nm:.0}"),
                    "No station in range, falling back to global scope"
                );
                return vec![SelectedScope {
                    scope: Scope::Global,
                    station_icao: station.icao.clone(),
                    distance_nm,
                }];
            }
        }

        Vec::new()
    }
}
