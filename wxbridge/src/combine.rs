//! METAR/TAF combining.
//!
//! Per station and tick, merges the parsed observation and forecast into a
//! single [`TargetWeather`] according to the configured mode. The combiner
//! is a pure function: it never invents data, and when both sources are
//! missing it yields nothing so the engine skips the scope for the tick.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::{CombiningMode, CombiningSettings};
use crate::metar::{ParsedMetar, WeatherBlock};
use crate::station::Scope;
use crate::taf::ParsedTaf;

/// Where a target's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// METAR alone.
    Metar,
    /// TAF substituted for a missing or stale METAR.
    TafFallback,
    /// METAR with absent fields filled from the active TAF group.
    ForecastAssisted,
}

/// The fully-resolved desired weather for one scope at this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetWeather {
    pub scope: Scope,
    pub block: WeatherBlock,
    pub provenance: Provenance,
}

/// Combine observation and forecast for one scope.
///
/// `metar_age` is the time since the METAR was issued, carried by the
/// fetch result so staleness is a property of the data rather than of the
/// local clock.
pub fn combine(
    scope: Scope,
    metar: Option<&ParsedMetar>,
    metar_age: Option<Duration>,
    taf: Option<&ParsedTaf>,
    settings: &CombiningSettings,
    now: DateTime<Utc>,
) -> Option<TargetWeather> {
    let metar = metar.filter(|m| m.is_usable());
    let active_taf = taf.filter(|t| t.is_valid_at(now));

    let (block, provenance) = match settings.mode {
        CombiningMode::MetarOnly => {
            let metar = metar?;
            (metar.block.clone(), Provenance::Metar)
        }

        CombiningMode::MetarTafFallback => {
            let stale = metar_age.map_or(false, |age| age > settings.stale_after());
            match (metar, active_taf) {
                (Some(m), _) if !stale => (m.block.clone(), Provenance::Metar),
                (_, Some(t)) => (t.resolve_at(now), Provenance::TafFallback),
                // Stale observation beats no data at all.
                (Some(m), None) => (m.block.clone(), Provenance::Metar),
                (None, None) => return None,
            }
        }

        CombiningMode::MetarTafAssist => match (metar, active_taf) {
            (Some(m), Some(t)) => {
                let filled = fill_absent(m, &t.resolve_at(now));
                let provenance = if filled == m.block {
                    Provenance::Metar
                } else {
                    Provenance::ForecastAssisted
                };
                (filled, provenance)
            }
            (Some(m), None) => (m.block.clone(), Provenance::Metar),
            (None, Some(t)) => (t.resolve_at(now), Provenance::TafFallback),
            (None, None) => return None,
        },
    };

    Some(TargetWeather { scope, block, provenance })
}

/// Fill fields the METAR left absent from the forecast block.
///
/// The wind triple moves atomically: forecast wind is taken only when the
/// observation reported no wind group at all, so a direction from one
/// source is never paired with a speed from the other. An explicitly
/// clear sky (CAVOK) is an observation, not an absence, and is never
/// overwritten.
fn fill_absent(metar: &ParsedMetar, forecast: &WeatherBlock) -> WeatherBlock {
    let mut out = metar.block.clone();

    if out.wind_dir.is_none() && out.wind_speed_kt.is_none() && forecast.wind_speed_kt.is_some() {
        out.wind_dir = forecast.wind_dir;
        out.wind_speed_kt = forecast.wind_speed_kt;
        out.wind_gust_kt = forecast.wind_gust_kt;
    }
    if out.visibility_sm.is_none() {
        out.visibility_sm = forecast.visibility_sm;
    }
    if out.temperature_c.is_none() {
        out.temperature_c = forecast.temperature_c;
    }
    if out.dewpoint_c.is_none() {
        out.dewpoint_c = forecast.dewpoint_c;
    }
    if out.qnh_hpa.is_none() {
        out.qnh_hpa = forecast.qnh_hpa;
    }
    if out.clouds.is_empty() && !metar.cavok {
        out.clouds = forecast.clouds.clone();
    }
    if out.weather.is_empty() && !metar.cavok {
        out.weather = forecast.weather.clone();
    }

    out
}
