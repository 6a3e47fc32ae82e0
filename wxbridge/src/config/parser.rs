//! INI parsing logic for converting `Ini` into a [`Config`].
//!
//! The single place where INI key names are mapped to struct fields.
//! Starts from `Config::default()` and overlays any values found in the
//! INI; unknown sections and keys are ignored.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;

use super::settings::{CombiningMode, Config, TransitionMode};
use super::ConfigError;

pub(super) fn parse_ini(ini: &Ini) -> Result<Config, ConfigError> {
    let mut config = Config::default();

    if let Some(section) = ini.section(Some("combining")) {
        if let Some(v) = section.get("mode") {
            config.combining.mode = CombiningMode::from_str(v).map_err(|_| invalid(
                "combining",
                "mode",
                v,
                "must be one of: metar_only, metar_taf_fallback, metar_taf_assist",
            ))?;
        }
        if let Some(v) = section.get("taf_fallback_stale_seconds") {
            config.combining.taf_fallback_stale_seconds =
                parse_number(v, "combining", "taf_fallback_stale_seconds")?;
        }
    }

    if let Some(section) = ini.section(Some("smoothing")) {
        if let Some(v) = section.get("transition_mode") {
            config.smoothing.transition_mode = TransitionMode::from_str(v).map_err(|_| invalid(
                "smoothing",
                "transition_mode",
                v,
                "must be one of: step_limited, time_based",
            ))?;
        }
        let s = &mut config.smoothing;
        overlay_f32(section, "smoothing", "max_wind_dir_change_deg", &mut s.max_wind_dir_change_deg)?;
        overlay_f32(section, "smoothing", "max_wind_speed_change_kt", &mut s.max_wind_speed_change_kt)?;
        overlay_f32(section, "smoothing", "max_qnh_change_hpa", &mut s.max_qnh_change_hpa)?;
        overlay_f32(section, "smoothing", "max_visibility_change", &mut s.max_visibility_change)?;
        overlay_f32(section, "smoothing", "transition_interval_seconds", &mut s.transition_interval_seconds)?;
        overlay_f32(section, "smoothing", "wind_dir_step_deg", &mut s.wind_dir_step_deg)?;
        overlay_f32(section, "smoothing", "wind_speed_step_kt", &mut s.wind_speed_step_kt)?;
        overlay_f32(section, "smoothing", "qnh_step_hpa", &mut s.qnh_step_hpa)?;
        overlay_f32(section, "smoothing", "visibility_step_m", &mut s.visibility_step_m)?;
        overlay_f32(section, "smoothing", "cloud_change_threshold", &mut s.cloud_change_threshold)?;
        overlay_f32(section, "smoothing", "approach_freeze_alt_ft", &mut s.approach_freeze_alt_ft)?;
        overlay_f32(section, "smoothing", "big_change_wind_deg", &mut s.big_change_wind_deg)?;
        overlay_f32(section, "smoothing", "big_change_wind_speed_kt", &mut s.big_change_wind_speed_kt)?;
        overlay_f32(section, "smoothing", "big_change_qnh_hpa", &mut s.big_change_qnh_hpa)?;
    }

    if let Some(section) = ini.section(Some("stations")) {
        if let Some(v) = section.get("radius_nm") {
            config.stations.radius_nm = parse_number(v, "stations", "radius_nm")?;
        }
        if let Some(v) = section.get("max_stations") {
            config.stations.max_stations = parse_number(v, "stations", "max_stations")?;
        }
        if let Some(v) = section.get("fallback_to_global") {
            config.stations.fallback_to_global = parse_bool(v, "stations", "fallback_to_global")?;
        }
        if let Some(v) = section.get("database") {
            let v = v.trim();
            if !v.is_empty() {
                config.stations.database = Some(PathBuf::from(v));
            }
        }
    }

    if let Some(section) = ini.section(Some("provider")) {
        if let Some(v) = section.get("base_url") {
            let v = v.trim();
            if !v.is_empty() {
                config.provider.base_url = v.trim_end_matches('/').to_string();
            }
        }
        if let Some(v) = section.get("cache_seconds") {
            config.provider.cache_seconds = parse_number(v, "provider", "cache_seconds")?;
        }
        if let Some(v) = section.get("request_timeout_seconds") {
            config.provider.request_timeout_seconds =
                parse_number(v, "provider", "request_timeout_seconds")?;
        }
    }

    if let Some(section) = ini.section(Some("engine")) {
        let e = &mut config.engine;
        overlay_f32(section, "engine", "tick_interval_seconds", &mut e.tick_interval_seconds)?;
        overlay_f32(section, "engine", "injection_interval_seconds", &mut e.injection_interval_seconds)?;
        overlay_f32(
            section,
            "engine",
            "transition_injection_interval_seconds",
            &mut e.transition_injection_interval_seconds,
        )?;
    }

    if let Some(section) = ini.section(Some("manual")) {
        if let Some(v) = section.get("enabled") {
            config.manual.enabled = parse_bool(v, "manual", "enabled")?;
        }
        if let Some(v) = section.get("icao") {
            let v = v.trim().to_uppercase();
            if !v.is_empty() {
                config.manual.icao = Some(v);
            }
        }
        if let Some(v) = section.get("metar") {
            let v = v.trim();
            if !v.is_empty() {
                config.manual.metar = Some(v.to_string());
            }
        }
        if let Some(v) = section.get("taf") {
            let v = v.trim();
            if !v.is_empty() {
                config.manual.taf = Some(v.to_string());
            }
        }
        if let Some(v) = section.get("freeze") {
            config.manual.freeze = parse_bool(v, "manual", "freeze")?;
        }
    }

    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = PathBuf::from(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(value: &str, section: &str, key: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "must be a number"))
}

fn parse_bool(value: &str, section: &str, key: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(invalid(section, key, value, "must be true or false")),
    }
}

fn overlay_f32(
    section: &ini::Properties,
    section_name: &str,
    key: &str,
    target: &mut f32,
) -> Result<(), ConfigError> {
    if let Some(v) = section.get(key) {
        *target = parse_number(v, section_name, key)?;
    }
    Ok(())
}
