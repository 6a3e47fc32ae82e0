//! Default values for all configuration sections.

use std::path::PathBuf;

use super::settings::{
    CombiningSettings, EngineSettings, LoggingSettings, ProviderSettings, SmoothingSettings,
    StationSettings,
};

/// METAR age beyond which the TAF fallback triggers.
pub const DEFAULT_TAF_FALLBACK_STALE_SECS: u64 = 300;

/// Seconds between time-based transition steps.
pub const DEFAULT_TRANSITION_INTERVAL_SECS: f32 = 30.0;
/// Visibility change per transition step, meters.
pub const DEFAULT_VISIBILITY_STEP_M: f32 = 200.0;
/// Wind speed change per transition step, knots.
pub const DEFAULT_WIND_SPEED_STEP_KT: f32 = 2.0;
/// Wind direction change per transition step, degrees.
pub const DEFAULT_WIND_DIR_STEP_DEG: f32 = 5.0;
/// QNH change per transition step, hectopascals.
pub const DEFAULT_QNH_STEP_HPA: f32 = 0.5;

/// Cloud layer matching threshold, feet.
pub const DEFAULT_CLOUD_CHANGE_THRESHOLD_FT: f32 = 1000.0;
/// Altitude below which smoothing freezes on approach, feet.
pub const DEFAULT_APPROACH_FREEZE_ALT_FT: f32 = 1000.0;

/// Big-change threshold for wind direction, degrees.
pub const DEFAULT_BIG_CHANGE_WIND_DEG: f32 = 30.0;
/// Big-change threshold for wind speed, knots.
pub const DEFAULT_BIG_CHANGE_WIND_SPEED_KT: f32 = 10.0;
/// Big-change threshold for QNH, hectopascals.
pub const DEFAULT_BIG_CHANGE_QNH_HPA: f32 = 5.0;

/// Station search radius, nautical miles.
pub const DEFAULT_RADIUS_NM: f64 = 50.0;
/// Maximum stations injected per tick.
pub const DEFAULT_MAX_STATIONS: usize = 3;

/// AviationWeather.gov data API.
pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://aviationweather.gov/api/data";
/// Provider cache TTL, seconds.
pub const DEFAULT_PROVIDER_CACHE_SECS: u64 = 45;
/// Per-fetch network timeout, seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Engine tick cadence, seconds.
pub const DEFAULT_TICK_INTERVAL_SECS: f32 = 1.0;
/// Steady-state injection pacing, seconds.
pub const DEFAULT_INJECTION_INTERVAL_SECS: f32 = 60.0;
/// Injection pacing while a big change is transitioning, seconds.
pub const DEFAULT_TRANSITION_INJECTION_INTERVAL_SECS: f32 = 30.0;

impl Default for CombiningSettings {
    fn default() -> Self {
        Self {
            mode: Default::default(),
            taf_fallback_stale_seconds: DEFAULT_TAF_FALLBACK_STALE_SECS,
        }
    }
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            transition_mode: Default::default(),
            max_wind_dir_change_deg: DEFAULT_WIND_DIR_STEP_DEG,
            max_wind_speed_change_kt: DEFAULT_WIND_SPEED_STEP_KT,
            max_qnh_change_hpa: DEFAULT_QNH_STEP_HPA,
            max_visibility_change: 0.5,
            transition_interval_seconds: DEFAULT_TRANSITION_INTERVAL_SECS,
            wind_dir_step_deg: DEFAULT_WIND_DIR_STEP_DEG,
            wind_speed_step_kt: DEFAULT_WIND_SPEED_STEP_KT,
            qnh_step_hpa: DEFAULT_QNH_STEP_HPA,
            visibility_step_m: DEFAULT_VISIBILITY_STEP_M,
            cloud_change_threshold: DEFAULT_CLOUD_CHANGE_THRESHOLD_FT,
            approach_freeze_alt_ft: DEFAULT_APPROACH_FREEZE_ALT_FT,
            big_change_wind_deg: DEFAULT_BIG_CHANGE_WIND_DEG,
            big_change_wind_speed_kt: DEFAULT_BIG_CHANGE_WIND_SPEED_KT,
            big_change_qnh_hpa: DEFAULT_BIG_CHANGE_QNH_HPA,
        }
    }
}

impl Default for StationSettings {
    fn default() -> Self {
        Self {
            radius_nm: DEFAULT_RADIUS_NM,
            max_stations: DEFAULT_MAX_STATIONS,
            fallback_to_global: true,
            database: None,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_BASE_URL.to_string(),
            cache_seconds: DEFAULT_PROVIDER_CACHE_SECS,
            request_timeout_seconds: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval_seconds: DEFAULT_TICK_INTERVAL_SECS,
            injection_interval_seconds: DEFAULT_INJECTION_INTERVAL_SECS,
            transition_injection_interval_seconds: DEFAULT_TRANSITION_INJECTION_INTERVAL_SECS,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file: "wxbridge.log".to_string(),
        }
    }
}
