//! Configuration for the weather engine.
//!
//! Settings are grouped one struct per concern and loaded from an INI file
//! at a user-supplied path. Loading starts from [`Config::default`] and
//! overlays any values found in the file, so a partial config is always
//! valid; an *invalid* value is rejected at load with a diagnostic naming
//! the section and key, and the engine does not start.
//!
//! # Example
//!
//! ```no_run
//! use wxbridge::config::Config;
//!
//! let config = Config::load("wxbridge.ini")?;
//! assert!(config.stations.radius_nm > 0.0);
//! # Ok::<(), wxbridge::config::ConfigError>(())
//! ```

mod defaults;
mod parser;
mod settings;

pub use defaults::{
    DEFAULT_APPROACH_FREEZE_ALT_FT, DEFAULT_BIG_CHANGE_QNH_HPA, DEFAULT_BIG_CHANGE_WIND_DEG,
    DEFAULT_BIG_CHANGE_WIND_SPEED_KT, DEFAULT_CLOUD_CHANGE_THRESHOLD_FT, DEFAULT_FETCH_TIMEOUT_SECS,
    DEFAULT_INJECTION_INTERVAL_SECS, DEFAULT_MAX_STATIONS, DEFAULT_PROVIDER_BASE_URL,
    DEFAULT_PROVIDER_CACHE_SECS, DEFAULT_QNH_STEP_HPA, DEFAULT_RADIUS_NM,
    DEFAULT_TAF_FALLBACK_STALE_SECS, DEFAULT_TICK_INTERVAL_SECS,
    DEFAULT_TRANSITION_INJECTION_INTERVAL_SECS, DEFAULT_TRANSITION_INTERVAL_SECS,
    DEFAULT_VISIBILITY_STEP_M, DEFAULT_WIND_DIR_STEP_DEG, DEFAULT_WIND_SPEED_STEP_KT,
};
pub use settings::{
    CombiningMode, CombiningSettings, Config, EngineSettings, LoggingSettings, ManualSettings,
    ProviderSettings, SmoothingSettings, StationSettings, TransitionMode,
};

use std::path::Path;

use ini::Ini;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load config file {path}: {message}")]
    Load { path: String, message: String },
    #[error("invalid value for [{section}] {key} = \"{value}\": {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl Config {
    /// Load configuration from an INI file, overlaying [`Config::default`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Load {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = parser::parse_ini(&ini)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that per-key parsing cannot catch.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |section: &str, key: &str, value: String, reason: &str| {
            Err(ConfigError::InvalidValue {
                section: section.to_string(),
                key: key.to_string(),
                value,
                reason: reason.to_string(),
            })
        };

        if self.stations.max_stations == 0 {
            return invalid(
                "stations",
                "max_stations",
                self.stations.max_stations.to_string(),
                "must be at least 1",
            );
        }
        if !(0.0..=500.0).contains(&self.stations.radius_nm) {
            return invalid(
                "stations",
                "radius_nm",
                self.stations.radius_nm.to_string(),
                "must be between 0 and 500",
            );
        }
        if !(10.0..=300.0).contains(&self.smoothing.transition_interval_seconds) {
            return invalid(
                "smoothing",
                "transition_interval_seconds",
                self.smoothing.transition_interval_seconds.to_string(),
                "must be between 10 and 300",
            );
        }
        if self.engine.tick_interval_seconds <= 0.0 {
            return invalid(
                "engine",
                "tick_interval_seconds",
                self.engine.tick_interval_seconds.to_string(),
                "must be positive",
            );
        }
        if self.manual.enabled && self.manual.icao.is_none() && self.manual.metar.is_none() {
            return invalid(
                "manual",
                "enabled",
                "true".to_string(),
                "requires either icao or metar to be set",
            );
        }
        Ok(())
    }
}
