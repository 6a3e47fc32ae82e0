//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file. These
//! are pure data types; parsing and validation live in the sibling
//! modules.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// How METAR and TAF are merged into a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombiningMode {
    /// Use the METAR only; TAF is ignored.
    #[default]
    MetarOnly,
    /// Use the METAR while fresh, fall back to the active TAF group when
    /// the METAR goes stale.
    MetarTafFallback,
    /// Start from the METAR and fill absent fields from the active TAF
    /// group.
    MetarTafAssist,
}

impl FromStr for CombiningMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metar_only" => Ok(Self::MetarOnly),
            "metar_taf_fallback" => Ok(Self::MetarTafFallback),
            "metar_taf_assist" => Ok(Self::MetarTafAssist),
            _ => Err(()),
        }
    }
}

/// How the smoother paces its per-tick movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionMode {
    /// Each tick may move a field by at most its `max_*_change` ceiling.
    StepLimited,
    /// Fields move by their `*_step` size once per transition interval.
    #[default]
    TimeBased,
}

impl FromStr for TransitionMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "step_limited" => Ok(Self::StepLimited),
            "time_based" => Ok(Self::TimeBased),
            _ => Err(()),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub combining: CombiningSettings,
    pub smoothing: SmoothingSettings,
    pub stations: StationSettings,
    pub provider: ProviderSettings,
    pub engine: EngineSettings,
    pub manual: ManualSettings,
    pub logging: LoggingSettings,
}

/// `[combining]` - METAR/TAF merge behaviour.
#[derive(Debug, Clone)]
pub struct CombiningSettings {
    pub mode: CombiningMode,
    /// METAR age beyond which the TAF fallback triggers.
    pub taf_fallback_stale_seconds: u64,
}

impl CombiningSettings {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.taf_fallback_stale_seconds)
    }
}

/// `[smoothing]` - transition pacing, freeze and big-change thresholds.
#[derive(Debug, Clone)]
pub struct SmoothingSettings {
    pub transition_mode: TransitionMode,

    // Step-limited mode: per-tick ceilings.
    pub max_wind_dir_change_deg: f32,
    pub max_wind_speed_change_kt: f32,
    pub max_qnh_change_hpa: f32,
    /// Statute miles per tick.
    pub max_visibility_change: f32,

    // Time-based mode: one step per interval.
    pub transition_interval_seconds: f32,
    pub wind_dir_step_deg: f32,
    pub wind_speed_step_kt: f32,
    pub qnh_step_hpa: f32,
    /// Meters per interval; converted at 1 NM = 1852 m when applied.
    pub visibility_step_m: f32,

    /// Cloud layers within this many feet of a target layer are
    /// interpolated instead of swapped.
    pub cloud_change_threshold: f32,

    /// Below this altitude (and airborne) the smoother freezes. Compared
    /// directly against whatever altitude the aircraft-state source
    /// supplies - MSL with the stock FSUIPC-style source.
    pub approach_freeze_alt_ft: f32,

    // Big-change thresholds; exceeding any unlocks accelerated smoothing
    // and overrides the approach freeze.
    pub big_change_wind_deg: f32,
    pub big_change_wind_speed_kt: f32,
    pub big_change_qnh_hpa: f32,
}

/// `[stations]` - selector behaviour and database location.
#[derive(Debug, Clone)]
pub struct StationSettings {
    pub radius_nm: f64,
    pub max_stations: usize,
    /// When nothing is in range, inject on the global scope instead of
    /// going silent.
    pub fallback_to_global: bool,
    /// Path to the station CSV database.
    pub database: Option<PathBuf>,
}

/// `[provider]` - upstream weather source.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    /// Raw reports younger than this are served from cache.
    pub cache_seconds: u64,
    /// Per-fetch timeout; a tick never waits longer than this on the
    /// network.
    pub request_timeout_seconds: u64,
}

impl ProviderSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// `[engine]` - tick cadence and injection pacing.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub tick_interval_seconds: f32,
    /// Minimum seconds between injections for a scope under steady
    /// conditions.
    pub injection_interval_seconds: f32,
    /// Shorter pacing used while a big change is being walked in, so the
    /// staged transition actually reaches the simulator.
    pub transition_injection_interval_seconds: f32,
}

impl EngineSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f32(self.tick_interval_seconds)
    }
}

/// `[manual]` - pin the engine to a station or a literal report.
#[derive(Debug, Clone, Default)]
pub struct ManualSettings {
    pub enabled: bool,
    /// Inject for this station instead of selecting by position.
    pub icao: Option<String>,
    /// Literal METAR to use instead of fetching.
    pub metar: Option<String>,
    /// Literal TAF to use instead of fetching.
    pub taf: Option<String>,
    /// Suppress refetching while pinned.
    pub freeze: bool,
}

/// `[logging]` - log file destination.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}
