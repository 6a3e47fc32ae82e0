//! METAR parsing and the core weather vocabulary.
//!
//! This module defines the structured types shared by every stage of the
//! engine (cloud layers, wind direction, the generic weather block) and the
//! pragmatic METAR parser that produces them.
//!
//! The parser recognizes the common token set and skips anything it does
//! not understand; an unknown token is never fatal. Fields that do not
//! appear in the report stay `None` - nothing is fabricated at parse time.

mod parser;

pub use parser::{parse_metar, ParseError};
pub(crate) use parser::{consume_block_token, is_icao};

use chrono::{DateTime, Utc};

/// Cloud coverage of a single layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudCover {
    /// 1-2 oktas (`FEW`).
    Few,
    /// 3-4 oktas (`SCT`).
    Scattered,
    /// 5-7 oktas (`BKN`).
    Broken,
    /// 8 oktas (`OVC`), also used for vertical-visibility layers.
    Overcast,
}

impl CloudCover {
    /// The METAR code for this coverage.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Few => "FEW",
            Self::Scattered => "SCT",
            Self::Broken => "BKN",
            Self::Overcast => "OVC",
        }
    }

    /// Parse a METAR coverage code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "FEW" => Some(Self::Few),
            "SCT" => Some(Self::Scattered),
            "BKN" => Some(Self::Broken),
            "OVC" => Some(Self::Overcast),
            _ => None,
        }
    }
}

/// A single cloud layer.
///
/// The base is kept as a float because the smoother interpolates layer
/// bases between reports; parsed values are always whole hundreds of feet.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudLayer {
    pub cover: CloudCover,
    /// Layer base above the station in feet.
    pub base_ft: f32,
}

impl CloudLayer {
    pub fn new(cover: CloudCover, base_ft: f32) -> Self {
        Self { cover, base_ft }
    }
}

/// Reported wind direction.
///
/// Absence (calm / not reported) is expressed as `Option<WindDirection>`
/// on the containing block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindDirection {
    /// True direction the wind blows from, degrees `0.0..360.0`.
    Degrees(f32),
    /// Variable direction (`VRB`).
    Variable,
}

impl WindDirection {
    /// The direction in degrees, if fixed.
    pub fn degrees(&self) -> Option<f32> {
        match self {
            Self::Degrees(d) => Some(*d),
            Self::Variable => None,
        }
    }
}

/// One station's weather at a point in time.
///
/// This is the shape shared by METAR observations, TAF forecast groups,
/// combined targets and the smoother's persistent state. Every field is
/// optional; `None` means "not reported" and is left untouched by the
/// stages downstream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherBlock {
    pub wind_dir: Option<WindDirection>,
    pub wind_speed_kt: Option<f32>,
    pub wind_gust_kt: Option<f32>,
    /// Prevailing visibility in statute miles; 10.0 encodes "10 or more".
    pub visibility_sm: Option<f32>,
    pub temperature_c: Option<f32>,
    pub dewpoint_c: Option<f32>,
    pub qnh_hpa: Option<f32>,
    /// Cloud layers ordered as reported.
    pub clouds: Vec<CloudLayer>,
    /// Present-weather codes in reported order (e.g. `-RA`, `+TSRA`, `BR`).
    pub weather: Vec<String>,
}

impl WeatherBlock {
    /// True if no field of the block carries a value.
    pub fn is_empty(&self) -> bool {
        self.wind_dir.is_none()
            && self.wind_speed_kt.is_none()
            && self.wind_gust_kt.is_none()
            && self.visibility_sm.is_none()
            && self.temperature_c.is_none()
            && self.dewpoint_c.is_none()
            && self.qnh_hpa.is_none()
            && self.clouds.is_empty()
            && self.weather.is_empty()
    }

    /// Overlay `other` onto `self`: fields present in `other` win.
    ///
    /// Cloud and weather lists replace wholesale when non-empty in `other`;
    /// the wind triple (direction, speed, gust) moves atomically so a
    /// direction from one source is never paired with a speed from another.
    pub fn overlaid_with(&self, other: &WeatherBlock) -> WeatherBlock {
        let mut out = self.clone();
        if other.wind_dir.is_some() || other.wind_speed_kt.is_some() {
            out.wind_dir = other.wind_dir;
            out.wind_speed_kt = other.wind_speed_kt;
            out.wind_gust_kt = other.wind_gust_kt;
        }
        if other.visibility_sm.is_some() {
            out.visibility_sm = other.visibility_sm;
        }
        if other.temperature_c.is_some() {
            out.temperature_c = other.temperature_c;
        }
        if other.dewpoint_c.is_some() {
            out.dewpoint_c = other.dewpoint_c;
        }
        if other.qnh_hpa.is_some() {
            out.qnh_hpa = other.qnh_hpa;
        }
        if !other.clouds.is_empty() {
            out.clouds = other.clouds.clone();
        }
        if !other.weather.is_empty() {
            out.weather = other.weather.clone();
        }
        out
    }
}

/// A parsed METAR report.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMetar {
    /// 4-letter station identifier.
    pub icao: String,
    /// Issue time reconstructed from the `DDHHMM`Z group.
    pub issued_at: Option<DateTime<Utc>>,
    /// Observed conditions.
    pub block: WeatherBlock,
    /// Reported wind variability range (`dddVddd`), degrees.
    pub wind_variability: Option<(u16, u16)>,
    /// Report carried the `CAVOK` group.
    pub cavok: bool,
    /// Fully automated report (`AUTO`).
    pub auto: bool,
    /// The original report text.
    pub raw: String,
}

impl ParsedMetar {
    /// True if the report carries enough data to drive an injection.
    ///
    /// Mirrors what the simulator minimally needs: a station plus either a
    /// wind group or a pressure group.
    pub fn is_usable(&self) -> bool {
        self.block.wind_speed_kt.is_some() || self.block.qnh_hpa.is_some()
    }
}
