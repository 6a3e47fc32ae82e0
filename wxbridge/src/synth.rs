//! METAR synthesis for injection.
//!
//! Renders a weather block as a canonical METAR string
//! (`METAR <id> <DDHHMM>Z <wind> <vis> <wx> <clouds> <T/D> <Q>`) and packs
//! it into the fixed 256-byte null-terminated buffer the simulator's
//! weather interface expects.
//!
//! Where METAR syntax requires a value the state lacks, a documented
//! default is substituted (`00000KT`, `10SM`, `CLR`, `Q1013`); an absent
//! temperature omits the group entirely, which is legal.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::metar::{CloudCover, WeatherBlock, WindDirection};
use crate::station::Scope;

/// Size of the injection buffer, terminator included.
pub const PACKET_SIZE: usize = 256;

/// QNH outside this range is replaced by the standard atmosphere; the
/// simulator rejects (or worse, misrenders) implausible pressures.
const QNH_RANGE_HPA: std::ops::RangeInclusive<f32> = 870.0..=1080.0;
const STANDARD_QNH_HPA: f32 = 1013.0;

/// Lowest cloud base emitted, hundreds of feet. Zero-base layers are
/// treated as invalid by the simulator.
const MIN_CLOUD_BASE_HUNDREDS: i32 = 5;

/// Error type for packet encoding.
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error("synthesized METAR is {0} bytes; the packet holds at most 255 plus terminator")]
    TooLong(usize),
    #[error("synthesized METAR contains non-ASCII data")]
    NotAscii,
}

/// A METAR framed for the injection sink: ASCII bytes, a null terminator,
/// and zero fill to exactly 256 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetarPacket {
    buf: [u8; PACKET_SIZE],
    len: usize,
}

impl MetarPacket {
    /// Frame a METAR string into a packet.
    pub fn encode(metar: &str) -> Result<Self, SynthError> {
        if !metar.is_ascii() {
            return Err(SynthError::NotAscii);
        }
        let bytes = metar.as_bytes();
        if bytes.len() >= PACKET_SIZE {
            return Err(SynthError::TooLong(bytes.len()));
        }
        let mut buf = [0u8; PACKET_SIZE];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self { buf, len: bytes.len() })
    }

    /// The full 256-byte buffer: METAR, NUL, zero fill.
    pub fn as_bytes(&self) -> &[u8; PACKET_SIZE] {
        &self.buf
    }

    /// The METAR text without terminator.
    pub fn metar_str(&self) -> &str {
        // Packets are only built from validated ASCII.
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }

    /// Length of the METAR text in bytes, terminator excluded.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Render a weather block as a canonical METAR for the given scope.
///
/// `now` supplies the `DDHHMM`Z group; pass the current time in
/// production.
pub fn synthesize(scope: &Scope, weather: &WeatherBlock, now: DateTime<Utc>) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(10);

    parts.push("METAR".to_string());
    parts.push(scope.id().to_string());
    parts.push(now.format("%d%H%MZ").to_string());
    parts.push(wind_group(weather));
    parts.push(visibility_group(weather.visibility_sm));
    for token in &weather.weather {
        parts.push(token.clone());
    }
    cloud_groups(&weather.clouds, &mut parts);
    if let Some(group) = temperature_group(weather.temperature_c, weather.dewpoint_c) {
        parts.push(group);
    }
    parts.push(pressure_group(weather.qnh_hpa));

    parts.join(" ")
}

/// Render and frame in one step.
pub fn synthesize_packet(
    scope: &Scope,
    weather: &WeatherBlock,
    now: DateTime<Utc>,
) -> Result<MetarPacket, SynthError> {
    MetarPacket::encode(&synthesize(scope, weather, now))
}

fn wind_group(weather: &WeatherBlock) -> String {
    let speed = weather.wind_speed_kt.map(|s| s.round() as i32).unwrap_or(0);
    if speed <= 0 {
        return "00000KT".to_string();
    }

    let gust = weather
        .wind_gust_kt
        .map(|g| g.round() as i32)
        .filter(|g| *g > speed)
        .map(|g| format!("G{g:02}"))
        .unwrap_or_default();

    match weather.wind_dir {
        Some(WindDirection::Degrees(d)) => {
            let dir = (crate::geo::normalize_deg(d).round() as i32) % 360;
            format!("{dir:03}{speed:02}{gust}KT")
        }
        // No usable direction with wind blowing reads as variable.
        Some(WindDirection::Variable) | None => format!("VRB{speed:02}{gust}KT"),
    }
}

fn visibility_group(visibility_sm: Option<f32>) -> String {
    match visibility_sm {
        None => "10SM".to_string(),
        Some(v) if v >= 10.0 => "10SM".to_string(),
        Some(v) if v < 0.25 => "M1/4SM".to_string(),
        Some(v) => format!("{}SM", (v.round() as i32).max(1)),
    }
}

fn cloud_groups(clouds: &[crate::metar::CloudLayer], parts: &mut Vec<String>) {
    if clouds.is_empty() {
        parts.push("CLR".to_string());
        return;
    }

    let mut layers: Vec<(CloudCover, i32)> = clouds
        .iter()
        .map(|l| {
            let hundreds = ((l.base_ft / 100.0).round() as i32)
                .clamp(MIN_CLOUD_BASE_HUNDREDS, 999);
            (l.cover, hundreds)
        })
        .collect();
    layers.sort_by_key(|(_, base)| *base);
    layers.truncate(3);

    for (cover, hundreds) in layers {
        parts.push(format!("{}{hundreds:03}", cover.code()));
    }
}

fn temperature_group(temperature_c: Option<f32>, dewpoint_c: Option<f32>) -> Option<String> {
    let temperature = temperature_c?.round() as i32;
    // A lone temperature gets a plausible spread rather than an
    // unparseable half-group.
    let dewpoint = dewpoint_c.map(|d| d.round() as i32).unwrap_or(temperature - 5);
    Some(format!("{}/{}", format_celsius(temperature), format_celsius(dewpoint)))
}

fn format_celsius(value: i32) -> String {
    if value < 0 {
        format!("M{:02}", -value)
    } else {
        format!("{value:02}")
    }
}

fn pressure_group(qnh_hpa: Option<f32>) -> String {
    let qnh = match qnh_hpa {
        Some(q) if QNH_RANGE_HPA.contains(&q) => q,
        Some(q) => {
            warn!(qnh_hpa = q, "QNH outside plausible range, substituting standard");
            STANDARD_QNH_HPA
        }
        None => STANDARD_QNH_HPA,
    };
    format!("Q{:04}", qnh.round() as i32)
}
