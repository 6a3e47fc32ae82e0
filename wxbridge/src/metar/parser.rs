//! Tokenizing METAR parser.
//!
//! The report is split on whitespace and each token is classified by a
//! per-class recognizer, consumed in the order the classes appear in a
//! well-formed report. Unknown tokens are skipped. Structured parsing stops
//! at the first trend indicator (`NOSIG`, `BECMG`, `TEMPO`) or remarks
//! section (`RMK`).

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::{CloudCover, CloudLayer, ParsedMetar, WeatherBlock, WindDirection};
use crate::time::ddhhmm_near;

/// Knots per meter-per-second.
const MPS_TO_KT: f32 = 1.943_84;
/// Knots per kilometer-per-hour.
const KMH_TO_KT: f32 = 0.539_96;
/// Statute miles per meter.
const METERS_TO_SM: f32 = 1.0 / 1609.344;

/// Error for a report that could not be parsed at all.
///
/// Field-level problems never produce this; they leave the field absent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("METAR parse error at token {position}: {reason}")]
pub struct ParseError {
    /// Index of the offending whitespace-separated token.
    pub position: usize,
    pub reason: String,
}

impl ParseError {
    fn new(position: usize, reason: impl Into<String>) -> Self {
        Self { position, reason: reason.into() }
    }
}

fn wind_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{3}|VRB)(\d{2,3})(?:G(\d{2,3}))?(KT|MPS|KMH)$").unwrap())
}

fn wind_variability_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{3})V(\d{3})$").unwrap())
}

fn issue_time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{2})(\d{2})(\d{2})Z$").unwrap())
}

fn visibility_sm_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Whole ("10SM"), fractional ("1/2SM", "M1/4SM") and greater-than ("P6SM").
    PATTERN.get_or_init(|| Regex::new(r"^[MP]?(\d{1,2})(?:/(\d{1,2}))?SM$").unwrap())
}

fn visibility_meters_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{4})(?:NDV)?$").unwrap())
}

fn cloud_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(FEW|SCT|BKN|OVC)(\d{3})(?:CB|TCU)?$").unwrap())
}

fn vertical_visibility_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^VV(\d{3})$").unwrap())
}

fn temperature_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(M?\d{2})/(M?\d{2})$").unwrap())
}

fn pressure_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([QA])(\d{4})$").unwrap())
}

fn runway_visual_range_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^R\d{2}[LCR]?/").unwrap())
}

fn present_weather_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^[+-]?(?:VC)?(?:MI|BC|PR|DR|BL|SH|TS|FZ)?(?:DZ|RA|SN|SG|IC|PL|GR|GS|UP|BR|FG|FU|VA|DU|SA|HZ|PY|PO|SQ|FC|SS|DS)+$",
        )
        .unwrap()
    })
}

/// Parse one METAR report.
///
/// `reference` anchors the `DDHHMM`Z issue time to a month and year; pass
/// the current time in production.
///
/// Fails only when the report is too short to carry anything or has no
/// recognizable station identifier; every field-level problem simply
/// leaves that field absent.
pub fn parse_metar(raw: &str, reference: DateTime<Utc>) -> Result<ParsedMetar, ParseError> {
    let trimmed = raw.trim();
    if trimmed.len() < 10 {
        return Err(ParseError::new(0, "report too short"));
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let mut i = 0;

    // Optional report type marker.
    if matches!(tokens.get(i).copied(), Some("METAR" | "SPECI")) {
        i += 1;
    }

    let icao = match tokens.get(i).copied().filter(|t| is_icao(t)) {
        Some(t) => t.to_string(),
        None => return Err(ParseError::new(i, "missing station identifier")),
    };
    i += 1;

    let mut metar = ParsedMetar {
        icao,
        issued_at: None,
        block: WeatherBlock::default(),
        wind_variability: None,
        cavok: false,
        auto: false,
        raw: trimmed.to_string(),
    };

    if let Some(tok) = tokens.get(i) {
        if let Some(caps) = issue_time_pattern().captures(tok) {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let hour: u32 = caps[2].parse().unwrap_or(99);
            let minute: u32 = caps[3].parse().unwrap_or(99);
            metar.issued_at = ddhhmm_near(reference, day, hour, minute);
            i += 1;
        }
    }

    while i < tokens.len() {
        let tok = tokens[i];

        // Trend and remarks end the structured section.
        if matches!(tok, "RMK" | "NOSIG" | "BECMG" | "TEMPO") {
            break;
        }

        match tok {
            "AUTO" => {
                metar.auto = true;
                i += 1;
                continue;
            }
            "COR" | "NIL" => {
                i += 1;
                continue;
            }
            "CAVOK" => {
                metar.cavok = true;
                i += 1;
                continue;
            }
            _ => {}
        }

        if let Some(caps) = wind_variability_pattern().captures(tok) {
            let from: u16 = caps[1].parse().unwrap_or(0);
            let to: u16 = caps[2].parse().unwrap_or(0);
            if from < 360 && to < 360 {
                metar.wind_variability = Some((from, to));
            }
            i += 1;
            continue;
        }

        if let Some(caps) = temperature_pattern().captures(tok) {
            metar.block.temperature_c = parse_signed_celsius(&caps[1]);
            metar.block.dewpoint_c = parse_signed_celsius(&caps[2]);
            i += 1;
            continue;
        }

        if let Some(caps) = pressure_pattern().captures(tok) {
            let value: f32 = caps[2].parse().unwrap_or(0.0);
            metar.block.qnh_hpa = Some(match &caps[1] {
                "Q" => value,
                // A#### is inches of mercury times 100.
                _ => (value / 100.0 * 33.8639).round(),
            });
            i += 1;
            continue;
        }

        if runway_visual_range_pattern().is_match(tok) {
            i += 1;
            continue;
        }

        if consume_block_token(&mut metar.block, &tokens, &mut i) {
            continue;
        }

        // Unknown token: skip, never fatal.
        i += 1;
    }

    // CAVOK: visibility 10+, no cloud, no significant weather.
    if metar.cavok {
        metar.block.visibility_sm = Some(10.0);
        metar.block.clouds.clear();
        metar.block.weather.clear();
    }

    // A gust at or below the mean wind carries no information.
    if let (Some(speed), Some(gust)) = (metar.block.wind_speed_kt, metar.block.wind_gust_kt) {
        if gust <= speed {
            metar.block.wind_gust_kt = None;
        }
    }

    Ok(metar)
}

/// Consume one wind / visibility / cloud / weather token into `block`.
///
/// Shared with the TAF parser, whose forecast groups use the same token
/// vocabulary. Advances `i` past everything consumed (fractional visibility
/// spans two tokens) and returns whether the token was recognized.
pub(crate) fn consume_block_token(block: &mut WeatherBlock, tokens: &[&str], i: &mut usize) -> bool {
    let tok = tokens[*i];

    if let Some(caps) = wind_pattern().captures(tok) {
        let speed_raw: f32 = caps[2].parse().unwrap_or(0.0);
        let gust_raw: Option<f32> = caps.get(3).and_then(|g| g.as_str().parse().ok());
        let to_kt = match &caps[4] {
            "MPS" => MPS_TO_KT,
            "KMH" => KMH_TO_KT,
            _ => 1.0,
        };
        let speed = (speed_raw * to_kt).round();

        block.wind_dir = if &caps[1] == "VRB" {
            Some(WindDirection::Variable)
        } else {
            let deg: f32 = caps[1].parse().unwrap_or(0.0);
            // 00000KT is calm: zero speed with no meaningful direction.
            if deg == 0.0 && speed == 0.0 {
                None
            } else {
                Some(WindDirection::Degrees(deg % 360.0))
            }
        };
        block.wind_speed_kt = Some(speed);
        block.wind_gust_kt = gust_raw.map(|g| (g * to_kt).round());
        *i += 1;
        return true;
    }

    if let Some(caps) = visibility_meters_pattern().captures(tok) {
        let meters: f32 = caps[1].parse().unwrap_or(0.0);
        block.visibility_sm = Some(if meters >= 9999.0 {
            10.0
        } else {
            meters * METERS_TO_SM
        });
        *i += 1;
        return true;
    }

    // "1 1/2SM": a whole-mile token followed by a fraction token.
    if tok.len() <= 2 && tok.chars().all(|c| c.is_ascii_digit()) {
        if let Some(next) = tokens.get(*i + 1) {
            if let Some(frac) = parse_fractional_sm(next) {
                let whole: f32 = tok.parse().unwrap_or(0.0);
                block.visibility_sm = Some(whole + frac);
                *i += 2;
                return true;
            }
        }
    }

    if let Some(caps) = visibility_sm_pattern().captures(tok) {
        let num: f32 = caps[1].parse().unwrap_or(0.0);
        let value = match caps.get(2) {
            Some(den) => {
                let den: f32 = den.as_str().parse().unwrap_or(0.0);
                if den == 0.0 {
                    *i += 1;
                    return true; // malformed fraction: consume, leave absent
                }
                num / den
            }
            None => num,
        };
        block.visibility_sm = Some(value);
        *i += 1;
        return true;
    }

    if let Some(caps) = cloud_pattern().captures(tok) {
        if let Some(cover) = CloudCover::from_code(&caps[1]) {
            let hundreds: f32 = caps[2].parse().unwrap_or(0.0);
            block.clouds.push(CloudLayer::new(cover, hundreds * 100.0));
        }
        *i += 1;
        return true;
    }

    if let Some(caps) = vertical_visibility_pattern().captures(tok) {
        // Sky obscured: treat as overcast at the vertical visibility.
        let hundreds: f32 = caps[1].parse().unwrap_or(0.0);
        block.clouds.push(CloudLayer::new(CloudCover::Overcast, hundreds * 100.0));
        *i += 1;
        return true;
    }

    if matches!(tok, "SKC" | "CLR" | "NSC" | "NCD") {
        block.clouds.clear();
        *i += 1;
        return true;
    }

    if present_weather_pattern().is_match(tok) {
        block.weather.push(tok.to_string());
        *i += 1;
        return true;
    }

    false
}

fn parse_fractional_sm(tok: &str) -> Option<f32> {
    let caps = visibility_sm_pattern().captures(tok)?;
    let den: f32 = caps.get(2)?.as_str().parse().ok()?;
    if den == 0.0 {
        return None;
    }
    let num: f32 = caps[1].parse().ok()?;
    Some(num / den)
}

fn parse_signed_celsius(field: &str) -> Option<f32> {
    if let Some(stripped) = field.strip_prefix('M') {
        stripped.parse::<f32>().ok().map(|v| -v)
    } else {
        field.parse().ok()
    }
}

/// True for a 4-letter all-caps station identifier.
pub(crate) fn is_icao(token: &str) -> bool {
    token.len() == 4 && token.chars().all(|c| c.is_ascii_uppercase() && c.is_ascii_alphabetic())
}
