//! Tokenizing TAF parser.
//!
//! Reuses the METAR parser's block recognizers for wind, visibility,
//! clouds and weather; this file only handles the TAF envelope (validity
//! window, change-group markers) and the segmentation of tokens into
//! groups.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::{GroupKind, ParsedTaf, TafGroup};
use crate::metar::{consume_block_token, is_icao, WeatherBlock};
use crate::time::ddhhmm_near;

/// Error for a TAF that could not be parsed at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("TAF parse error at token {position}: {reason}")]
pub struct ParseError {
    pub position: usize,
    pub reason: String,
}

impl ParseError {
    fn new(position: usize, reason: impl Into<String>) -> Self {
        Self { position, reason: reason.into() }
    }
}

fn issue_time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{2})(\d{2})(\d{2})Z$").unwrap())
}

fn validity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // DDHH/DDHH, with the older run-together DDHHDDHH form as fallback.
    PATTERN.get_or_init(|| Regex::new(r"^(\d{2})(\d{2})/?(\d{2})(\d{2})$").unwrap())
}

fn from_group_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^FM(\d{2})(\d{2})(\d{2})$").unwrap())
}

fn prob_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^PROB(\d{2})$").unwrap())
}

/// Parse one TAF report (multi-line reports must be joined by whitespace).
///
/// `reference` anchors all `DDHH` day/hour groups; pass the current time
/// in production. Fails only when the envelope (station identifier) is
/// missing; malformed groups degrade to absent fields.
pub fn parse_taf(raw: &str, reference: DateTime<Utc>) -> Result<ParsedTaf, ParseError> {
    let trimmed = raw.trim();
    if trimmed.len() < 10 {
        return Err(ParseError::new(0, "report too short"));
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    let mut i = 0;

    if tokens.get(i).copied() == Some("TAF") {
        i += 1;
    }
    if matches!(tokens.get(i).copied(), Some("AMD" | "COR")) {
        i += 1;
    }

    let icao = match tokens.get(i).copied().filter(|t| is_icao(t)) {
        Some(t) => t.to_string(),
        None => return Err(ParseError::new(i, "missing station identifier")),
    };
    i += 1;

    let mut taf = ParsedTaf {
        icao,
        issued_at: None,
        valid_from: None,
        valid_to: None,
        prevailing: WeatherBlock::default(),
        groups: Vec::new(),
        raw: trimmed.to_string(),
    };

    if let Some(caps) = tokens.get(i).and_then(|t| issue_time_pattern().captures(t)) {
        let day: u32 = caps[1].parse().unwrap_or(0);
        let hour: u32 = caps[2].parse().unwrap_or(99);
        let minute: u32 = caps[3].parse().unwrap_or(99);
        taf.issued_at = ddhhmm_near(reference, day, hour, minute);
        i += 1;
    }

    if let Some((from, to)) = tokens.get(i).and_then(|t| parse_window(t, reference)) {
        taf.valid_from = from;
        taf.valid_to = to;
        i += 1;
    }

    // Segment the remaining tokens into the prevailing block and change
    // groups. `current` is None while still inside the prevailing section.
    let mut current: Option<TafGroup> = None;

    while i < tokens.len() {
        let tok = tokens[i];

        if tok == "RMK" {
            break;
        }

        if let Some(caps) = from_group_pattern().captures(tok) {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let hour: u32 = caps[2].parse().unwrap_or(99);
            let minute: u32 = caps[3].parse().unwrap_or(99);
            push_group(&mut taf, current.take());
            current = Some(TafGroup {
                kind: GroupKind::From,
                from: ddhhmm_near(reference, day, hour, minute),
                to: None,
                probability: None,
                block: WeatherBlock::default(),
            });
            i += 1;
            continue;
        }

        if tok == "BECMG" || tok == "TEMPO" {
            let kind = if tok == "BECMG" { GroupKind::Becoming } else { GroupKind::Tempo };
            let window = tokens.get(i + 1).and_then(|t| parse_window(t, reference));
            push_group(&mut taf, current.take());
            current = Some(TafGroup {
                kind,
                from: window.and_then(|w| w.0),
                to: window.and_then(|w| w.1),
                probability: None,
                block: WeatherBlock::default(),
            });
            i += if window.is_some() { 2 } else { 1 };
            continue;
        }

        if let Some(caps) = prob_pattern().captures(tok) {
            let probability: u8 = caps[1].parse().unwrap_or(0);
            // PROBnn may be followed by TEMPO and/or its own window.
            let mut skip = 1;
            if tokens.get(i + 1).copied() == Some("TEMPO") {
                skip += 1;
            }
            let window = tokens.get(i + skip).and_then(|t| parse_window(t, reference));
            if window.is_some() {
                skip += 1;
            }
            push_group(&mut taf, current.take());
            current = Some(TafGroup {
                kind: GroupKind::Prob,
                from: window.and_then(|w| w.0),
                to: window.and_then(|w| w.1),
                probability: Some(probability),
                block: WeatherBlock::default(),
            });
            i += skip;
            continue;
        }

        let block = match current.as_mut() {
            Some(group) => &mut group.block,
            None => &mut taf.prevailing,
        };
        if consume_block_token(block, &tokens, &mut i) {
            continue;
        }

        // Unknown token: skip, never fatal.
        i += 1;
    }

    push_group(&mut taf, current.take());

    // FM groups run until the next FM group begins.
    let from_starts: Vec<(usize, Option<DateTime<Utc>>)> = taf
        .groups
        .iter()
        .enumerate()
        .filter(|(_, g)| g.kind == GroupKind::From)
        .map(|(idx, g)| (idx, g.from))
        .collect();
    for pair in from_starts.windows(2) {
        taf.groups[pair[0].0].to = pair[1].1;
    }

    Ok(taf)
}

fn push_group(taf: &mut ParsedTaf, group: Option<TafGroup>) {
    if let Some(group) = group {
        taf.groups.push(group);
    }
}

type Window = (Option<DateTime<Utc>>, Option<DateTime<Utc>>);

fn parse_window(token: &str, reference: DateTime<Utc>) -> Option<Window> {
    let caps = validity_pattern().captures(token)?;
    let from_day: u32 = caps[1].parse().ok()?;
    let from_hour: u32 = caps[2].parse().ok()?;
    let to_day: u32 = caps[3].parse().ok()?;
    let to_hour: u32 = caps[4].parse().ok()?;
    Some((
        ddhhmm_near(reference, from_day, from_hour, 0),
        ddhhmm_near(reference, to_day, to_hour, 0),
    ))
}
