//! TAF parsing and forecast-group resolution.
//!
//! A TAF carries prevailing conditions plus an ordered list of change
//! groups (`FM`, `BECMG`, `TEMPO`, `PROB`). [`ParsedTaf::resolve_at`]
//! collapses them into the single [`WeatherBlock`] in force at a given
//! instant, which is what the combiner consumes.

mod parser;

pub use parser::parse_taf;

use chrono::{DateTime, Utc};

use crate::metar::WeatherBlock;

/// Minimum probability at which a `PROB` group is taken into account.
const PROB_APPLY_THRESHOLD: u8 = 30;

/// Kind of a TAF change group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// `FMddhhmm` - rapid change; replaces the whole forecast block.
    From,
    /// `BECMG dddd/dddd` - gradual change; overlays the fields it names.
    Becoming,
    /// `TEMPO dddd/dddd` - temporary fluctuation within the window.
    Tempo,
    /// `PROBnn [TEMPO] dddd/dddd` - probabilistic change.
    Prob,
}

/// One change group of a TAF.
#[derive(Debug, Clone, PartialEq)]
pub struct TafGroup {
    pub kind: GroupKind,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Probability percent for `PROB` groups.
    pub probability: Option<u8>,
    /// The conditions this group forecasts. Only the fields the group
    /// names are present.
    pub block: WeatherBlock,
}

impl TafGroup {
    /// True if the group's validity window contains `at`.
    ///
    /// A missing `from` is treated as the beginning of time, a missing
    /// `to` as the end of the TAF's own validity.
    fn contains(&self, at: DateTime<Utc>, taf_valid_to: Option<DateTime<Utc>>) -> bool {
        if let Some(from) = self.from {
            if at < from {
                return false;
            }
        }
        match self.to.or(taf_valid_to) {
            Some(to) => at < to,
            None => true,
        }
    }
}

/// A parsed TAF report.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTaf {
    /// 4-letter station identifier.
    pub icao: String,
    /// Issue time reconstructed from the `DDHHMM`Z group.
    pub issued_at: Option<DateTime<Utc>>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    /// Conditions before the first change group.
    pub prevailing: WeatherBlock,
    /// Change groups in encounter order.
    pub groups: Vec<TafGroup>,
    /// The original report text.
    pub raw: String,
}

impl ParsedTaf {
    /// True if `at` falls inside the TAF's validity window.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        match (self.valid_from, self.valid_to) {
            (Some(from), Some(to)) => at >= from && at < to,
            (Some(from), None) => at >= from,
            _ => false,
        }
    }

    /// The forecast block in force at `at`.
    ///
    /// Starts from the prevailing conditions, then applies groups in
    /// encounter order: `FM` replaces the whole block once its time is
    /// reached, `BECMG` overlays the fields it names from the start of its
    /// window onward (the change is permanent), `TEMPO` overlays only
    /// while its window contains `at`, and `PROB` overlays only at
    /// probability of at least 30 percent.
    pub fn resolve_at(&self, at: DateTime<Utc>) -> WeatherBlock {
        let mut block = self.prevailing.clone();

        for group in &self.groups {
            match group.kind {
                GroupKind::From => {
                    if group.contains(at, self.valid_to) {
                        block = group.block.clone();
                    }
                }
                GroupKind::Becoming => {
                    if group.from.map_or(true, |from| at >= from) {
                        block = block.overlaid_with(&group.block);
                    }
                }
                GroupKind::Tempo => {
                    if group.contains(at, self.valid_to) {
                        block = block.overlaid_with(&group.block);
                    }
                }
                GroupKind::Prob => {
                    if group.contains(at, self.valid_to)
                        && group.probability.unwrap_or(0) >= PROB_APPLY_THRESHOLD
                    {
                        block = block.overlaid_with(&group.block);
                    }
                }
            }
        }

        block
    }
}
