//! Timestamp reconstruction for coded report times.
//!
//! METAR and TAF encode times as day-of-month plus hour/minute (`DDHHMM`)
//! with no month or year. This module reconstructs full UTC timestamps by
//! anchoring against a reference instant and resolving month boundaries.

use chrono::{DateTime, Datelike, TimeZone, Utc};

/// Reconstruct a UTC timestamp from a `DDHHMM` group.
///
/// The day/hour/minute are interpreted in the month of `reference`; if the
/// naive interpretation lands more than 15 days away, the adjacent month is
/// assumed instead (reports are never half a month old or ahead).
///
/// Returns `None` for field values no calendar accepts (day 32, hour 25).
pub fn ddhhmm_near(reference: DateTime<Utc>, day: u32, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    if day == 0 || day > 31 || hour > 24 || minute > 59 {
        return None;
    }
    // TAF validity windows use hour 24 to mean midnight at the end of the day.
    let (hour, rollover) = if hour == 24 { (23, true) } else { (hour, false) };

    // The day may not exist in every candidate month (Feb 30th), so build
    // all three interpretations and keep the one closest to the reference.
    let months = [
        previous_month(reference.year(), reference.month()),
        (reference.year(), reference.month()),
        next_month(reference.year(), reference.month()),
    ];

    months
        .iter()
        .filter_map(|&(y, m)| in_month(y, m, day, hour, minute))
        .map(|t| if rollover { t + chrono::Duration::hours(1) } else { t })
        .min_by_key(|t| (*t - reference).num_seconds().abs())
}

fn in_month(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).single()
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}
