//! Big-change detection.
//!
//! Classifies the delta between the current state and the tick's target.
//! A big change unlocks accelerated smoothing and overrides the approach
//! freeze; a very big change accelerates further so the simulator does not
//! spend minutes converging on conditions that have genuinely jumped.

use crate::config::SmoothingSettings;
use crate::geo::shortest_arc_deg;
use crate::metar::{CloudCover, WeatherBlock, WindDirection};

/// Visibility boundary whose crossing counts as a big change, SM.
const VISIBILITY_BOUNDARY_SM: f32 = 5.0;
/// Visibility delta that counts as a big change, SM.
const BIG_VISIBILITY_DELTA_SM: f32 = 5.0;
/// Wind-speed delta that upgrades a big change to very big, knots.
const VERY_BIG_WIND_SPEED_KT: f32 = 20.0;
/// Visibility delta that upgrades a big change to very big, SM.
const VERY_BIG_VISIBILITY_SM: f32 = 10.0;

/// Size classification of a current-to-target delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeMagnitude {
    Normal,
    Big,
    VeryBig,
}

impl ChangeMagnitude {
    /// Multiplier applied to the per-tick movement limits.
    pub fn rate_multiplier(&self) -> f32 {
        match self {
            Self::Normal => 1.0,
            Self::Big => 10.0,
            Self::VeryBig => 50.0,
        }
    }
}

impl std::fmt::Display for ChangeMagnitude {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Big => write!(f, "big"),
            Self::VeryBig => write!(f, "very big"),
        }
    }
}

/// Classify the delta between `current` and `target`.
pub(super) fn classify(
    current: &WeatherBlock,
    target: &WeatherBlock,
    settings: &SmoothingSettings,
) -> ChangeMagnitude {
    let wind_speed_delta = delta(current.wind_speed_kt, target.wind_speed_kt);
    let visibility_delta = delta(current.visibility_sm, target.visibility_sm);

    let mut big = false;

    if let (Some(WindDirection::Degrees(c)), Some(WindDirection::Degrees(t))) =
        (current.wind_dir, target.wind_dir)
    {
        if shortest_arc_deg(c, t).abs() > settings.big_change_wind_deg {
            big = true;
        }
    }

    if wind_speed_delta.map_or(false, |d| d > settings.big_change_wind_speed_kt) {
        big = true;
    }

    if delta(current.qnh_hpa, target.qnh_hpa).map_or(false, |d| d > settings.big_change_qnh_hpa) {
        big = true;
    }

    if let (Some(c), Some(t)) = (current.visibility_sm, target.visibility_sm) {
        let crosses_boundary = (c - VISIBILITY_BOUNDARY_SM) * (t - VISIBILITY_BOUNDARY_SM) < 0.0;
        if crosses_boundary || (t - c).abs() > BIG_VISIBILITY_DELTA_SM {
            big = true;
        }
    }

    // Clear sky appearing from (or collapsing into) an overcast deck is a
    // scene change, not a drift.
    let overcast = |block: &WeatherBlock| {
        block.clouds.iter().any(|l| l.cover == CloudCover::Overcast)
    };
    if (current.clouds.is_empty() && overcast(target))
        || (target.clouds.is_empty() && overcast(current))
    {
        big = true;
    }

    if !big {
        return ChangeMagnitude::Normal;
    }

    let very_big = wind_speed_delta.map_or(false, |d| d > VERY_BIG_WIND_SPEED_KT)
        || visibility_delta.map_or(false, |d| d > VERY_BIG_VISIBILITY_SM);

    if very_big {
        ChangeMagnitude::VeryBig
    } else {
        ChangeMagnitude::Big
    }
}

fn delta(current: Option<f32>, target: Option<f32>) -> Option<f32> {
    match (current, target) {
        (Some(c), Some(t)) => Some((t - c).abs()),
        _ => None,
    }
}
