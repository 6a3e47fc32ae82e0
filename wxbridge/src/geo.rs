//! Great-circle geometry helpers.
//!
//! Distances are computed on a spherical Earth and expressed in nautical
//! miles, the unit used for station-selection radii.

/// Mean Earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// Great-circle distance between two points in nautical miles.
///
/// Uses the haversine formula, which is numerically stable for the short
/// distances involved in station selection.
///
/// # Arguments
///
/// * `lat1`, `lon1` - First point in decimal degrees
/// * `lat2`, `lon2` - Second point in decimal degrees
pub fn great_circle_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_NM * c
}

/// Shortest signed angular difference `target - current` in degrees.
///
/// The result is normalized to `-180.0..=180.0`, so adding it to `current`
/// always takes the short way around the compass.
pub fn shortest_arc_deg(current: f32, target: f32) -> f32 {
    let mut diff = target - current;
    while diff > 180.0 {
        diff -= 360.0;
    }
    while diff < -180.0 {
        diff += 360.0;
    }
    diff
}

/// Normalize a heading to `0.0..360.0` degrees.
pub fn normalize_deg(mut deg: f32) -> f32 {
    while deg < 0.0 {
        deg += 360.0;
    }
    while deg >= 360.0 {
        deg -= 360.0;
    }
    deg
}
