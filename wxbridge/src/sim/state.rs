//! Aircraft state snapshot and its source trait.

use std::future::Future;

/// One snapshot of the simulated aircraft.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AircraftState {
    /// Latitude in degrees (-90 to 90).
    pub lat: f64,
    /// Longitude in degrees (-180 to 180).
    pub lon: f64,
    /// Altitude in feet, in whatever reference the source reports
    /// (MSL for the stock FSUIPC-style bridge). The approach-freeze
    /// altitude is compared directly against this value.
    pub altitude_ft: f32,
    /// Ground speed in knots.
    pub ground_speed_kt: f32,
    /// Magnetic heading in degrees.
    pub heading_deg: f32,
    /// Weight on wheels.
    pub on_ground: bool,
}

impl AircraftState {
    /// True if the position is inside the valid coordinate range.
    pub fn has_valid_position(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Source of aircraft state, polled once per tick.
///
/// Returning `None` means "no data this tick" - a disconnected sim, a
/// loading screen - and makes the engine skip the tick while preserving
/// all state. It is not an error.
pub trait AircraftStateSource: Send {
    fn fetch_state(&mut self) -> impl Future<Output = Option<AircraftState>> + Send;
}

/// A source that always reports the same position.
///
/// Useful for running the engine without a simulator attached (the CLI's
/// `--lat`/`--lon` mode) and in tests.
#[derive(Debug, Clone)]
pub struct FixedStateSource {
    state: AircraftState,
}

impl FixedStateSource {
    pub fn new(lat: f64, lon: f64, altitude_ft: f32) -> Self {
        Self {
            state: AircraftState {
                lat,
                lon,
                altitude_ft,
                ground_speed_kt: 0.0,
                heading_deg: 0.0,
                on_ground: false,
            },
        }
    }
}

impl AircraftStateSource for FixedStateSource {
    async fn fetch_state(&mut self) -> Option<AircraftState> {
        Some(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_validity() {
        let mut state = AircraftState {
            lat: 51.47,
            lon: -0.46,
            altitude_ft: 3000.0,
            ground_speed_kt: 140.0,
            heading_deg: 270.0,
            on_ground: false,
        };
        assert!(state.has_valid_position());

        state.lat = 91.0;
        assert!(!state.has_valid_position());
    }

    #[tokio::test]
    async fn test_fixed_source() {
        let mut source = FixedStateSource::new(51.47, -0.46, 3000.0);
        let state = source.fetch_state().await.unwrap();
        assert_eq!(state.lat, 51.47);
        assert!(!state.on_ground);
    }
}
