//! Weather smoothing state machine.
//!
//! The smoother owns one [`CurrentWeather`] per scope and, on each engine
//! tick, advances it toward the tick's target under per-field movement
//! limits. Three behaviours layer on top of the plain limiter:
//!
//! - **Approach freeze**: below the configured altitude (and airborne) the
//!   state stops moving entirely, so the weather does not shift under a
//!   crew on short final.
//! - **Big-change override**: when the target has moved far from the
//!   current state, movement limits are multiplied (x10, or x50 for very
//!   large deltas) and the freeze is bypassed - a safety valve so the
//!   simulator converges on reality instead of drifting for minutes.
//! - **First-sample copy**: an uninitialized state adopts the target
//!   verbatim, bypassing every limit.
//!
//! Two pacing modes exist: `step_limited` caps movement per tick, while
//! `time_based` accumulates elapsed time and releases whole steps once per
//! transition interval. In both modes movement is clamped to the remaining
//! distance, so no field ever overshoots its target.

mod change;
mod clouds;

pub use change::ChangeMagnitude;

use std::time::Duration;

use tracing::debug;

use crate::config::{SmoothingSettings, TransitionMode};
use crate::geo::{normalize_deg, shortest_arc_deg};
use crate::metar::{WeatherBlock, WindDirection};
use crate::sim::AircraftState;

/// The smoother's persistent state: the weather as last presented to the
/// simulator. Identical in shape to a target block.
pub type CurrentWeather = WeatherBlock;

/// What one smoothing tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothOutcome {
    /// Any field moved this tick.
    pub changed: bool,
    /// Size classification of the current-to-target delta.
    pub magnitude: ChangeMagnitude,
    /// The approach freeze was in force this tick.
    pub frozen: bool,
    /// The state now equals the target.
    pub converged: bool,
}

/// Per-scope smoothing state machine.
///
/// Not shared across threads; the engine owns one per scope and feeds it
/// from the single tick loop.
#[derive(Debug)]
pub struct WeatherSmoother {
    settings: SmoothingSettings,
    current: Option<CurrentWeather>,
    frozen: bool,
    /// Unreleased elapsed time in time-based mode.
    accumulated: Duration,
}

/// Per-tick movement allowances, in display units.
struct Limits {
    wind_dir_deg: f32,
    wind_speed_kt: f32,
    qnh_hpa: f32,
    visibility_sm: f32,
}

impl WeatherSmoother {
    pub fn new(settings: SmoothingSettings) -> Self {
        Self {
            settings,
            current: None,
            frozen: false,
            accumulated: Duration::ZERO,
        }
    }

    /// The weather as last computed, if initialized.
    pub fn current(&self) -> Option<&CurrentWeather> {
        self.current.as_ref()
    }

    /// Whether the approach freeze was in force on the last tick.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Advance the state one tick toward `target`.
    ///
    /// `elapsed` is the honestly-measured time since the previous tick; the
    /// time-based mode cannot be fooled by slow ticks. `aircraft` drives
    /// the freeze; `None` leaves the previous freeze state untouched.
    pub fn tick(
        &mut self,
        target: &WeatherBlock,
        aircraft: Option<&AircraftState>,
        elapsed: Duration,
    ) -> SmoothOutcome {
        if let Some(state) = aircraft {
            self.frozen =
                state.altitude_ft <= self.settings.approach_freeze_alt_ft && !state.on_ground;
        }

        // First sample: copy the target verbatim, bypassing all limits.
        let Some(current) = self.current.take() else {
            self.current = Some(target.clone());
            return SmoothOutcome {
                changed: true,
                magnitude: ChangeMagnitude::Normal,
                frozen: self.frozen,
                converged: true,
            };
        };

        let magnitude = change::classify(&current, target, &self.settings);

        if self.frozen && magnitude == ChangeMagnitude::Normal {
            let converged = current == *target;
            self.current = Some(current);
            return SmoothOutcome {
                changed: false,
                magnitude,
                frozen: true,
                converged,
            };
        }
        if self.frozen {
            debug!(%magnitude, "Big change overrides approach freeze");
        }

        let limits = self.limits_for_tick(elapsed, magnitude);

        let mut next = current.clone();
        next.wind_dir = smooth_wind_dir(current.wind_dir, target.wind_dir, limits.wind_dir_deg);
        next.wind_speed_kt =
            smooth_value(current.wind_speed_kt, target.wind_speed_kt, limits.wind_speed_kt);
        next.wind_gust_kt =
            smooth_value(current.wind_gust_kt, target.wind_gust_kt, limits.wind_speed_kt);
        if target.wind_gust_kt.is_none() {
            // The target dropped its gust; tracking a phantom gust down
            // serves nothing.
            next.wind_gust_kt = None;
        }
        if let (Some(speed), Some(gust)) = (next.wind_speed_kt, next.wind_gust_kt) {
            if gust <= speed {
                next.wind_gust_kt = None;
            }
        }
        next.qnh_hpa = smooth_value(current.qnh_hpa, target.qnh_hpa, limits.qnh_hpa);
        next.visibility_sm =
            smooth_value(current.visibility_sm, target.visibility_sm, limits.visibility_sm);

        // Temperature and dewpoint jump; thermal lag is not worth modelling.
        if target.temperature_c.is_some() {
            next.temperature_c = target.temperature_c;
        }
        if target.dewpoint_c.is_some() {
            next.dewpoint_c = target.dewpoint_c;
        }

        next.clouds = clouds::smooth_clouds(
            &current.clouds,
            &target.clouds,
            self.settings.cloud_change_threshold,
        );

        // Weather phenomena are discrete token sets; replace atomically.
        next.weather = target.weather.clone();

        let changed = next != current;
        let converged = next == *target;
        self.current = Some(next);

        SmoothOutcome {
            changed,
            magnitude,
            frozen: self.frozen,
            converged,
        }
    }

    /// Movement allowance for this tick, scaled by the change magnitude.
    fn limits_for_tick(&mut self, elapsed: Duration, magnitude: ChangeMagnitude) -> Limits {
        let multiplier = magnitude.rate_multiplier();
        let s = &self.settings;

        match s.transition_mode {
            TransitionMode::StepLimited => Limits {
                wind_dir_deg: s.max_wind_dir_change_deg * multiplier,
                wind_speed_kt: s.max_wind_speed_change_kt * multiplier,
                qnh_hpa: s.max_qnh_change_hpa * multiplier,
                visibility_sm: s.max_visibility_change * multiplier,
            },
            TransitionMode::TimeBased => {
                self.accumulated += elapsed;
                let interval = Duration::from_secs_f32(s.transition_interval_seconds);
                let mut steps = 0.0f32;
                while self.accumulated >= interval {
                    self.accumulated -= interval;
                    steps += 1.0;
                }
                Limits {
                    wind_dir_deg: s.wind_dir_step_deg * steps * multiplier,
                    wind_speed_kt: s.wind_speed_step_kt * steps * multiplier,
                    qnh_hpa: s.qnh_step_hpa * steps * multiplier,
                    // Steps are configured in meters; state is statute
                    // miles. The historical conversion is by nautical mile.
                    visibility_sm: s.visibility_step_m / 1852.0 * steps * multiplier,
                }
            }
        }
    }
}

/// Move a scalar toward its target by at most `limit`, never overshooting.
///
/// An absent target leaves the value alone; an absent current adopts the
/// target outright.
fn smooth_value(current: Option<f32>, target: Option<f32>, limit: f32) -> Option<f32> {
    match (current, target) {
        (current, None) => current,
        (None, Some(target)) => Some(target),
        (Some(current), Some(target)) => {
            Some(current + (target - current).clamp(-limit, limit))
        }
    }
}

/// Wind-direction smoothing along the shortest arc, wrapping at 0/360.
///
/// Variable direction is discrete and snaps; there is no meaningful
/// interpolation to or from `VRB`.
fn smooth_wind_dir(
    current: Option<WindDirection>,
    target: Option<WindDirection>,
    limit: f32,
) -> Option<WindDirection> {
    match (current, target) {
        (current, None) => current,
        (None, target) => target,
        (Some(WindDirection::Degrees(c)), Some(WindDirection::Degrees(t))) => {
            let step = shortest_arc_deg(c, t).clamp(-limit, limit);
            Some(WindDirection::Degrees(normalize_deg(c + step)))
        }
        (_, target @ Some(WindDirection::Variable)) => target,
        (Some(WindDirection::Variable), target) => target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metar::{CloudCover, CloudLayer};

    fn settings_step(step_kt: f32) -> SmoothingSettings {
        SmoothingSettings {
            transition_mode: TransitionMode::StepLimited,
            max_wind_dir_change_deg: 5.0,
            max_wind_speed_change_kt: step_kt,
            max_qnh_change_hpa: 0.5,
            max_visibility_change: 0.5,
            ..SmoothingSettings::default()
        }
    }

    fn settings_timed() -> SmoothingSettings {
        SmoothingSettings {
            transition_mode: TransitionMode::TimeBased,
            transition_interval_seconds: 30.0,
            wind_speed_step_kt: 2.0,
            wind_dir_step_deg: 5.0,
            qnh_step_hpa: 0.5,
            visibility_step_m: 200.0,
            // Keep wind ramps below the big-change accelerator so the
            // pacing itself is what these tests observe.
            big_change_wind_speed_kt: 50.0,
            ..SmoothingSettings::default()
        }
    }

    fn block(dir: f32, speed: f32) -> WeatherBlock {
        WeatherBlock {
            wind_dir: Some(WindDirection::Degrees(dir)),
            wind_speed_kt: Some(speed),
            visibility_sm: Some(10.0),
            temperature_c: Some(12.0),
            dewpoint_c: Some(8.0),
            qnh_hpa: Some(1015.0),
            clouds: vec![CloudLayer::new(CloudCover::Overcast, 3000.0)],
            ..WeatherBlock::default()
        }
    }

    fn airborne(altitude_ft: f32) -> AircraftState {
        AircraftState {
            lat: 51.47,
            lon: -0.46,
            altitude_ft,
            ground_speed_kt: 120.0,
            heading_deg: 270.0,
            on_ground: false,
        }
    }

    const TICK: Duration = Duration::from_secs(1);
    const INTERVAL: Duration = Duration::from_secs(30);

    #[test]
    fn test_first_sample_copies_target_verbatim() {
        let mut smoother = WeatherSmoother::new(settings_step(2.0));
        let target = block(240.0, 15.0);

        let outcome = smoother.tick(&target, None, TICK);

        assert!(outcome.changed);
        assert!(outcome.converged);
        assert_eq!(smoother.current(), Some(&target));
    }

    #[test]
    fn test_step_limited_approach_to_target() {
        let mut smoother = WeatherSmoother::new(settings_step(2.0));
        smoother.tick(&block(240.0, 10.0), None, TICK);

        let target = block(240.0, 15.0);
        smoother.tick(&target, None, TICK);
        assert_eq!(smoother.current().unwrap().wind_speed_kt, Some(12.0));
        smoother.tick(&target, None, TICK);
        assert_eq!(smoother.current().unwrap().wind_speed_kt, Some(14.0));
        // Final step clamps to the remaining distance: no overshoot.
        smoother.tick(&target, None, TICK);
        assert_eq!(smoother.current().unwrap().wind_speed_kt, Some(15.0));
    }

    #[test]
    fn test_monotone_convergence_then_stable() {
        let mut smoother = WeatherSmoother::new(settings_step(2.0));
        smoother.tick(&block(240.0, 10.0), None, TICK);
        let target = block(250.0, 20.0);

        let mut ticks = 0;
        loop {
            let outcome = smoother.tick(&target, None, TICK);
            ticks += 1;
            if !outcome.changed {
                break;
            }
            assert!(ticks < 100, "did not converge");
        }

        assert_eq!(smoother.current(), Some(&target));
        // Once converged, further ticks report no change.
        let outcome = smoother.tick(&target, None, TICK);
        assert!(!outcome.changed);
        assert!(outcome.converged);
    }

    #[test]
    fn test_no_overshoot_on_every_field() {
        let mut smoother = WeatherSmoother::new(settings_step(2.0));
        smoother.tick(&block(240.0, 10.0), None, TICK);
        let mut target = block(270.0, 30.0);
        target.qnh_hpa = Some(1025.0);
        target.visibility_sm = Some(2.0);

        let mut prev = smoother.current().unwrap().clone();
        for _ in 0..200 {
            smoother.tick(&target, None, TICK);
            let cur = smoother.current().unwrap();
            let closer = |c: Option<f32>, p: Option<f32>, t: Option<f32>| {
                let (c, p, t) = (c.unwrap(), p.unwrap(), t.unwrap());
                (t - c).abs() <= (t - p).abs() + 1e-4
            };
            assert!(closer(cur.wind_speed_kt, prev.wind_speed_kt, target.wind_speed_kt));
            assert!(closer(cur.qnh_hpa, prev.qnh_hpa, target.qnh_hpa));
            assert!(closer(cur.visibility_sm, prev.visibility_sm, target.visibility_sm));
            prev = cur.clone();
        }
        assert_eq!(smoother.current(), Some(&target));
    }

    #[test]
    fn test_time_based_wind_speed_ramp() {
        let mut smoother = WeatherSmoother::new(settings_timed());
        smoother.tick(&block(240.0, 10.0), None, TICK);
        let target = block(240.0, 30.0);

        // 30 s elapsed: one step of 2 kt.
        smoother.tick(&target, None, INTERVAL);
        assert_eq!(smoother.current().unwrap().wind_speed_kt, Some(12.0));

        // A further 270 s: nine more steps, landing exactly on target.
        for _ in 0..9 {
            smoother.tick(&target, None, INTERVAL);
        }
        assert_eq!(smoother.current().unwrap().wind_speed_kt, Some(30.0));

        let outcome = smoother.tick(&target, None, INTERVAL);
        assert!(!outcome.changed);
    }

    #[test]
    fn test_time_based_accumulates_partial_intervals() {
        let mut smoother = WeatherSmoother::new(settings_timed());
        smoother.tick(&block(240.0, 10.0), None, TICK);
        let target = block(240.0, 30.0);

        // Three 10-second ticks make one 30-second interval.
        smoother.tick(&target, None, Duration::from_secs(10));
        smoother.tick(&target, None, Duration::from_secs(10));
        assert_eq!(smoother.current().unwrap().wind_speed_kt, Some(10.0));
        smoother.tick(&target, None, Duration::from_secs(10));
        assert_eq!(smoother.current().unwrap().wind_speed_kt, Some(12.0));
    }

    #[test]
    fn test_shortest_arc_wrap_through_north() {
        let mut smoother = WeatherSmoother::new(settings_step(2.0));
        smoother.tick(&block(350.0, 10.0), None, TICK);
        let target = block(10.0, 10.0);

        let mut seen = Vec::new();
        for _ in 0..4 {
            smoother.tick(&target, None, TICK);
            if let Some(WindDirection::Degrees(d)) = smoother.current().unwrap().wind_dir {
                seen.push(d);
            }
        }
        assert_eq!(seen, vec![355.0, 0.0, 5.0, 10.0]);
    }

    #[test]
    fn test_freeze_holds_state_on_approach() {
        let mut smoother = WeatherSmoother::new(settings_step(2.0));
        smoother.tick(&block(240.0, 10.0), Some(&airborne(5000.0)), TICK);

        let target = block(240.0, 14.0);
        let outcome = smoother.tick(&target, Some(&airborne(500.0)), TICK);

        assert!(outcome.frozen);
        assert!(!outcome.changed);
        assert_eq!(smoother.current().unwrap().wind_speed_kt, Some(10.0));
    }

    #[test]
    fn test_freeze_released_above_altitude() {
        let mut smoother = WeatherSmoother::new(settings_step(2.0));
        smoother.tick(&block(240.0, 10.0), Some(&airborne(500.0)), TICK);

        let target = block(240.0, 14.0);
        smoother.tick(&target, Some(&airborne(500.0)), TICK);
        assert_eq!(smoother.current().unwrap().wind_speed_kt, Some(10.0));

        let outcome = smoother.tick(&target, Some(&airborne(2500.0)), TICK);
        assert!(!outcome.frozen);
        assert!(outcome.changed);
    }

    #[test]
    fn test_no_freeze_on_ground() {
        let mut smoother = WeatherSmoother::new(settings_step(2.0));
        let on_ground = AircraftState {
            on_ground: true,
            ..airborne(0.0)
        };
        smoother.tick(&block(240.0, 10.0), Some(&on_ground), TICK);

        let target = block(240.0, 14.0);
        let outcome = smoother.tick(&target, Some(&on_ground), TICK);
        assert!(!outcome.frozen);
        assert!(outcome.changed);
    }

    #[test]
    fn test_big_change_overrides_freeze() {
        let mut smoother = WeatherSmoother::new(settings_timed());
        let mut initial = block(240.0, 10.0);
        initial.qnh_hpa = Some(1013.0);
        smoother.tick(&initial, Some(&airborne(500.0)), TICK);

        // QNH jumps 17 hPa against a 5 hPa threshold: freeze is bypassed
        // and the step runs at ten times the configured rate.
        let mut target = block(240.0, 10.0);
        target.qnh_hpa = Some(1030.0);

        let outcome = smoother.tick(&target, Some(&airborne(500.0)), INTERVAL);
        assert!(outcome.frozen);
        assert!(outcome.changed);
        assert_eq!(outcome.magnitude, ChangeMagnitude::Big);
        // 0.5 hPa/step at the x10 big-change rate: 1013 + 5 = 1018.
        assert_eq!(smoother.current().unwrap().qnh_hpa, Some(1018.0));
    }

    #[test]
    fn test_very_big_change_runs_fifty_times_faster() {
        let mut smoother = WeatherSmoother::new(settings_step(2.0));
        smoother.tick(&block(240.0, 10.0), None, TICK);

        // 25 kt beyond the 20 kt very-big threshold.
        let target = block(240.0, 35.0);
        let outcome = smoother.tick(&target, None, TICK);

        assert_eq!(outcome.magnitude, ChangeMagnitude::VeryBig);
        // 2 kt/tick * 50 covers the whole distance in one tick.
        assert_eq!(smoother.current().unwrap().wind_speed_kt, Some(35.0));
    }

    #[test]
    fn test_temperature_jumps_immediately() {
        let mut smoother = WeatherSmoother::new(settings_step(2.0));
        smoother.tick(&block(240.0, 10.0), None, TICK);

        let mut target = block(240.0, 10.0);
        target.temperature_c = Some(25.0);
        target.dewpoint_c = Some(18.0);
        smoother.tick(&target, None, TICK);

        assert_eq!(smoother.current().unwrap().temperature_c, Some(25.0));
        assert_eq!(smoother.current().unwrap().dewpoint_c, Some(18.0));
    }

    #[test]
    fn test_absent_target_field_leaves_current_alone() {
        let mut smoother = WeatherSmoother::new(settings_step(2.0));
        smoother.tick(&block(240.0, 10.0), None, TICK);

        let mut target = block(240.0, 10.0);
        target.qnh_hpa = None;
        smoother.tick(&target, None, TICK);

        assert_eq!(smoother.current().unwrap().qnh_hpa, Some(1015.0));
    }

    #[test]
    fn test_gust_below_speed_is_dropped() {
        let mut smoother = WeatherSmoother::new(settings_step(2.0));
        let mut initial = block(240.0, 20.0);
        initial.wind_gust_kt = Some(35.0);
        smoother.tick(&initial, None, TICK);

        // Target keeps the gust while the mean rises to meet it.
        let mut target = block(240.0, 34.0);
        target.wind_gust_kt = Some(35.0);
        for _ in 0..200 {
            smoother.tick(&target, None, TICK);
        }
        let current = smoother.current().unwrap();
        assert_eq!(current.wind_speed_kt, Some(34.0));
        assert_eq!(current.wind_gust_kt, Some(35.0));

        // Once the target's gust disappears, so does ours.
        let target = block(240.0, 34.0);
        smoother.tick(&target, None, TICK);
        assert_eq!(smoother.current().unwrap().wind_gust_kt, None);
    }

    #[test]
    fn test_weather_tokens_replace_atomically() {
        let mut smoother = WeatherSmoother::new(settings_step(2.0));
        let mut initial = block(240.0, 10.0);
        initial.weather = vec!["-RA".to_string()];
        smoother.tick(&initial, None, TICK);

        let mut target = block(240.0, 10.0);
        target.weather = vec!["+TSRA".to_string(), "BR".to_string()];
        let outcome = smoother.tick(&target, None, TICK);

        assert!(outcome.changed);
        assert_eq!(smoother.current().unwrap().weather, target.weather);
    }

    #[test]
    fn test_variable_wind_snaps() {
        let mut smoother = WeatherSmoother::new(settings_step(2.0));
        smoother.tick(&block(240.0, 10.0), None, TICK);

        let mut target = block(240.0, 10.0);
        target.wind_dir = Some(WindDirection::Variable);
        smoother.tick(&target, None, TICK);
        assert_eq!(smoother.current().unwrap().wind_dir, Some(WindDirection::Variable));

        let target = block(100.0, 10.0);
        smoother.tick(&target, None, TICK);
        assert_eq!(
            smoother.current().unwrap().wind_dir,
            Some(WindDirection::Degrees(100.0))
        );
    }
}
