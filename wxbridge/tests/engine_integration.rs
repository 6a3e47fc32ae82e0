//! End-to-end engine tests: select, fetch, combine, smooth, synthesize,
//! inject, against in-memory doubles for the provider, the aircraft state
//! source and the injection sink.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use wxbridge::config::{CombiningMode, Config, TransitionMode};
use wxbridge::engine::WeatherEngine;
use wxbridge::provider::{ProviderError, RawReport, WeatherProvider};
use wxbridge::sim::{AircraftState, AircraftStateSource, InjectionSink, SinkError};
use wxbridge::station::{Scope, Station, StationRegistry};
use wxbridge::synth::MetarPacket;

// ─────────────────────────────────────────────────────────────────────────
// Test doubles
// ─────────────────────────────────────────────────────────────────────────

/// Provider serving reports from a shared map the test can rewrite.
#[derive(Clone, Default)]
struct SharedProvider {
    metars: Arc<Mutex<HashMap<String, RawReport>>>,
    tafs: Arc<Mutex<HashMap<String, RawReport>>>,
    failing: Arc<AtomicBool>,
    fetches: Arc<AtomicUsize>,
}

impl SharedProvider {
    fn set_metar(&self, icao: &str, text: &str, issued_at: DateTime<Utc>) {
        self.metars
            .lock()
            .unwrap()
            .insert(icao.to_string(), RawReport::new(text, issued_at));
    }

    fn set_taf(&self, icao: &str, text: &str, issued_at: DateTime<Utc>) {
        self.tafs
            .lock()
            .unwrap()
            .insert(icao.to_string(), RawReport::new(text, issued_at));
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn subset(
        map: &Mutex<HashMap<String, RawReport>>,
        icaos: &[String],
    ) -> HashMap<String, RawReport> {
        let map = map.lock().unwrap();
        icaos
            .iter()
            .filter_map(|icao| map.get(icao).map(|r| (icao.clone(), r.clone())))
            .collect()
    }
}

impl WeatherProvider for SharedProvider {
    async fn fetch_metar(
        &self,
        icaos: &[String],
    ) -> Result<HashMap<String, RawReport>, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Http("connection refused".into()));
        }
        Ok(Self::subset(&self.metars, icaos))
    }

    async fn fetch_taf(
        &self,
        icaos: &[String],
    ) -> Result<HashMap<String, RawReport>, ProviderError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Http("connection refused".into()));
        }
        Ok(Self::subset(&self.tafs, icaos))
    }
}

/// Aircraft source reading from a slot the test can rewrite.
#[derive(Clone, Default)]
struct SharedSource {
    state: Arc<Mutex<Option<AircraftState>>>,
}

impl SharedSource {
    fn set(&self, state: Option<AircraftState>) {
        *self.state.lock().unwrap() = state;
    }
}

impl AircraftStateSource for SharedSource {
    async fn fetch_state(&mut self) -> Option<AircraftState> {
        *self.state.lock().unwrap()
    }
}

/// Sink recording every accepted packet, with a failure switch.
#[derive(Clone, Default)]
struct RecordingSink {
    injections: Arc<Mutex<Vec<(Scope, String)>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingSink {
    fn injected(&self) -> Vec<(Scope, String)> {
        self.injections.lock().unwrap().clone()
    }

    fn last_metar_for(&self, scope: &Scope) -> Option<String> {
        self.injections
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(s, _)| s == scope)
            .map(|(_, m)| m.clone())
    }
}

impl InjectionSink for RecordingSink {
    async fn inject(&mut self, scope: &Scope, packet: &MetarPacket) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Write("offset write rejected".into()));
        }
        self.injections
            .lock()
            .unwrap()
            .push((scope.clone(), packet.metar_str().to_string()));
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────

const TICK: Duration = Duration::from_secs(1);

fn registry() -> StationRegistry {
    StationRegistry::from_stations([
        Station::new("EGLL", 51.4775, -0.4614).with_name("London Heathrow"),
        Station::new("EGKK", 51.1481, -0.1903).with_name("London Gatwick"),
        Station::new("KJFK", 40.6398, -73.7789).with_name("John F Kennedy Intl"),
    ])
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.stations.max_stations = 1;
    // Pace nothing: every changed tick is eligible for injection.
    config.engine.injection_interval_seconds = 0.0;
    config.engine.transition_injection_interval_seconds = 0.0;
    config.smoothing.transition_mode = TransitionMode::StepLimited;
    config.smoothing.max_wind_speed_change_kt = 2.0;
    // Keep the accelerator out of pacing tests.
    config.smoothing.big_change_wind_speed_kt = 50.0;
    config.smoothing.big_change_qnh_hpa = 50.0;
    config
}

fn over_heathrow() -> AircraftState {
    AircraftState {
        lat: 51.48,
        lon: -0.46,
        altitude_ft: 4000.0,
        ground_speed_kt: 150.0,
        heading_deg: 90.0,
        on_ground: false,
    }
}

/// A METAR issued `age` ago, so staleness is controlled by the test.
fn metar_issued(icao: &str, age: Duration, body: &str) -> String {
    let issued = Utc::now() - chrono::Duration::from_std(age).unwrap();
    format!("{icao} {}Z {body}", issued.format("%d%H%M"))
}

fn taf_valid_now(icao: &str, body: &str) -> String {
    let now = Utc::now();
    let from = now - chrono::Duration::hours(2);
    let to = now + chrono::Duration::hours(6);
    format!(
        "TAF {icao} {}Z {}/{} {body}",
        from.format("%d%H%M"),
        from.format("%d%H"),
        to.format("%d%H"),
    )
}

type TestEngine = WeatherEngine<SharedProvider, SharedSource, RecordingSink>;

fn engine_with(config: Config) -> (TestEngine, SharedProvider, SharedSource, RecordingSink) {
    let provider = SharedProvider::default();
    let source = SharedSource::default();
    let sink = RecordingSink::default();
    source.set(Some(over_heathrow()));
    let engine = WeatherEngine::new(
        config,
        registry(),
        provider.clone(),
        source.clone(),
        sink.clone(),
    );
    (engine, provider, source, sink)
}

// ─────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_first_injection_copies_target_verbatim() {
    let (mut engine, provider, _source, sink) = engine_with(test_config());
    provider.set_metar(
        "EGLL",
        &metar_issued("EGLL", Duration::from_secs(60), "24015KT 10SM OVC030 12/08 Q1015"),
        Utc::now(),
    );

    let report = engine.tick(TICK).await;

    assert_eq!(report.scopes, vec![Scope::Station("EGLL".into())]);
    assert_eq!(report.injected, vec![Scope::Station("EGLL".into())]);

    let metar = sink.last_metar_for(&Scope::Station("EGLL".into())).unwrap();
    assert!(metar.starts_with("METAR EGLL "), "{metar}");
    assert!(metar.ends_with("24015KT 10SM OVC030 12/08 Q1015"), "{metar}");
}

#[tokio::test]
async fn test_no_aircraft_state_skips_tick() {
    let (mut engine, provider, source, sink) = engine_with(test_config());
    source.set(None);

    let report = engine.tick(TICK).await;

    assert!(!report.aircraft_available);
    assert!(report.scopes.is_empty());
    assert_eq!(provider.fetch_count(), 0, "no fetch without a position");
    assert!(sink.injected().is_empty());
}

#[tokio::test]
async fn test_scope_without_reports_is_skipped() {
    let (mut engine, _provider, _source, sink) = engine_with(test_config());

    let report = engine.tick(TICK).await;

    // The station was selected but has no METAR: nothing to inject, and
    // that is not an error.
    assert_eq!(report.scopes.len(), 1);
    assert!(report.injected.is_empty());
    assert!(report.failed.is_empty());
    assert!(sink.injected().is_empty());
}

#[tokio::test]
async fn test_wind_ramp_is_staged_across_ticks() {
    let (mut engine, provider, _source, sink) = engine_with(test_config());
    let scope = Scope::Station("EGLL".into());

    provider.set_metar(
        "EGLL",
        &metar_issued("EGLL", Duration::from_secs(60), "24010KT 10SM SCT035 12/08 Q1015"),
        Utc::now(),
    );
    engine.tick(TICK).await;
    assert!(sink.last_metar_for(&scope).unwrap().contains("24010KT"));

    // The next observation is 6 kt stronger; at 2 kt per tick the sink
    // sees the staircase, not the jump.
    provider.set_metar(
        "EGLL",
        &metar_issued("EGLL", Duration::from_secs(30), "24016KT 10SM SCT035 12/08 Q1015"),
        Utc::now(),
    );
    engine.tick(TICK).await;
    assert!(sink.last_metar_for(&scope).unwrap().contains("24012KT"));
    engine.tick(TICK).await;
    assert!(sink.last_metar_for(&scope).unwrap().contains("24014KT"));
    engine.tick(TICK).await;
    assert!(sink.last_metar_for(&scope).unwrap().contains("24016KT"));

    // Converged: no further injections.
    let count = sink.injected().len();
    engine.tick(TICK).await;
    assert_eq!(sink.injected().len(), count);
}

#[tokio::test]
async fn test_sink_failure_retries_and_converges() {
    let (mut engine, provider, _source, sink) = engine_with(test_config());
    let scope = Scope::Station("EGLL".into());
    provider.set_metar(
        "EGLL",
        &metar_issued("EGLL", Duration::from_secs(60), "24015KT 10SM OVC030 12/08 Q1015"),
        Utc::now(),
    );

    sink.failing.store(true, Ordering::SeqCst);
    let report = engine.tick(TICK).await;
    assert_eq!(report.failed, vec![scope.clone()]);
    assert!(report.injected.is_empty());

    // The write channel recovers; the next tick delivers the current
    // state even though the smoother has nothing new to do.
    sink.failing.store(false, Ordering::SeqCst);
    let report = engine.tick(TICK).await;
    assert_eq!(report.injected, vec![scope.clone()]);
    assert!(sink.last_metar_for(&scope).unwrap().contains("24015KT"));
}

#[tokio::test]
async fn test_provider_failure_keeps_previous_state() {
    let (mut engine, provider, _source, sink) = engine_with(test_config());
    let scope = Scope::Station("EGLL".into());
    provider.set_metar(
        "EGLL",
        &metar_issued("EGLL", Duration::from_secs(60), "24015KT 10SM OVC030 12/08 Q1015"),
        Utc::now(),
    );
    engine.tick(TICK).await;
    assert_eq!(sink.injected().len(), 1);

    provider.failing.store(true, Ordering::SeqCst);
    let report = engine.tick(TICK).await;

    // Fetch failed, previously parsed reports still drive the scope; the
    // state is converged so nothing new is written.
    assert!(report.failed.is_empty());
    assert_eq!(engine.status().metar_count, 1);
    assert!(sink.last_metar_for(&scope).unwrap().contains("24015KT"));
}

#[tokio::test]
async fn test_moving_aircraft_invalidates_old_scope() {
    let (mut engine, provider, source, sink) = engine_with(test_config());
    provider.set_metar(
        "EGLL",
        &metar_issued("EGLL", Duration::from_secs(60), "24015KT 10SM OVC030 12/08 Q1015"),
        Utc::now(),
    );
    provider.set_metar(
        "KJFK",
        &metar_issued("KJFK", Duration::from_secs(60), "31008KT 10SM FEW250 17/02 Q1020"),
        Utc::now(),
    );

    engine.tick(TICK).await;
    assert_eq!(engine.status().scopes[0].scope, Scope::Station("EGLL".into()));

    // Teleport to New York: the London scope is dropped and JFK gets a
    // fresh first-sample injection.
    source.set(Some(AircraftState {
        lat: 40.64,
        lon: -73.78,
        ..over_heathrow()
    }));
    let report = engine.tick(TICK).await;

    assert_eq!(report.scopes, vec![Scope::Station("KJFK".into())]);
    assert_eq!(report.injected, vec![Scope::Station("KJFK".into())]);
    let metar = sink.last_metar_for(&Scope::Station("KJFK".into())).unwrap();
    assert!(metar.contains("31008KT"), "{metar}");
}

#[tokio::test]
async fn test_global_fallback_scope_injects_as_glob() {
    let (mut engine, provider, source, sink) = engine_with(test_config());
    // Mid-Atlantic, west of Ireland: no station within radius, nearest
    // is still Heathrow.
    source.set(Some(AircraftState {
        lat: 48.0,
        lon: -20.0,
        ..over_heathrow()
    }));
    provider.set_metar(
        "EGLL",
        &metar_issued("EGLL", Duration::from_secs(60), "24015KT 10SM OVC030 12/08 Q1015"),
        Utc::now(),
    );

    let report = engine.tick(TICK).await;

    assert_eq!(report.injected, vec![Scope::Global]);
    let metar = sink.last_metar_for(&Scope::Global).unwrap();
    assert!(metar.starts_with("METAR GLOB "), "{metar}");
    assert!(metar.contains("24015KT"), "{metar}");
}

#[tokio::test]
async fn test_stale_metar_falls_back_to_taf() {
    let mut config = test_config();
    config.combining.mode = CombiningMode::MetarTafFallback;
    config.combining.taf_fallback_stale_seconds = 300;
    let (mut engine, provider, _source, sink) = engine_with(config);
    let scope = Scope::Station("EGLL".into());

    provider.set_metar(
        "EGLL",
        &metar_issued("EGLL", Duration::from_secs(400), "24015KT 10SM OVC030 12/08 Q1015"),
        Utc::now(),
    );
    provider.set_taf(
        "EGLL",
        &taf_valid_now("EGLL", "31020G30KT 9999 BKN040"),
        Utc::now(),
    );

    let report = engine.tick(TICK).await;

    assert_eq!(report.injected, vec![scope.clone()]);
    let metar = sink.last_metar_for(&scope).unwrap();
    // 400 s beats the 300 s threshold: forecast wind, not the observation.
    assert!(metar.contains("31020G30KT"), "{metar}");
    assert!(metar.contains("BKN040"), "{metar}");
}

#[tokio::test]
async fn test_manual_report_mode_bypasses_fetch() {
    let mut config = test_config();
    config.manual.enabled = true;
    config.manual.metar =
        Some("LFPG 191300Z 36012KT 9999 BKN025 09/04 Q1022".to_string());
    let (mut engine, provider, _source, sink) = engine_with(config);

    let report = engine.tick(TICK).await;

    assert_eq!(provider.fetch_count(), 0);
    assert_eq!(report.injected, vec![Scope::Station("LFPG".into())]);
    let metar = sink.last_metar_for(&Scope::Station("LFPG".into())).unwrap();
    assert!(metar.contains("36012KT"), "{metar}");
    assert!(metar.contains("Q1022"), "{metar}");
}

#[tokio::test]
async fn test_steady_state_respects_injection_pacing() {
    let mut config = test_config();
    // Realistic pacing: converged scopes must stay quiet.
    config.engine.injection_interval_seconds = 60.0;
    config.engine.transition_injection_interval_seconds = 30.0;
    let (mut engine, provider, _source, sink) = engine_with(config);

    provider.set_metar(
        "EGLL",
        &metar_issued("EGLL", Duration::from_secs(60), "24015KT 10SM OVC030 12/08 Q1015"),
        Utc::now(),
    );

    engine.tick(TICK).await;
    assert_eq!(sink.injected().len(), 1, "first sample always goes out");

    for _ in 0..5 {
        engine.tick(TICK).await;
    }
    assert_eq!(sink.injected().len(), 1, "converged scope stays quiet");
}
