//! The weather engine tick loop.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::combine::combine;
use crate::config::{CombiningMode, Config};
use crate::metar::{parse_metar, ParsedMetar, WeatherBlock, WindDirection};
use crate::provider::WeatherProvider;
use crate::sim::{AircraftState, AircraftStateSource, InjectionSink};
use crate::smooth::{SmoothOutcome, WeatherSmoother};
use crate::station::{Scope, SelectedScope, StationRegistry, StationSelector};
use crate::synth::synthesize_packet;
use crate::taf::{parse_taf, ParsedTaf};

// An injection is worth repeating only when the smoothed state has moved
// at least this far from what the simulator last saw.
const INJECT_WIND_DIR_DEG: f32 = 5.0;
const INJECT_WIND_SPEED_KT: f32 = 2.0;
const INJECT_QNH_HPA: f32 = 0.5;
const INJECT_VISIBILITY_SM: f32 = 0.5;

/// What one tick did, for observers and tests.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    /// Aircraft state was available this tick.
    pub aircraft_available: bool,
    /// Scopes selected this tick.
    pub scopes: Vec<Scope>,
    /// Scopes whose packet reached the sink.
    pub injected: Vec<Scope>,
    /// Scopes whose sink write failed.
    pub failed: Vec<Scope>,
}

/// Last-injection bookkeeping for one scope.
#[derive(Debug, Clone)]
pub struct ScopeStatus {
    pub scope: Scope,
    pub distance_nm: f64,
    pub last_injection_age: Option<Duration>,
}

/// Operator-facing snapshot of engine state.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub scopes: Vec<ScopeStatus>,
    pub metar_count: usize,
    pub taf_count: usize,
}

/// The weather engine orchestrator.
///
/// Owns the station registry, per-scope smoothing state and parsed-report
/// caches. Generic over its three external collaborators so tests can run
/// the full cycle against in-memory doubles.
pub struct WeatherEngine<P, A, S> {
    config: Config,
    registry: StationRegistry,
    selector: StationSelector,
    provider: P,
    aircraft: A,
    sink: S,

    smoothers: HashMap<Scope, WeatherSmoother>,
    metars: HashMap<String, (ParsedMetar, DateTime<Utc>)>,
    tafs: HashMap<String, ParsedTaf>,
    selected: Vec<SelectedScope>,
    last_injection: HashMap<Scope, Instant>,
    last_injected: HashMap<Scope, WeatherBlock>,
    last_tick: Option<Instant>,
}

impl<P, A, S> WeatherEngine<P, A, S>
where
    P: WeatherProvider,
    A: AircraftStateSource,
    S: InjectionSink,
{
    pub fn new(config: Config, registry: StationRegistry, provider: P, aircraft: A, sink: S) -> Self {
        let selector = StationSelector::new(config.stations.clone());
        Self {
            config,
            registry,
            selector,
            provider,
            aircraft,
            sink,
            smoothers: HashMap::new(),
            metars: HashMap::new(),
            tafs: HashMap::new(),
            selected: Vec::new(),
            last_injection: HashMap::new(),
            last_injected: HashMap::new(),
            last_tick: None,
        }
    }

    /// Run the tick loop until the token is cancelled.
    ///
    /// Cancellation is observed between ticks, so an in-flight tick always
    /// finishes (bounded by the provider fetch timeout) and no partial
    /// write is emitted.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            tick_interval_s = self.config.engine.tick_interval_seconds,
            stations = self.registry.len(),
            "Weather engine starting"
        );

        // If a tick overruns its slot the next one fires immediately; the
        // honest elapsed measurement below keeps time-based smoothing
        // correct either way.
        let mut interval = tokio::time::interval(self.config.engine.tick_interval());

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Weather engine shutting down");
                    break;
                }

                _ = interval.tick() => {
                    // Measure elapsed honestly: a slow tick must advance
                    // the time-based smoother by its real duration.
                    let now = Instant::now();
                    let elapsed = self
                        .last_tick
                        .map(|t| now - t)
                        .unwrap_or_else(|| self.config.engine.tick_interval());
                    self.last_tick = Some(now);

                    self.tick(elapsed).await;
                }
            }
        }
    }

    /// Execute one complete cycle.
    ///
    /// Public so hosts and tests can drive the engine deterministically;
    /// [`run`](Self::run) calls this on its own cadence.
    pub async fn tick(&mut self, elapsed: Duration) -> TickReport {
        let mut report = TickReport::default();
        let now = Utc::now();

        let aircraft = self.aircraft.fetch_state().await.filter(|s| {
            if !s.has_valid_position() {
                warn!(lat = s.lat, lon = s.lon, "Discarding implausible aircraft position");
            }
            s.has_valid_position()
        });
        report.aircraft_available = aircraft.is_some();

        let manual_report = self.config.manual.enabled && self.config.manual.metar.is_some();

        let selections = if manual_report {
            self.manual_report_selection(now)
        } else if self.config.manual.enabled {
            self.manual_station_selection()
        } else {
            match aircraft {
                Some(state) => self.selector.select(&self.registry, state.lat, state.lon),
                // Without a position there is nothing to select; keep all
                // state for the next tick.
                None => return report,
            }
        };

        self.invalidate_dropped_scopes(&selections);
        self.selected = selections;
        report.scopes = self.selected.iter().map(|s| s.scope.clone()).collect();

        let fetch_suppressed = manual_report || (self.config.manual.enabled && self.config.manual.freeze);
        if !fetch_suppressed {
            self.fetch_reports(now).await;
        }

        for selection in self.selected.clone() {
            let outcome = self.advance_scope(&selection, aircraft.as_ref(), elapsed, now);
            let Some(outcome) = outcome else { continue };

            if !self.should_inject(&selection.scope, &outcome) {
                continue;
            }

            let Some(current) = self.smoothers.get(&selection.scope).and_then(|s| s.current())
            else {
                continue;
            };
            let current = current.clone();

            let packet = match synthesize_packet(&selection.scope, &current, now) {
                Ok(packet) => packet,
                Err(e) => {
                    warn!(scope = %selection.scope, error = %e, "Failed to frame METAR");
                    continue;
                }
            };

            match self.sink.inject(&selection.scope, &packet).await {
                Ok(()) => {
                    self.last_injection.insert(selection.scope.clone(), Instant::now());
                    self.last_injected.insert(selection.scope.clone(), current);
                    report.injected.push(selection.scope.clone());
                }
                Err(e) => {
                    // The desired state has already advanced; a later
                    // successful write converges on the latest weather.
                    warn!(scope = %selection.scope, error = %e, "Injection failed, will retry");
                    report.failed.push(selection.scope.clone());
                }
            }
        }

        report
    }

    /// Operator-facing snapshot.
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            scopes: self
                .selected
                .iter()
                .map(|s| ScopeStatus {
                    scope: s.scope.clone(),
                    distance_nm: s.distance_nm,
                    last_injection_age: self.last_injection.get(&s.scope).map(|t| t.elapsed()),
                })
                .collect(),
            metar_count: self.metars.len(),
            taf_count: self.tafs.len(),
        }
    }

    /// Pinned-report mode: the configured literal METAR/TAF stand in for
    /// the fetch pipeline.
    fn manual_report_selection(&mut self, now: DateTime<Utc>) -> Vec<SelectedScope> {
        let raw = self
            .config
            .manual
            .metar
            .clone()
            .unwrap_or_default();

        let metar = match parse_metar(&raw, now) {
            Ok(metar) => metar,
            Err(e) => {
                warn!(error = %e, "Manual METAR does not parse");
                return Vec::new();
            }
        };
        let icao = metar.icao.clone();
        let issued_at = metar.issued_at.unwrap_or(now);
        self.metars.insert(icao.clone(), (metar, issued_at));

        if let Some(raw_taf) = self.config.manual.taf.clone() {
            match parse_taf(&raw_taf, now) {
                Ok(taf) => {
                    self.tafs.insert(icao.clone(), taf);
                }
                Err(e) => warn!(error = %e, "Manual TAF does not parse"),
            }
        }

        vec![SelectedScope {
            scope: Scope::Station(icao.clone()),
            station_icao: icao,
            distance_nm: 0.0,
        }]
    }

    /// Pinned-station mode: inject for one fixed station, still fetching
    /// its reports.
    fn manual_station_selection(&self) -> Vec<SelectedScope> {
        let Some(icao) = self.config.manual.icao.clone() else {
            return Vec::new();
        };
        if self.registry.get(&icao).is_none() {
            debug!(station = %icao, "Manual station not in registry, injecting anyway");
        }
        vec![SelectedScope {
            scope: Scope::Station(icao.clone()),
            station_icao: icao,
            distance_nm: 0.0,
        }]
    }

    /// Drop per-scope state for scopes that fell out of the selection.
    fn invalidate_dropped_scopes(&mut self, selections: &[SelectedScope]) {
        let keep: HashSet<&Scope> = selections.iter().map(|s| &s.scope).collect();
        let dropped: Vec<Scope> = self
            .smoothers
            .keys()
            .filter(|scope| !keep.contains(scope))
            .cloned()
            .collect();
        for scope in dropped {
            debug!(scope = %scope, "Scope left selection, discarding its state");
            self.smoothers.remove(&scope);
            self.last_injection.remove(&scope);
            self.last_injected.remove(&scope);
        }
    }

    /// Fetch and parse reports for the selected stations.
    ///
    /// A scope without data this tick is simply skipped downstream;
    /// previously parsed reports are retained.
    async fn fetch_reports(&mut self, now: DateTime<Utc>) {
        let mut icaos: Vec<String> = self
            .selected
            .iter()
            .map(|s| s.station_icao.clone())
            .collect();
        icaos.sort();
        icaos.dedup();
        if icaos.is_empty() {
            return;
        }

        let timeout = self.config.provider.request_timeout();

        match tokio::time::timeout(timeout, self.provider.fetch_metar(&icaos)).await {
            Ok(Ok(reports)) => {
                for (icao, raw) in reports {
                    match parse_metar(&raw.text, now) {
                        Ok(metar) => {
                            let issued_at = metar.issued_at.unwrap_or(raw.issued_at);
                            self.metars.insert(icao, (metar, issued_at));
                        }
                        Err(e) => warn!(station = %icao, error = %e, "Dropping unparseable METAR"),
                    }
                }
            }
            Ok(Err(e)) => warn!(error = %e, "METAR fetch failed"),
            Err(_) => warn!(timeout_s = timeout.as_secs(), "METAR fetch timed out"),
        }

        if self.config.combining.mode == CombiningMode::MetarOnly {
            return;
        }

        match tokio::time::timeout(timeout, self.provider.fetch_taf(&icaos)).await {
            Ok(Ok(reports)) => {
                for (icao, raw) in reports {
                    match parse_taf(&raw.text, now) {
                        Ok(taf) => {
                            self.tafs.insert(icao, taf);
                        }
                        Err(e) => warn!(station = %icao, error = %e, "Dropping unparseable TAF"),
                    }
                }
            }
            Ok(Err(e)) => warn!(error = %e, "TAF fetch failed"),
            Err(_) => warn!(timeout_s = timeout.as_secs(), "TAF fetch timed out"),
        }
    }

    /// Combine and smooth one scope. Returns `None` when the scope has no
    /// data this tick.
    fn advance_scope(
        &mut self,
        selection: &SelectedScope,
        aircraft: Option<&AircraftState>,
        elapsed: Duration,
        now: DateTime<Utc>,
    ) -> Option<SmoothOutcome> {
        let metar_entry = self.metars.get(&selection.station_icao);
        let metar_age = metar_entry.map(|(_, issued_at)| {
            (now - *issued_at).to_std().unwrap_or(Duration::ZERO)
        });
        let metar = metar_entry.map(|(metar, _)| metar);
        let taf = match self.config.combining.mode {
            CombiningMode::MetarOnly => None,
            _ => self.tafs.get(&selection.station_icao),
        };

        let target = combine(
            selection.scope.clone(),
            metar,
            metar_age,
            taf,
            &self.config.combining,
            now,
        )?;

        let smoother = self
            .smoothers
            .entry(selection.scope.clone())
            .or_insert_with(|| WeatherSmoother::new(self.config.smoothing.clone()));

        Some(smoother.tick(&target.block, aircraft, elapsed))
    }

    /// Decide whether this tick's state is worth writing to the sink.
    ///
    /// A scope that moved this tick uses the shorter transition pacing so
    /// staged big-change updates actually reach the simulator. A quiet
    /// scope re-injects only after the steady-state interval and only
    /// when its state differs materially from the last successful write -
    /// which is how a failed write gets retried. A scope that has never
    /// been written is always eligible.
    fn should_inject(&self, scope: &Scope, outcome: &SmoothOutcome) -> bool {
        if outcome.frozen && !outcome.changed {
            return false;
        }

        let Some(last) = self.last_injection.get(scope) else {
            return true;
        };
        let since = last.elapsed().as_secs_f32();

        if outcome.changed {
            return since >= self.config.engine.transition_injection_interval_seconds;
        }

        if since < self.config.engine.injection_interval_seconds {
            return false;
        }

        let current = self.smoothers.get(scope).and_then(|s| s.current());
        match (self.last_injected.get(scope), current) {
            (Some(last), Some(current)) => materially_different(last, current),
            _ => true,
        }
    }
}

/// Whether two states differ enough that the simulator should hear about it.
fn materially_different(last: &WeatherBlock, current: &WeatherBlock) -> bool {
    let scalar_moved = |a: Option<f32>, b: Option<f32>, threshold: f32| match (a, b) {
        (Some(a), Some(b)) => (a - b).abs() > threshold,
        (a, b) => a.is_some() != b.is_some(),
    };

    let dir_moved = match (last.wind_dir, current.wind_dir) {
        (Some(WindDirection::Degrees(a)), Some(WindDirection::Degrees(b))) => {
            crate::geo::shortest_arc_deg(a, b).abs() > INJECT_WIND_DIR_DEG
        }
        (a, b) => a != b,
    };

    dir_moved
        || scalar_moved(last.wind_speed_kt, current.wind_speed_kt, INJECT_WIND_SPEED_KT)
        || scalar_moved(last.qnh_hpa, current.qnh_hpa, INJECT_QNH_HPA)
        || scalar_moved(last.visibility_sm, current.visibility_sm, INJECT_VISIBILITY_SM)
        || scalar_moved(last.temperature_c, current.temperature_c, 2.0)
        || last.clouds != current.clouds
        || last.weather != current.weather
}
