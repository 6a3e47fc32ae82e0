//! Engine orchestration.
//!
//! [`WeatherEngine`] drives the tick cycle: read aircraft state, select
//! stations, fetch and parse reports, combine, smooth, synthesize, inject.
//! One tick runs to completion before the next begins; the only suspension
//! points are the provider fetches and the sink write.
//!
//! ```text
//! AircraftStateSource ──► selector ──► provider fetch ──► parsers
//!                                                            │
//!        InjectionSink ◄── synthesizer ◄── smoother ◄── combiner
//! ```
//!
//! The engine owns all mutable state (per-scope smoothers, parsed report
//! caches, injection bookkeeping); nothing is shared across threads. Its
//! invariant is forward progress with degraded data: a tick without
//! aircraft state, without reports or with a failing sink skips work and
//! retries later, never halts.

mod orchestrator;

pub use orchestrator::{EngineStatus, ScopeStatus, TickReport, WeatherEngine};
