//! wxbridge - Real-world weather streaming for FSX-class simulators
//!
//! This library fetches METAR and TAF reports for weather stations near the
//! simulated aircraft, parses them into structured weather state, smooths
//! transitions between successive reports, and re-emits a well-formed METAR
//! string for injection into the simulator.
//!
//! # High-Level API
//!
//! The [`engine`] module provides the orchestrator that drives the whole
//! cycle:
//!
//! ```ignore
//! use wxbridge::config::Config;
//! use wxbridge::engine::WeatherEngine;
//! use wxbridge::provider::{AviationWeatherProvider, ReqwestClient};
//! use wxbridge::sim::LogSink;
//! use wxbridge::station::StationRegistry;
//!
//! let config = Config::load(config_path)?;
//! let registry = StationRegistry::from_csv_path(&stations_path)?;
//! let provider = AviationWeatherProvider::new(ReqwestClient::new()?, &config.provider);
//! let engine = WeatherEngine::new(config, registry, provider, source, LogSink::new());
//!
//! engine.run(shutdown_token).await;
//! ```
//!
//! The simulator boundary is abstract: implement
//! [`sim::AircraftStateSource`] to supply aircraft position and
//! [`sim::InjectionSink`] to deliver the synthesized METAR bytes.

pub mod combine;
pub mod config;
pub mod engine;
pub mod geo;
pub mod logging;
pub mod metar;
pub mod provider;
pub mod sim;
pub mod smooth;
pub mod station;
pub mod synth;
pub mod taf;
pub mod time;

/// Version of the wxbridge library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
