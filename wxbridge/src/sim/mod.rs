//! Simulator boundary: aircraft state in, METAR packets out.
//!
//! The engine never talks to FSUIPC, SimConnect or any other sim API
//! directly; it consumes two seams defined here:
//!
//! - [`AircraftStateSource`] - supplies the aircraft's position each tick
//! - [`InjectionSink`] - delivers framed METAR packets per scope
//!
//! Both are async traits in the `impl Future` style so implementations can
//! be network clients, FFI bridges or plain test doubles. [`LogSink`] is
//! the stock no-simulator implementation: it logs every packet and keeps
//! the last one per scope.

mod sink;
mod state;

pub use sink::{InjectionSink, LogSink, SinkError};
pub use state::{AircraftState, AircraftStateSource, FixedStateSource};
