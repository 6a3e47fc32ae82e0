//! Upstream weather providers.
//!
//! The engine consumes the [`WeatherProvider`] trait: batch fetches of raw
//! METAR/TAF text per ICAO. Missing stations in a response are not errors;
//! a scope simply has no data that tick.
//!
//! [`AviationWeatherProvider`] is the stock implementation against the
//! AviationWeather.gov data API, built on an [`AsyncHttpClient`] seam so
//! tests can substitute canned responses for the network.

mod aviationweather;
mod http;
mod types;

pub use aviationweather::AviationWeatherProvider;
pub use http::{AsyncHttpClient, ReqwestClient};
pub use types::{ProviderError, RawReport, WeatherProvider};
