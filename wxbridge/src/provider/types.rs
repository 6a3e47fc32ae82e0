//! Provider types and traits.

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Utc};

/// Errors that can occur during provider operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(String),
    /// Response was received but could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// One raw report as fetched.
///
/// `issued_at` is carried with the text so staleness downstream is a pure
/// function of the data, not of when the local clock happened to fetch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReport {
    pub text: String,
    pub issued_at: DateTime<Utc>,
}

impl RawReport {
    pub fn new(text: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self { text: text.into(), issued_at }
    }
}

/// Batch fetcher for raw METAR and TAF text.
///
/// Implementations are responsible for their own caching and concurrency;
/// the engine calls these once per tick with the currently selected
/// stations. An ICAO absent from the returned map simply has no report.
pub trait WeatherProvider: Send {
    fn fetch_metar(
        &self,
        icaos: &[String],
    ) -> impl Future<Output = Result<HashMap<String, RawReport>, ProviderError>> + Send;

    fn fetch_taf(
        &self,
        icaos: &[String],
    ) -> impl Future<Output = Result<HashMap<String, RawReport>, ProviderError>> + Send;
}
