//! AviationWeather.gov data API provider.
//!
//! Fetches raw-format METAR and TAF reports in ICAO batches. Responses are
//! cached per station for a configurable TTL so the per-second tick loop
//! does not hammer the upstream API; only expired entries are refetched.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use chrono::Utc;
use regex::Regex;
use tracing::{debug, info, warn};

use super::http::AsyncHttpClient;
use super::types::{ProviderError, RawReport, WeatherProvider};
use crate::config::ProviderSettings;
use crate::time::ddhhmm_near;

fn report_time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(\d{2})(\d{2})(\d{2})Z\b").unwrap())
}

#[derive(Debug, Clone)]
struct CacheEntry {
    report: RawReport,
    fetched_at: Instant,
}

/// Provider backed by the AviationWeather.gov data API.
pub struct AviationWeatherProvider<C> {
    client: C,
    base_url: String,
    cache_seconds: u64,
    metar_cache: Mutex<HashMap<String, CacheEntry>>,
    taf_cache: Mutex<HashMap<String, CacheEntry>>,
}

impl<C: AsyncHttpClient> AviationWeatherProvider<C> {
    pub fn new(client: C, settings: &ProviderSettings) -> Self {
        Self {
            client,
            base_url: settings.base_url.clone(),
            cache_seconds: settings.cache_seconds,
            metar_cache: Mutex::new(HashMap::new()),
            taf_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Split the requested set into cache hits and stations to fetch.
    fn partition_cached(
        &self,
        cache: &Mutex<HashMap<String, CacheEntry>>,
        icaos: &[String],
    ) -> (HashMap<String, RawReport>, Vec<String>) {
        let cache = cache.lock().unwrap();
        let mut hits = HashMap::new();
        let mut misses = Vec::new();

        for icao in icaos {
            let icao = icao.to_uppercase();
            match cache.get(&icao) {
                Some(entry) if entry.fetched_at.elapsed().as_secs() < self.cache_seconds => {
                    hits.insert(icao, entry.report.clone());
                }
                _ => misses.push(icao),
            }
        }
        (hits, misses)
    }

    fn store(
        &self,
        cache: &Mutex<HashMap<String, CacheEntry>>,
        reports: &HashMap<String, RawReport>,
    ) {
        let mut cache = cache.lock().unwrap();
        let now = Instant::now();
        for (icao, report) in reports {
            cache.insert(
                icao.clone(),
                CacheEntry { report: report.clone(), fetched_at: now },
            );
        }
    }

    async fn fetch_reports(
        &self,
        product: &str,
        icaos: &[String],
        cache: &Mutex<HashMap<String, CacheEntry>>,
    ) -> Result<HashMap<String, RawReport>, ProviderError> {
        let (mut result, misses) = self.partition_cached(cache, icaos);
        if misses.is_empty() {
            return Ok(result);
        }

        let url = format!(
            "{}/{}?ids={}&format=raw&hours=1",
            self.base_url,
            product,
            misses.join(",")
        );
        debug!(product, stations = misses.len(), "Fetching reports");

        let body = self.client.get(&url).await?;
        let fetched = split_reports(&body, &misses);
        info!(
            product,
            fetched = fetched.len(),
            requested = misses.len(),
            "Report fetch complete"
        );

        self.store(cache, &fetched);
        result.extend(fetched);
        Ok(result)
    }
}

impl<C: AsyncHttpClient> WeatherProvider for AviationWeatherProvider<C> {
    async fn fetch_metar(
        &self,
        icaos: &[String],
    ) -> Result<HashMap<String, RawReport>, ProviderError> {
        self.fetch_reports("metar", icaos, &self.metar_cache).await
    }

    async fn fetch_taf(
        &self,
        icaos: &[String],
    ) -> Result<HashMap<String, RawReport>, ProviderError> {
        self.fetch_reports("taf", icaos, &self.taf_cache).await
    }
}

/// Split a raw-format response body into per-station reports.
///
/// METAR responses carry one report per line. TAF responses wrap: a line
/// starting a new report begins with `TAF` or a station identifier, and
/// indented continuation lines belong to the report above, so wrapped
/// lines are joined by whitespace before parsing.
fn split_reports(body: &str, requested: &[String]) -> HashMap<String, RawReport> {
    let mut reports: HashMap<String, RawReport> = HashMap::new();
    let now = Utc::now();

    let mut pending = String::new();
    let mut flush = |text: &str, reports: &mut HashMap<String, RawReport>| {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let Some(icao) = extract_icao(text) else {
            warn!(line = text, "Report line without a station identifier");
            return;
        };
        if !requested.iter().any(|r| r.eq_ignore_ascii_case(&icao)) {
            return;
        }
        let issued_at = report_time_pattern()
            .captures(text)
            .and_then(|caps| {
                let day = caps[1].parse().ok()?;
                let hour = caps[2].parse().ok()?;
                let minute = caps[3].parse().ok()?;
                ddhhmm_near(now, day, hour, minute)
            })
            .unwrap_or(now);
        reports.insert(icao, RawReport::new(text, issued_at));
    };

    for line in body.lines() {
        let starts_report = !line.starts_with(' ') && !line.starts_with('\t');
        if starts_report {
            flush(&pending, &mut reports);
            pending = line.to_string();
        } else {
            pending.push(' ');
            pending.push_str(line.trim());
        }
    }
    flush(&pending, &mut reports);

    reports
}

/// The station identifier of a raw report line.
fn extract_icao(text: &str) -> Option<String> {
    let mut tokens = text.split_whitespace();
    let first = tokens.next()?;
    let candidate = if matches!(first, "METAR" | "SPECI" | "TAF") {
        let second = tokens.next()?;
        if matches!(second, "AMD" | "COR") {
            tokens.next()?
        } else {
            second
        }
    } else {
        first
    };
    crate::metar::is_icao(candidate).then(|| candidate.to_string())
}
