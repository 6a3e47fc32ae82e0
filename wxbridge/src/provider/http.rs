//! HTTP client abstraction for testability.
//!
//! Providers talk to [`AsyncHttpClient`] instead of a concrete HTTP stack,
//! so tests can hand them canned response bodies. [`ReqwestClient`] is the
//! production implementation.

use std::future::Future;
use std::time::Duration;

use super::types::ProviderError;

/// Trait for asynchronous HTTP GET operations.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an HTTP GET request and returns the response body as text.
    fn get(&self, url: &str) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

/// The aviation-weather API politely asks automated clients to identify
/// themselves.
const USER_AGENT: &str = concat!("wxbridge/", env!("CARGO_PKG_VERSION"));

impl ReqwestClient {
    /// Creates a client with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Http(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl AsyncHttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::Http(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ProviderError::Http(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::Http(format!("failed to read response: {e}")))
    }
}
