//! HTTP client trait and implementations.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{DEFAULT_SCRAPE_RATE_LIMIT_MS, DEFAULT_USER_AGENT};
use crate::error::FetchError;
use crate::normalize::is_http_url;

use super::host_of;
use super::rate_limiter::RateLimiter;

/// Timeout for reachability probes, independent of the page fetch timeout.
const REACHABILITY_TIMEOUT: Duration = Duration::from_secs(3);

/// Trait for HTTP clients, enabling mockability in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetch a page body as text. Non-2xx responses are errors.
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError>;

    /// Cheap HEAD probe. Any failure counts as unreachable.
    async fn is_reachable(&self, url: &str) -> bool;
}

#[derive(Clone)]
pub struct FetchClientBuilder {
    rate_limit_ms: u64,
    timeout: Duration,
    user_agent: String,
}

impl Default for FetchClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchClientBuilder {
    pub fn new() -> Self {
        Self {
            rate_limit_ms: DEFAULT_SCRAPE_RATE_LIMIT_MS,
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Set the rate limit delay in milliseconds. 0 disables rate limiting.
    pub fn rate_limit_ms(mut self, ms: u64) -> Self {
        self.rate_limit_ms = ms;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn build(self) -> Result<FetchClient, reqwest::Error> {
        let inner = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()?;

        Ok(FetchClient {
            inner,
            rate_limiter: RateLimiter::new(Duration::from_millis(self.rate_limit_ms)),
        })
    }
}

/// Production HTTP client with per-host rate limiting.
pub struct FetchClient {
    inner: reqwest::Client,
    rate_limiter: RateLimiter,
}

impl FetchClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        FetchClientBuilder::new().build()
    }

    pub fn builder() -> FetchClientBuilder {
        FetchClientBuilder::new()
    }

    fn validate(url: &str) -> Result<reqwest::Url, FetchError> {
        if !is_http_url(url) {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }
        reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))
    }
}

#[async_trait]
impl HttpClient for FetchClient {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let parsed = Self::validate(url)?;

        if let Some(host) = host_of(url) {
            self.rate_limiter.wait(&host).await;
        }

        tracing::debug!(url, "network: fetching");
        let response = self.inner.get(parsed).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url, status = %status, "network: request failed");
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        tracing::debug!(url, status = %status, "network: fetched successfully");
        Ok(response.text().await?)
    }

    async fn is_reachable(&self, url: &str) -> bool {
        let Ok(parsed) = Self::validate(url) else {
            return false;
        };

        match self
            .inner
            .head(parsed)
            .timeout(REACHABILITY_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(url, error = %e, "unreachable");
                false
            }
        }
    }
}

/// Mock response for testing.
#[derive(Clone)]
pub enum MockResponse {
    Html(String),
    Status(u16),
    Error(String),
}

/// Mock HTTP client for testing.
#[derive(Default)]
pub struct MockClient {
    responses: HashMap<String, MockResponse>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: &str, response: MockResponse) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    pub fn with_html(self, url: &str, html: &str) -> Self {
        self.with_response(url, MockResponse::Html(html.to_string()))
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.with_response(url, MockResponse::Status(status))
    }

    pub fn with_error(self, url: &str, error: &str) -> Self {
        self.with_response(url, MockResponse::Error(error.to_string()))
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        match self.responses.get(url) {
            Some(MockResponse::Html(html)) => Ok(html.clone()),
            Some(MockResponse::Status(status)) => Err(FetchError::Status {
                status: *status,
                url: url.to_string(),
            }),
            Some(MockResponse::Error(e)) => Err(FetchError::Unreachable(e.clone())),
            None => Err(FetchError::Unreachable(format!(
                "No mock response for URL: {}",
                url
            ))),
        }
    }

    async fn is_reachable(&self, url: &str) -> bool {
        matches!(self.responses.get(url), Some(MockResponse::Html(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_http_urls_before_sending() {
        let client = FetchClient::builder().rate_limit_ms(0).build().unwrap();
        assert!(matches!(
            client.fetch_html("ftp://example.com/soup").await,
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(!client.is_reachable("not a url").await);
    }

    #[tokio::test]
    async fn mock_client_responses() {
        let client = MockClient::new()
            .with_html("https://a.example/soup", "<html></html>")
            .with_status("https://a.example/gone", 404)
            .with_error("https://a.example/down", "connection refused");

        assert_eq!(
            client.fetch_html("https://a.example/soup").await.unwrap(),
            "<html></html>"
        );
        assert!(matches!(
            client.fetch_html("https://a.example/gone").await,
            Err(FetchError::Status { status: 404, .. })
        ));
        assert!(client.fetch_html("https://a.example/down").await.is_err());
        assert!(client.is_reachable("https://a.example/soup").await);
        assert!(!client.is_reachable("https://a.example/gone").await);
        assert!(!client.is_reachable("https://a.example/missing").await);
    }
}
