//! Outgoing HTTP for page scraping and link checks.
//!
//! Page fetches go through [`HttpClient`] so scrapers can be tested against
//! [`MockClient`] without touching the network.

mod client;
mod rate_limiter;

pub use client::{FetchClient, FetchClientBuilder, HttpClient, MockClient, MockResponse};
pub use rate_limiter::RateLimiter;

/// Host part of a URL, used as the rate-limit key.
pub fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}
