//! Runtime configuration from environment variables.

use std::env;
use std::time::Duration;

use thiserror::Error;

/// Default Spoonacular API base URL.
pub const DEFAULT_SPOONACULAR_BASE_URL: &str = "https://api.spoonacular.com";

/// Default bound on a single upstream call (scrape or provider fetch).
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 20;

/// Default minimum spacing between requests to the same host.
pub const DEFAULT_SCRAPE_RATE_LIMIT_MS: u64 = 200;

/// Browser-like User-Agent. Many recipe sites block obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

#[derive(Debug, Clone)]
pub struct RecipalConfig {
    /// Spoonacular API key. Provider lookups fail with `NotConfigured` without it.
    pub spoonacular_api_key: Option<String>,
    pub spoonacular_base_url: String,
    pub upstream_timeout: Duration,
    pub scrape_rate_limit_ms: u64,
    pub user_agent: String,
    pub database_url: Option<String>,
}

impl Default for RecipalConfig {
    fn default() -> Self {
        Self {
            spoonacular_api_key: None,
            spoonacular_base_url: DEFAULT_SPOONACULAR_BASE_URL.to_string(),
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            scrape_rate_limit_ms: DEFAULT_SCRAPE_RATE_LIMIT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            database_url: None,
        }
    }
}

impl RecipalConfig {
    /// Load configuration from environment variables.
    ///
    /// All optional; unparseable values fall back to the default:
    /// - `SPOONACULAR_API_KEY`
    /// - `RECIPAL_SPOONACULAR_BASE_URL` (default: "https://api.spoonacular.com")
    /// - `RECIPAL_UPSTREAM_TIMEOUT_SECS` (default: 20)
    /// - `RECIPAL_SCRAPE_RATE_LIMIT_MS` (default: 200)
    /// - `RECIPAL_USER_AGENT`
    /// - `DATABASE_URL`
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let spoonacular_api_key = env::var("SPOONACULAR_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let spoonacular_base_url = env::var("RECIPAL_SPOONACULAR_BASE_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or(defaults.spoonacular_base_url);

        let upstream_timeout = env::var("RECIPAL_UPSTREAM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.upstream_timeout);

        let scrape_rate_limit_ms = env::var("RECIPAL_SCRAPE_RATE_LIMIT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.scrape_rate_limit_ms);

        let user_agent = env::var("RECIPAL_USER_AGENT").unwrap_or(defaults.user_agent);

        let database_url = env::var("DATABASE_URL").ok();

        Self {
            spoonacular_api_key,
            spoonacular_base_url,
            upstream_timeout,
            scrape_rate_limit_ms,
            user_agent,
            database_url,
        }
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RecipalConfig::default();
        assert_eq!(config.spoonacular_base_url, DEFAULT_SPOONACULAR_BASE_URL);
        assert_eq!(config.upstream_timeout, Duration::from_secs(20));
        assert!(config.spoonacular_api_key.is_none());
    }

    #[test]
    fn database_url_is_required_on_demand() {
        let config = RecipalConfig::default();
        assert!(matches!(
            config.require_database_url(),
            Err(ConfigError::MissingEnvVar(var)) if var == "DATABASE_URL"
        ));

        let config = RecipalConfig {
            database_url: Some("postgres://localhost/recipal".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.require_database_url().unwrap(),
            "postgres://localhost/recipal"
        );
    }
}
