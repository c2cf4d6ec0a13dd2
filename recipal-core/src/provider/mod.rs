//! External recipe provider abstraction.
//!
//! Provider responses are mapped onto [`RecipeContent`] inside each
//! implementation, so provider-specific field names never reach the resolver.

mod fake;
mod spoonacular;

pub use fake::FakeProvider;
pub use spoonacular::SpoonacularClient;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::recipe::RecipeContent;

/// Extra query parameters forwarded to the provider as-is.
pub type ProviderParams = [(String, String)];

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

#[async_trait]
pub trait RecipeProvider: Send + Sync + fmt::Debug {
    /// Full recipe detail by provider id.
    async fn fetch_by_id(
        &self,
        id: i64,
        params: &ProviderParams,
    ) -> Result<RecipeContent, ProviderError>;

    /// Free-text search, one page of results.
    async fn search(
        &self,
        query: &str,
        number: u32,
        offset: u32,
        params: &ProviderParams,
    ) -> Result<Vec<RecipeContent>, ProviderError>;

    /// A random selection of recipes.
    async fn random(
        &self,
        number: u32,
        params: &ProviderParams,
    ) -> Result<Vec<RecipeContent>, ProviderError>;

    /// Provider name (e.g., "spoonacular", "fake").
    fn provider_name(&self) -> &'static str;
}
