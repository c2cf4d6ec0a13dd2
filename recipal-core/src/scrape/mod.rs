//! Content scraper: turns an arbitrary recipe page into a [`ScrapedRecipe`].

mod fake;
mod html;

pub use fake::FakeScraper;
pub use html::HtmlScraper;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::{ExtractError, FetchError};
use crate::types::ScrapedRecipe;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The page was fetched but did not yield a full recipe. `partial` holds
    /// whatever was found before giving up, if anything.
    #[error("extraction failed: {source}")]
    Extract {
        source: ExtractError,
        partial: Option<Box<ScrapedRecipe>>,
    },

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl ScrapeError {
    pub fn partial(&self) -> Option<&ScrapedRecipe> {
        match self {
            ScrapeError::Extract { partial, .. } => partial.as_deref(),
            _ => None,
        }
    }

    pub fn into_partial(self) -> Option<ScrapedRecipe> {
        match self {
            ScrapeError::Extract { partial, .. } => partial.map(|p| *p),
            _ => None,
        }
    }
}

#[async_trait]
pub trait RecipeScraper: Send + Sync {
    /// Scrape a recipe page. One attempt, no retries.
    async fn scrape(&self, url: &str) -> Result<ScrapedRecipe, ScrapeError>;
}
