use async_trait::async_trait;

use super::{RecipeScraper, ScrapeError};
use crate::extract::{extract_partial, extract_recipe};
use crate::http::HttpClient;
use crate::types::ScrapedRecipe;

/// Scraper that fetches a page over HTTP and runs the structured-data extractor.
pub struct HtmlScraper<C: HttpClient> {
    client: C,
}

impl<C: HttpClient> HtmlScraper<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: HttpClient> RecipeScraper for HtmlScraper<C> {
    async fn scrape(&self, url: &str) -> Result<ScrapedRecipe, ScrapeError> {
        let html = self.client.fetch_html(url).await?;

        match extract_recipe(&html, url) {
            Ok(extraction) => {
                tracing::debug!(url, method = ?extraction.method, "extracted recipe");
                Ok(extraction.recipe)
            }
            Err(source) => {
                let partial = extract_partial(&html, url);
                tracing::debug!(url, error = %source, has_partial = !partial.is_empty(), "extraction failed");
                Err(ScrapeError::Extract {
                    source,
                    partial: (!partial.is_empty()).then(|| Box::new(partial)),
                })
            }
        }
    }
}
