//! Scripted scraper for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{RecipeScraper, ScrapeError};
use crate::error::{ExtractError, FetchError};
use crate::types::ScrapedRecipe;

#[derive(Debug, Clone)]
enum Outcome {
    Recipe(ScrapedRecipe),
    Fail(String),
    Partial(ScrapedRecipe),
}

/// A scraper that answers from a fixed table of URLs.
///
/// Unknown URLs fail as unreachable. Every call is counted, including ones
/// that fail, so tests can assert that a cache hit made no upstream call.
#[derive(Debug, Default)]
pub struct FakeScraper {
    outcomes: HashMap<String, Outcome>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipe(mut self, url: &str, recipe: ScrapedRecipe) -> Self {
        self.outcomes.insert(url.to_string(), Outcome::Recipe(recipe));
        self
    }

    /// Fail with no partial payload.
    pub fn with_failure(mut self, url: &str, message: &str) -> Self {
        self.outcomes
            .insert(url.to_string(), Outcome::Fail(message.to_string()));
        self
    }

    /// Fail extraction but hand back what was found.
    pub fn with_partial(mut self, url: &str, partial: ScrapedRecipe) -> Self {
        self.outcomes.insert(url.to_string(), Outcome::Partial(partial));
        self
    }

    /// Sleep before answering, to exercise timeouts and races.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecipeScraper for FakeScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedRecipe, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.outcomes.get(url) {
            Some(Outcome::Recipe(recipe)) => Ok(recipe.clone()),
            Some(Outcome::Fail(message)) => {
                Err(FetchError::Unreachable(message.clone()).into())
            }
            Some(Outcome::Partial(partial)) => Err(ScrapeError::Extract {
                source: ExtractError::MissingField("recipeIngredient (empty)".to_string()),
                partial: Some(Box::new(partial.clone())),
            }),
            None => Err(FetchError::Unreachable(format!("no fake page for {}", url)).into()),
        }
    }
}
