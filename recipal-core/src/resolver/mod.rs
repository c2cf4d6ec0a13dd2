//! Recipe resolution: store first, then provider or scraper, then persist.
//!
//! Each call is independent. Nothing is locked in-process: two resolves of the
//! same URL may both scrape, and the store's uniqueness rule decides which one
//! persists. The loser still returns its own data.

mod error;
mod result;

pub use error::ResolveError;
pub use result::{
    Locator, RecipeResult, ResolvedRecipe, SearchRequest, SearchResults, DEFAULT_SAMPLE_SIZE,
    MAX_PAGE_SIZE,
};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{RecipalConfig, DEFAULT_UPSTREAM_TIMEOUT_SECS};
use crate::provider::RecipeProvider;
use crate::recipe::{Recipe, RecipeContent};
use crate::scrape::{RecipeScraper, ScrapeError};
use crate::store::RecipeStore;
use crate::types::ScrapedRecipe;
use result::SearchPlan;

pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS);

pub struct RecipeResolver {
    store: Arc<dyn RecipeStore>,
    provider: Arc<dyn RecipeProvider>,
    scraper: Arc<dyn RecipeScraper>,
    /// Bound on each provider or scraper call.
    timeout: Duration,
    /// Extra query parameters sent with every provider request.
    provider_params: Vec<(String, String)>,
}

impl RecipeResolver {
    pub fn new(
        store: Arc<dyn RecipeStore>,
        provider: Arc<dyn RecipeProvider>,
        scraper: Arc<dyn RecipeScraper>,
    ) -> Self {
        Self {
            store,
            provider,
            scraper,
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
            provider_params: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_provider_params(mut self, params: Vec<(String, String)>) -> Self {
        self.provider_params = params;
        self
    }

    pub fn with_config(self, config: &RecipalConfig) -> Self {
        self.with_timeout(config.upstream_timeout)
    }

    /// Resolve any locator. Validation happens before any I/O.
    pub async fn resolve(&self, locator: Locator) -> Result<RecipeResult, ResolveError> {
        match locator {
            Locator::Local(id) => self.get_local(id).await.map(RecipeResult::cached),
            Locator::Provider(id) => self.resolve_provider_id(id).await,
            Locator::Url(url) => self.resolve_url(&url).await,
        }
    }

    /// A stored recipe by its own id. No upstream fallback.
    pub async fn get_local(&self, id: i32) -> Result<Recipe, ResolveError> {
        Locator::Local(id).validate()?;

        async {
            match self.store.find_by_id(id).await? {
                Some(recipe) => {
                    debug!(recipe_id = recipe.id, "found local recipe");
                    Ok(recipe)
                }
                None => Err(ResolveError::NotFound(format!("recipe {}", id))),
            }
        }
        .instrument(info_span!("resolve", locator = %Locator::Local(id)))
        .await
    }

    /// Resolve a recipe page URL.
    ///
    /// A complete stored row is returned without any network call. Otherwise
    /// the page is scraped once. A complete scrape is persisted (or upgrades an
    /// incomplete row); a partial one is persisted only if nothing is stored
    /// yet. Persistence failures are logged and never fail the call.
    pub async fn resolve_url(&self, url: &str) -> Result<RecipeResult, ResolveError> {
        let locator = Locator::Url(url.trim().to_string());
        locator.validate()?;
        let url = url.trim();

        async {
            let existing = match self.store.find_by_url(url).await {
                Ok(existing) => existing,
                Err(e) => {
                    warn!(url, error = %e, "store lookup failed, treating as miss");
                    None
                }
            };

            if let Some(recipe) = existing.as_ref().filter(|r| r.is_complete()) {
                debug!(recipe_id = recipe.id, "cache hit");
                return Ok(RecipeResult::cached(recipe.clone()));
            }

            let (candidate, scrape_failed) = match self.scrape(url).await {
                Ok(scraped) => (scraped.into_content(url), false),
                Err(err) => {
                    let reason = format!("scrape failed: {}", err);
                    match err.into_partial().filter(|p| !p.is_empty()) {
                        Some(partial) => {
                            info!(url, %reason, "scrape failed, using partial data");
                            (partial.into_content(url), true)
                        }
                        None => {
                            info!(url, %reason, "scrape failed");
                            return Ok(RecipeResult::failed(reason));
                        }
                    }
                }
            };

            if candidate.is_complete() {
                let recipe = match existing {
                    Some(stale) => self.upgrade(stale.id, candidate).await,
                    None => self.persist(candidate).await,
                };
                info!(recipe_id = ?recipe.id, "resolved from scrape");
                return Ok(RecipeResult::fresh(recipe));
            }

            if !candidate.has_useful_data() {
                return Ok(RecipeResult::failed(if scrape_failed {
                    "scrape failed: could not extract required fields"
                } else {
                    "could not extract required fields"
                }));
            }

            // Never overwrite a stored row with another partial one.
            let recipe = match existing {
                Some(_) => ResolvedRecipe::unsaved(candidate),
                None => self.persist(candidate).await,
            };
            info!(recipe_id = ?recipe.id, "resolved partial recipe");
            Ok(RecipeResult::partial(recipe))
        }
        .instrument(info_span!("resolve", locator = %locator))
        .await
    }

    /// Resolve a Spoonacular id: stored row if any, else fetch and persist.
    pub async fn resolve_provider_id(&self, provider_id: i64) -> Result<RecipeResult, ResolveError> {
        let locator = Locator::Provider(provider_id);
        locator.validate()?;

        async {
            match self.store.find_by_provider_id(provider_id).await {
                Ok(Some(recipe)) => {
                    debug!(recipe_id = recipe.id, "cache hit");
                    return Ok(RecipeResult::cached(recipe));
                }
                Ok(None) => {}
                Err(e) => warn!(provider_id, error = %e, "store lookup failed, treating as miss"),
            }

            let fetch = self.provider.fetch_by_id(provider_id, &self.provider_params);
            let mut content = match tokio::time::timeout(self.timeout, fetch).await {
                Ok(Ok(content)) => content,
                Ok(Err(e)) => {
                    return Err(ResolveError::Upstream(format!(
                        "{} recipe {}: {}",
                        self.provider.provider_name(),
                        provider_id,
                        e
                    )))
                }
                Err(_) => {
                    return Err(ResolveError::Upstream(format!(
                        "{} recipe {}: timed out after {:?}",
                        self.provider.provider_name(),
                        provider_id,
                        self.timeout
                    )))
                }
            };
            content.spoonacular_id = Some(provider_id);

            // A row that won a race is not overwritten; the caller still gets
            // the data just fetched.
            let recipe = self.persist(content).await;
            info!(recipe_id = ?recipe.id, "resolved from provider");
            Ok(RecipeResult::fresh(recipe))
        }
        .instrument(info_span!("resolve", locator = %locator))
        .await
    }

    /// Search the store. A blank query returns a random sample instead.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResults, ResolveError> {
        match request.plan()? {
            SearchPlan::Sample { limit } => {
                let recipes = self.store.random_sample(limit).await?;
                debug!(limit, returned = recipes.len(), "random sample");
                Ok(SearchResults {
                    recipes,
                    sampled: true,
                })
            }
            SearchPlan::Text {
                query,
                limit,
                offset,
            } => {
                let recipes = self.store.text_search(&query, limit, offset).await?;
                debug!(query = %query, returned = recipes.len(), "text search");
                Ok(SearchResults {
                    recipes,
                    sampled: false,
                })
            }
        }
    }

    /// Search the provider directly. Results are not persisted.
    /// A blank query asks the provider for random recipes.
    pub async fn search_provider(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<RecipeContent>, ResolveError> {
        let name = self.provider.provider_name();
        let call = async {
            match request.plan()? {
                SearchPlan::Sample { limit } => self
                    .provider
                    .random(limit as u32, &self.provider_params)
                    .await
                    .map_err(|e| ResolveError::Upstream(format!("{} random: {}", name, e))),
                SearchPlan::Text {
                    query,
                    limit,
                    offset,
                } => self
                    .provider
                    .search(
                        &query,
                        limit as u32,
                        u32::try_from(offset).unwrap_or(u32::MAX),
                        &self.provider_params,
                    )
                    .await
                    .map_err(|e| ResolveError::Upstream(format!("{} search: {}", name, e))),
            }
        };

        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                ResolveError::Upstream(format!("{} search: timed out after {:?}", name, self.timeout))
            })?
    }

    async fn scrape(&self, url: &str) -> Result<ScrapedRecipe, ScrapeError> {
        debug!(url, "scraping");
        match tokio::time::timeout(self.timeout, self.scraper.scrape(url)).await {
            Ok(result) => result,
            Err(_) => Err(ScrapeError::Timeout(self.timeout)),
        }
    }

    /// Insert if absent. Losing a race or failing to write still yields the
    /// candidate, just without an id.
    async fn persist(&self, content: RecipeContent) -> ResolvedRecipe {
        match self.store.insert_if_absent(&content).await {
            Ok(Some(recipe)) => recipe.into(),
            Ok(None) => {
                debug!("row already exists, not persisting");
                ResolvedRecipe::unsaved(content)
            }
            Err(e) => {
                warn!(error = %e, "failed to persist recipe");
                ResolvedRecipe::unsaved(content)
            }
        }
    }

    async fn upgrade(&self, id: i32, content: RecipeContent) -> ResolvedRecipe {
        match self.store.upgrade_incomplete(id, &content).await {
            Ok(Some(recipe)) => recipe.into(),
            Ok(None) => {
                debug!(recipe_id = id, "row no longer upgradable");
                ResolvedRecipe::unsaved(content)
            }
            Err(e) => {
                warn!(recipe_id = id, error = %e, "failed to upgrade recipe");
                ResolvedRecipe::unsaved(content)
            }
        }
    }
}
