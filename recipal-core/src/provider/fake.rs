//! Fake recipe provider for testing.
//!
//! Answers from an in-memory table so tests run without network access or
//! an API key.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use super::{ProviderError, ProviderParams, RecipeProvider};
use crate::recipe::RecipeContent;

#[derive(Debug, Default)]
pub struct FakeProvider {
    recipes: RwLock<BTreeMap<i64, RecipeContent>>,
    /// When set, every call fails with this message.
    failure: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a recipe. Its `spoonacular_id` is set to `id`.
    pub fn with_recipe(self, id: i64, recipe: RecipeContent) -> Self {
        self.add_recipe(id, recipe);
        self
    }

    pub fn add_recipe(&self, id: i64, mut recipe: RecipeContent) {
        recipe.spoonacular_id = Some(id);
        self.recipes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, recipe);
    }

    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn begin_call(&self) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(message) => Err(ProviderError::RequestFailed(message.clone())),
            None => Ok(()),
        }
    }

    fn snapshot(&self) -> Vec<RecipeContent> {
        self.recipes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RecipeProvider for FakeProvider {
    async fn fetch_by_id(
        &self,
        id: i64,
        _params: &ProviderParams,
    ) -> Result<RecipeContent, ProviderError> {
        self.begin_call().await?;
        self.recipes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or_else(|| ProviderError::ApiError {
                status: 404,
                message: format!("A recipe with the id {} does not exist.", id),
            })
    }

    async fn search(
        &self,
        query: &str,
        number: u32,
        offset: u32,
        _params: &ProviderParams,
    ) -> Result<Vec<RecipeContent>, ProviderError> {
        self.begin_call().await?;
        let needle = query.to_lowercase();
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|r| {
                r.title
                    .as_deref()
                    .is_some_and(|t| t.to_lowercase().contains(&needle))
            })
            .skip(offset as usize)
            .take(number as usize)
            .collect())
    }

    async fn random(
        &self,
        number: u32,
        _params: &ProviderParams,
    ) -> Result<Vec<RecipeContent>, ProviderError> {
        self.begin_call().await?;
        Ok(self.snapshot().into_iter().take(number as usize).collect())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
