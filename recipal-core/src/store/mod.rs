//! Store accessor: the only shared mutable resource in resolution.
//!
//! Uniqueness of `source_url` and `spoonacular_id` is enforced here, by the
//! implementation, not by callers. Every write is a single row.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::recipe::{Recipe, RecipeContent};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store connection failed: {0}")]
    Connection(String),

    #[error("Store query failed: {0}")]
    Query(String),

    #[error("Failed to (de)serialize recipe column: {0}")]
    Serialization(String),
}

#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<Recipe>, StoreError>;

    async fn find_by_url(&self, url: &str) -> Result<Option<Recipe>, StoreError>;

    async fn find_by_provider_id(&self, provider_id: i64) -> Result<Option<Recipe>, StoreError>;

    /// Insert unless a row with the same `source_url` or `spoonacular_id`
    /// already exists.
    ///
    /// Returns `Ok(None)` only for that conflict; any other failure is an
    /// error. Safe to race: at most one of several concurrent inserts for the
    /// same key returns a row.
    async fn insert_if_absent(&self, content: &RecipeContent)
        -> Result<Option<Recipe>, StoreError>;

    /// Replace the content of row `id` if, and only if, that row is still
    /// incomplete. Identity keys (`source_url`, `spoonacular_id`) and
    /// `created_at` are kept. Returns `Ok(None)` when the row is missing or
    /// already complete.
    async fn upgrade_incomplete(
        &self,
        id: i32,
        content: &RecipeContent,
    ) -> Result<Option<Recipe>, StoreError>;

    /// Up to `limit` rows in random order.
    async fn random_sample(&self, limit: i64) -> Result<Vec<Recipe>, StoreError>;

    /// Case-insensitive substring match on title and summary, ordered by id.
    async fn text_search(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Recipe>, StoreError>;
}
