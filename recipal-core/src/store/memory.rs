use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rand::seq::SliceRandom;

use super::{RecipeStore, StoreError};
use crate::recipe::{Recipe, RecipeContent};

#[derive(Debug, Default)]
struct State {
    next_id: i32,
    rows: BTreeMap<i32, Recipe>,
}

impl State {
    fn conflicts(&self, content: &RecipeContent) -> bool {
        self.rows.values().any(|row| {
            let same_url = content.source_url.is_some()
                && row.content.source_url == content.source_url;
            let same_provider_id = content.spoonacular_id.is_some()
                && row.content.spoonacular_id == content.spoonacular_id;
            same_url || same_provider_id
        })
    }
}

/// In-process store with the same uniqueness rules as the database.
///
/// Check and insert happen under one lock, so concurrent inserts of the same
/// key behave like `ON CONFLICT DO NOTHING`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a recipe owned by a user, as the app does for hand-written ones.
    pub fn insert_local(&self, user_id: i32, content: RecipeContent) -> Option<Recipe> {
        let mut state = self.lock();
        if state.conflicts(&content) {
            return None;
        }
        state.next_id += 1;
        let recipe = Recipe {
            id: state.next_id,
            user_id: Some(user_id),
            created_at: Utc::now(),
            content,
        };
        state.rows.insert(recipe.id, recipe.clone());
        Some(recipe)
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All rows, ordered by id.
    pub fn snapshot(&self) -> Vec<Recipe> {
        self.lock().rows.values().cloned().collect()
    }

    fn sample(&self, limit: usize) -> Vec<Recipe> {
        let rows = self.snapshot();
        let mut rng = rand::thread_rng();
        rows.choose_multiple(&mut rng, limit).cloned().collect()
    }
}

fn matches_query(recipe: &Recipe, needle: &str) -> bool {
    let contains = |field: &Option<String>| {
        field
            .as_deref()
            .is_some_and(|value| value.to_lowercase().contains(needle))
    };
    contains(&recipe.content.title) || contains(&recipe.content.summary)
}

fn to_count(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<Recipe>, StoreError> {
        Ok(self.lock().rows.get(&id).cloned())
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Recipe>, StoreError> {
        Ok(self
            .lock()
            .rows
            .values()
            .find(|row| row.content.source_url.as_deref() == Some(url))
            .cloned())
    }

    async fn find_by_provider_id(&self, provider_id: i64) -> Result<Option<Recipe>, StoreError> {
        Ok(self
            .lock()
            .rows
            .values()
            .find(|row| row.content.spoonacular_id == Some(provider_id))
            .cloned())
    }

    async fn insert_if_absent(
        &self,
        content: &RecipeContent,
    ) -> Result<Option<Recipe>, StoreError> {
        let mut state = self.lock();
        if state.conflicts(content) {
            return Ok(None);
        }
        state.next_id += 1;
        let recipe = Recipe {
            id: state.next_id,
            user_id: None,
            created_at: Utc::now(),
            content: content.clone(),
        };
        state.rows.insert(recipe.id, recipe.clone());
        Ok(Some(recipe))
    }

    async fn upgrade_incomplete(
        &self,
        id: i32,
        content: &RecipeContent,
    ) -> Result<Option<Recipe>, StoreError> {
        let mut state = self.lock();
        let Some(row) = state.rows.get_mut(&id) else {
            return Ok(None);
        };
        if row.is_complete() {
            return Ok(None);
        }

        let mut upgraded = content.clone();
        upgraded.source_url = row.content.source_url.take();
        upgraded.spoonacular_id = row.content.spoonacular_id;
        row.content = upgraded;
        Ok(Some(row.clone()))
    }

    async fn random_sample(&self, limit: i64) -> Result<Vec<Recipe>, StoreError> {
        Ok(self.sample(to_count(limit)))
    }

    async fn text_search(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Recipe>, StoreError> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .lock()
            .rows
            .values()
            .filter(|row| matches_query(row, &needle))
            .skip(to_count(offset))
            .take(to_count(limit))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::Ingredient;

    fn content(url: &str, title: &str) -> RecipeContent {
        RecipeContent {
            title: Some(title.to_string()),
            source_url: Some(url.to_string()),
            ..Default::default()
        }
    }

    fn complete(url: &str) -> RecipeContent {
        RecipeContent {
            image: Some("https://img/x.jpg".to_string()),
            ingredients: vec![Ingredient::Text("water".to_string())],
            steps: vec!["boil".to_string()],
            ..content(url, "Complete")
        }
    }

    #[tokio::test]
    async fn insert_is_unique_per_url() {
        let store = MemoryStore::new();
        let first = store
            .insert_if_absent(&content("https://a/soup", "Soup"))
            .await
            .unwrap();
        assert!(first.is_some());

        let second = store
            .insert_if_absent(&content("https://a/soup", "Other"))
            .await
            .unwrap();
        assert!(second.is_none());
        assert_eq!(store.len(), 1);

        let found = store.find_by_url("https://a/soup").await.unwrap().unwrap();
        assert_eq!(found.content.title.as_deref(), Some("Soup"));
    }

    #[tokio::test]
    async fn insert_is_unique_per_provider_id() {
        let store = MemoryStore::new();
        let recipe = RecipeContent {
            spoonacular_id: Some(42),
            ..Default::default()
        };
        assert!(store.insert_if_absent(&recipe).await.unwrap().is_some());
        assert!(store.insert_if_absent(&recipe).await.unwrap().is_none());
        assert!(store.find_by_provider_id(42).await.unwrap().is_some());
        assert!(store.find_by_provider_id(43).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rows_without_keys_never_conflict() {
        let store = MemoryStore::new();
        let keyless = RecipeContent {
            title: Some("Scratch".to_string()),
            ..Default::default()
        };
        assert!(store.insert_if_absent(&keyless).await.unwrap().is_some());
        assert!(store.insert_if_absent(&keyless).await.unwrap().is_some());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn upgrade_only_touches_incomplete_rows() {
        let store = MemoryStore::new();
        let partial = store
            .insert_if_absent(&content("https://a/soup", "Soup"))
            .await
            .unwrap()
            .unwrap();

        let upgraded = store
            .upgrade_incomplete(partial.id, &complete("https://elsewhere/soup"))
            .await
            .unwrap()
            .unwrap();
        assert!(upgraded.is_complete());
        assert_eq!(upgraded.id, partial.id);
        assert_eq!(upgraded.created_at, partial.created_at);
        assert_eq!(upgraded.content.source_url.as_deref(), Some("https://a/soup"));

        let again = store
            .upgrade_incomplete(partial.id, &content("https://a/soup", "Worse"))
            .await
            .unwrap();
        assert!(again.is_none());
        let stored = store.find_by_id(partial.id).await.unwrap().unwrap();
        assert_eq!(stored.content.title.as_deref(), Some("Complete"));

        assert!(store
            .upgrade_incomplete(999, &complete("https://a/x"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn random_sample_is_bounded() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .insert_if_absent(&content(&format!("https://a/{}", i), "Soup"))
                .await
                .unwrap();
        }
        assert_eq!(store.random_sample(3).await.unwrap().len(), 3);
        assert_eq!(store.random_sample(10).await.unwrap().len(), 5);
        assert!(store.random_sample(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn text_search_matches_title_and_summary() {
        let store = MemoryStore::new();
        store
            .insert_if_absent(&content("https://a/1", "Tomato Soup"))
            .await
            .unwrap();
        store
            .insert_if_absent(&RecipeContent {
                summary: Some("A hearty SOUP for winter".to_string()),
                ..content("https://a/2", "Stew")
            })
            .await
            .unwrap();
        store
            .insert_if_absent(&content("https://a/3", "Bread"))
            .await
            .unwrap();

        let hits = store.text_search("soup", 10, 0).await.unwrap();
        assert_eq!(hits.len(), 2);
        let page = store.text_search("soup", 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].content.title.as_deref(), Some("Stew"));
    }
}
