//! Concurrent resolves of the same locator must leave a single row behind.

use std::sync::Arc;
use std::time::Duration;

use recipal_core::{
    FakeProvider, FakeScraper, Ingredient, MemoryStore, RecipeContent, RecipeResolver,
    ScrapedRecipe,
};

const CALLERS: usize = 16;

fn page(title: &str) -> ScrapedRecipe {
    ScrapedRecipe {
        title: Some(title.to_string()),
        image_urls: vec![format!("https://img/{}.jpg", title)],
        ingredients: vec!["water".to_string()],
        instructions: vec!["boil".to_string()],
        ..Default::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_url_resolved_concurrently_persists_once() {
    let url = "https://example.com/race";
    let store = Arc::new(MemoryStore::new());
    let scraper = Arc::new(
        FakeScraper::new()
            .with_recipe(url, page("race"))
            .with_delay(Duration::from_millis(20)),
    );
    let resolver = Arc::new(RecipeResolver::new(
        store.clone(),
        Arc::new(FakeProvider::new()),
        scraper.clone(),
    ));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve_url(url).await })
        })
        .collect();

    let mut persisted = 0;
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert!(result.success);
        let recipe = result.recipe.unwrap();
        assert_eq!(recipe.content.title.as_deref(), Some("race"));
        if recipe.id.is_some() && !result.from_cache {
            persisted += 1;
        }
    }

    assert_eq!(store.len(), 1);
    assert_eq!(persisted, 1);
    assert!(scraper.calls() >= 1 && scraper.calls() <= CALLERS);

    // Everyone after the race is served from the store
    let after = resolver.resolve_url(url).await.unwrap();
    assert!(after.from_cache);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_provider_id_resolved_concurrently_persists_once() {
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(
        FakeProvider::new()
            .with_recipe(
                99,
                RecipeContent {
                    title: Some("Raced".to_string()),
                    image: Some("https://img/raced.jpg".to_string()),
                    ingredients: vec![Ingredient::Text("rice".to_string())],
                    steps: vec!["steam".to_string()],
                    ..Default::default()
                },
            )
            .with_delay(Duration::from_millis(20)),
    );
    let resolver = Arc::new(RecipeResolver::new(
        store.clone(),
        provider,
        Arc::new(FakeScraper::new()),
    ));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve_provider_id(99).await })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert!(result.success);
        assert_eq!(
            result.recipe.unwrap().content.spoonacular_id,
            Some(99)
        );
    }

    assert_eq!(store.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_urls_do_not_interfere() {
    let urls: Vec<String> = (0..8)
        .map(|i| format!("https://example.com/dish/{}", i))
        .collect();
    let scraper = urls
        .iter()
        .enumerate()
        .fold(FakeScraper::new(), |scraper, (i, url)| {
            scraper.with_recipe(url, page(&format!("dish-{}", i)))
        });
    let store = Arc::new(MemoryStore::new());
    let resolver = Arc::new(RecipeResolver::new(
        store.clone(),
        Arc::new(FakeProvider::new()),
        Arc::new(scraper),
    ));

    let handles: Vec<_> = urls
        .iter()
        .cloned()
        .flat_map(|url| [url.clone(), url])
        .map(|url| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve_url(&url).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().unwrap().success);
    }

    assert_eq!(store.len(), urls.len());
    for url in &urls {
        let row = store
            .snapshot()
            .into_iter()
            .filter(|r| r.content.source_url.as_deref() == Some(url.as_str()))
            .count();
        assert_eq!(row, 1, "{}", url);
    }
}
