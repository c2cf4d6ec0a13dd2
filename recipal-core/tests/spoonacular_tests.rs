//! Spoonacular client and real HTTP scraping against a local stub server.

mod spoonacular_stub;

use std::sync::Arc;

use recipal_core::{
    FetchClient, HtmlScraper, HttpClient, MemoryStore, ProviderError, RecipeProvider,
    RecipeResolver, SpoonacularClient,
};
use spoonacular_stub::{SpoonacularStub, API_KEY, KNOWN_ID};

fn client(stub: &SpoonacularStub) -> SpoonacularClient {
    SpoonacularClient::with_base_url(Some(API_KEY.to_string()), stub.base_url.clone())
}

#[tokio::test]
async fn fetches_recipe_information() {
    let stub = SpoonacularStub::spawn();

    let recipe = client(&stub).fetch_by_id(KNOWN_ID, &[]).await.unwrap();
    assert_eq!(recipe.spoonacular_id, Some(KNOWN_ID));
    assert_eq!(recipe.title.as_deref(), Some("Pasta with Garlic"));
    assert_eq!(recipe.ready_in_minutes, Some(45));
    assert_eq!(recipe.prep_minutes, None);
    assert_eq!(recipe.servings, Some(2));
    assert_eq!(recipe.ingredients.len(), 2);
    assert_eq!(recipe.steps.len(), 2);
    assert!(recipe.is_complete());
    assert_eq!(
        recipe.data.as_ref().and_then(|d| d.get("id")),
        Some(&serde_json::json!(KNOWN_ID))
    );

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with(&format!("/recipes/{}/information?", KNOWN_ID)));
    assert!(requests[0].contains("apiKey=test-key"));
}

#[tokio::test]
async fn extra_params_are_forwarded() {
    let stub = SpoonacularStub::spawn();
    let params = vec![("includeNutrition".to_string(), "false".to_string())];

    client(&stub).fetch_by_id(KNOWN_ID, &params).await.unwrap();
    assert!(stub.requests()[0].contains("includeNutrition=false"));
}

#[tokio::test]
async fn api_errors_carry_status_and_message() {
    let stub = SpoonacularStub::spawn();

    match client(&stub).fetch_by_id(1, &[]).await {
        Err(ProviderError::ApiError { status, message }) => {
            assert_eq!(status, 404);
            assert!(message.contains("does not exist"));
        }
        other => panic!("expected API error, got {:?}", other),
    }

    let unauthorized =
        SpoonacularClient::with_base_url(Some("wrong".to_string()), stub.base_url.clone());
    assert!(matches!(
        unauthorized.fetch_by_id(KNOWN_ID, &[]).await,
        Err(ProviderError::ApiError { status: 401, .. })
    ));
}

#[tokio::test]
async fn search_and_random() {
    let stub = SpoonacularStub::spawn();
    let client = client(&stub);

    let results = client.search("pasta", 2, 4, &[]).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title.as_deref(), Some("pasta #1"));
    let requests = stub.requests();
    let search_request = &requests[0];
    assert!(search_request.starts_with("/recipes/complexSearch?"));
    assert!(search_request.contains("addRecipeInformation=true"));
    assert!(search_request.contains("offset=4"));

    let random = client.random(5, &[]).await.unwrap();
    assert_eq!(random.len(), 5);
    assert!(random.iter().all(|r| r.spoonacular_id.is_some()));
}

#[tokio::test]
async fn resolves_through_real_clients() {
    let stub = SpoonacularStub::spawn();
    let store = Arc::new(MemoryStore::new());
    let fetcher = FetchClient::builder().rate_limit_ms(0).build().unwrap();
    let resolver = RecipeResolver::new(
        store.clone(),
        Arc::new(client(&stub)),
        Arc::new(HtmlScraper::new(fetcher)),
    );

    let soup = resolver.resolve_url(&stub.page_url("soup")).await.unwrap();
    assert!(soup.success);
    assert!(!soup.partial);
    assert_eq!(
        soup.recipe.unwrap().content.title.as_deref(),
        Some("Stub Soup")
    );

    let teaser = resolver.resolve_url(&stub.page_url("teaser")).await.unwrap();
    assert!(teaser.success);
    assert!(teaser.partial);
    assert_eq!(
        teaser.recipe.unwrap().content.title.as_deref(),
        Some("Stub Stew")
    );

    let missing = resolver.resolve_url(&stub.page_url("missing")).await.unwrap();
    assert!(!missing.success);
    assert!(missing.reason.unwrap().contains("404"));

    let pasta = resolver.resolve_provider_id(KNOWN_ID).await.unwrap();
    assert!(pasta.success);
    assert!(!pasta.from_cache);

    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn reachability_probe() {
    let stub = SpoonacularStub::spawn();
    let fetcher = FetchClient::builder().rate_limit_ms(0).build().unwrap();

    assert!(fetcher.is_reachable(&stub.page_url("soup")).await);
    assert!(!fetcher.is_reachable(&stub.page_url("missing")).await);
    assert!(!fetcher.is_reachable("http://127.0.0.1:9/closed").await);
}
