pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod normalize;
pub mod provider;
pub mod recipe;
pub mod resolver;
pub mod scrape;
pub mod store;
pub mod types;

pub use config::{ConfigError, RecipalConfig};
pub use error::{ExtractError, FetchError};
pub use extract::{extract_partial, extract_recipe, recipe_from_json, Extraction};
pub use http::{FetchClient, FetchClientBuilder, HttpClient, MockClient, MockResponse};
pub use provider::{FakeProvider, ProviderError, RecipeProvider, SpoonacularClient};
pub use recipe::{Ingredient, Recipe, RecipeContent, StructuredIngredient};
pub use resolver::{
    Locator, RecipeResolver, RecipeResult, ResolveError, ResolvedRecipe, SearchRequest,
    SearchResults,
};
pub use scrape::{FakeScraper, HtmlScraper, RecipeScraper, ScrapeError};
pub use store::{MemoryStore, RecipeStore, StoreError};
pub use types::{ExtractionMethod, ScrapedRecipe};
