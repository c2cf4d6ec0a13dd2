//! Spoonacular recipe API client.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::{ProviderError, ProviderParams, RecipeProvider};
use crate::config::{RecipalConfig, DEFAULT_SPOONACULAR_BASE_URL};
use crate::normalize::{non_blank, non_blank_opt};
use crate::recipe::{Ingredient, RecipeContent, StructuredIngredient};

#[derive(Debug)]
pub struct SpoonacularClient {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl SpoonacularClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_SPOONACULAR_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: Option<String>, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &RecipalConfig) -> Self {
        Self::with_base_url(
            config.spoonacular_api_key.clone(),
            config.spoonacular_base_url.clone(),
        )
    }

    /// GET `path` with the API key and the given query, returning the body
    /// both typed and as raw JSON.
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
        params: &ProviderParams,
    ) -> Result<(T, Value), ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("SPOONACULAR_API_KEY not set".to_string()))?;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "spoonacular request");

        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", api_key)])
            .query(query)
            .query(params)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        if !(200..300).contains(&status) {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            return Err(ProviderError::ApiError { status, message });
        }

        let raw: Value =
            serde_json::from_str(&body).map_err(|e| ProviderError::ParseError(e.to_string()))?;
        let typed = T::deserialize(&raw).map_err(|e| ProviderError::ParseError(e.to_string()))?;
        Ok((typed, raw))
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// `/recipes/{id}/information`, and the entries of search/random results.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpoonacularRecipe {
    id: i64,
    title: Option<String>,
    image: Option<String>,
    summary: Option<String>,
    ready_in_minutes: Option<f64>,
    /// -1 when unknown
    preparation_minutes: Option<f64>,
    cooking_minutes: Option<f64>,
    servings: Option<f64>,
    source_url: Option<String>,
    #[serde(default)]
    extended_ingredients: Vec<SpoonacularIngredient>,
    #[serde(default)]
    analyzed_instructions: Vec<SpoonacularInstructions>,
}

#[derive(Debug, Deserialize)]
struct SpoonacularIngredient {
    name: Option<String>,
    original: Option<String>,
    amount: Option<f64>,
    unit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpoonacularInstructions {
    #[serde(default)]
    steps: Vec<SpoonacularStep>,
}

#[derive(Debug, Deserialize)]
struct SpoonacularStep {
    step: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RandomResponse {
    #[serde(default)]
    recipes: Vec<Value>,
}

/// Spoonacular reports -1 or 0 for unknown times and counts.
fn positive_whole(value: Option<f64>) -> Option<i32> {
    value
        .filter(|v| v.is_finite() && *v >= 1.0)
        .map(|v| v.round() as i32)
}

impl SpoonacularRecipe {
    fn into_content(self, raw: Value) -> RecipeContent {
        let ingredients = self
            .extended_ingredients
            .into_iter()
            .filter_map(|i| {
                let original = non_blank_opt(i.original);
                let name = non_blank_opt(i.name).or_else(|| original.clone())?;
                Some(Ingredient::Structured(StructuredIngredient {
                    name,
                    original,
                    amount: i.amount,
                    unit: non_blank_opt(i.unit),
                }))
            })
            .collect();

        let steps = self
            .analyzed_instructions
            .into_iter()
            .flat_map(|section| section.steps)
            .filter_map(|s| non_blank(&s.step))
            .collect();

        RecipeContent {
            spoonacular_id: Some(self.id),
            title: non_blank_opt(self.title),
            image: non_blank_opt(self.image),
            summary: non_blank_opt(self.summary),
            ingredients,
            steps,
            source_url: non_blank_opt(self.source_url),
            prep_minutes: positive_whole(self.preparation_minutes),
            cook_minutes: positive_whole(self.cooking_minutes),
            ready_in_minutes: positive_whole(self.ready_in_minutes),
            servings: positive_whole(self.servings),
            data: Some(raw),
        }
    }
}

fn map_recipes(values: Vec<Value>) -> Result<Vec<RecipeContent>, ProviderError> {
    values
        .into_iter()
        .map(|raw| {
            let recipe = SpoonacularRecipe::deserialize(&raw)
                .map_err(|e| ProviderError::ParseError(e.to_string()))?;
            Ok(recipe.into_content(raw))
        })
        .collect()
}

#[async_trait]
impl RecipeProvider for SpoonacularClient {
    async fn fetch_by_id(
        &self,
        id: i64,
        params: &ProviderParams,
    ) -> Result<RecipeContent, ProviderError> {
        let (recipe, raw): (SpoonacularRecipe, Value) = self
            .get(&format!("/recipes/{}/information", id), &[], params)
            .await?;
        Ok(recipe.into_content(raw))
    }

    async fn search(
        &self,
        query: &str,
        number: u32,
        offset: u32,
        params: &ProviderParams,
    ) -> Result<Vec<RecipeContent>, ProviderError> {
        let query = [
            ("query".to_string(), query.to_string()),
            ("addRecipeInformation".to_string(), "true".to_string()),
            ("fillIngredients".to_string(), "true".to_string()),
            ("number".to_string(), number.to_string()),
            ("offset".to_string(), offset.to_string()),
        ];
        let (response, _): (SearchResponse, Value) =
            self.get("/recipes/complexSearch", &query, params).await?;
        map_recipes(response.results)
    }

    async fn random(
        &self,
        number: u32,
        params: &ProviderParams,
    ) -> Result<Vec<RecipeContent>, ProviderError> {
        let query = [("number".to_string(), number.to_string())];
        let (response, _): (RandomResponse, Value) =
            self.get("/recipes/random", &query, params).await?;
        map_recipes(response.recipes)
    }

    fn provider_name(&self) -> &'static str {
        "spoonacular"
    }
}
