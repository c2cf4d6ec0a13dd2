use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ResolveError;
use crate::normalize::{is_http_url, non_blank_opt};
use crate::recipe::{Recipe, RecipeContent};

/// Default number of records for a search or sample.
pub const DEFAULT_SAMPLE_SIZE: i64 = 10;

/// Hard cap on any page or sample.
pub const MAX_PAGE_SIZE: i64 = 100;

/// What a resolve call is asked to find. Exactly one form per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Store-owned id. Never falls back to a provider.
    Local(i32),
    /// Spoonacular id.
    Provider(i64),
    /// Recipe page URL.
    Url(String),
}

impl Locator {
    /// Build a locator from optional caller inputs. Blank URLs count as absent.
    pub fn from_parts(
        id: Option<i32>,
        provider_id: Option<i64>,
        url: Option<String>,
    ) -> Result<Self, ResolveError> {
        let url = non_blank_opt(url);
        let given = id.is_some() as u8 + provider_id.is_some() as u8 + url.is_some() as u8;
        if given > 1 {
            return Err(ResolveError::validation(
                "locator",
                "give exactly one of id, providerId or url",
            ));
        }

        let locator = match (id, provider_id, url) {
            (Some(id), _, _) => Locator::Local(id),
            (_, Some(provider_id), _) => Locator::Provider(provider_id),
            (_, _, Some(url)) => Locator::Url(url),
            (None, None, None) => {
                return Err(ResolveError::validation(
                    "locator",
                    "one of id, providerId or url is required",
                ))
            }
        };
        locator.validate()?;
        Ok(locator)
    }

    /// Reject locators that cannot name anything, before any I/O.
    pub fn validate(&self) -> Result<(), ResolveError> {
        match self {
            Locator::Local(id) if *id <= 0 => {
                Err(ResolveError::validation("id", "must be a positive integer"))
            }
            Locator::Provider(id) if *id <= 0 => Err(ResolveError::validation(
                "providerId",
                "must be a positive integer",
            )),
            Locator::Url(url) if url.trim().is_empty() => {
                Err(ResolveError::validation("url", "is required"))
            }
            Locator::Url(url) if !is_http_url(url.trim()) => Err(ResolveError::validation(
                "url",
                "must be an absolute http(s) URL",
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Local(id) => write!(f, "local:{}", id),
            Locator::Provider(id) => write!(f, "spoonacular:{}", id),
            Locator::Url(url) => f.write_str(url),
        }
    }
}

/// A recipe handed back to a caller. Freshly fetched data that was not
/// persisted has no `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRecipe {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub content: RecipeContent,
}

impl ResolvedRecipe {
    pub fn unsaved(content: RecipeContent) -> Self {
        Self {
            id: None,
            user_id: None,
            created_at: None,
            content,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.content.is_complete()
    }
}

impl From<Recipe> for ResolvedRecipe {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: Some(recipe.id),
            user_id: recipe.user_id,
            created_at: Some(recipe.created_at),
            content: recipe.content,
        }
    }
}

/// Outcome of a resolve call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<ResolvedRecipe>,
    /// Served from the store without any upstream call.
    #[serde(default)]
    pub from_cache: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RecipeResult {
    pub fn cached(recipe: Recipe) -> Self {
        Self {
            success: true,
            recipe: Some(recipe.into()),
            from_cache: true,
            partial: false,
            reason: None,
        }
    }

    pub fn fresh(recipe: ResolvedRecipe) -> Self {
        Self {
            success: true,
            recipe: Some(recipe),
            from_cache: false,
            partial: false,
            reason: None,
        }
    }

    pub fn partial(recipe: ResolvedRecipe) -> Self {
        Self {
            partial: true,
            ..Self::fresh(recipe)
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            recipe: None,
            from_cache: false,
            partial: false,
            reason: Some(reason.into()),
        }
    }
}

/// Search input. A blank or absent query asks for a random sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub number: Option<i64>,
    pub offset: Option<i64>,
}

/// What a validated [`SearchRequest`] turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SearchPlan {
    Sample { limit: i64 },
    Text { query: String, limit: i64, offset: i64 },
}

impl SearchRequest {
    pub fn query(query: &str) -> Self {
        Self {
            query: Some(query.to_string()),
            ..Default::default()
        }
    }

    pub(crate) fn plan(&self) -> Result<SearchPlan, ResolveError> {
        let Some(query) = non_blank_opt(self.query.clone()) else {
            // Sampling is a fallback, never an error: bad sizes get the default.
            let limit = self
                .number
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_SAMPLE_SIZE)
                .min(MAX_PAGE_SIZE);
            return Ok(SearchPlan::Sample { limit });
        };

        let limit = self.number.unwrap_or(DEFAULT_SAMPLE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(ResolveError::validation(
                "number",
                format!("must be between 1 and {}", MAX_PAGE_SIZE),
            ));
        }
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(ResolveError::validation("offset", "must not be negative"));
        }

        Ok(SearchPlan::Text {
            query,
            limit,
            offset,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub recipes: Vec<Recipe>,
    /// True when no query was given and `recipes` is a random sample.
    pub sampled: bool,
}
