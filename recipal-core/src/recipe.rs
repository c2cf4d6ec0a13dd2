//! The single recipe record shape every source is normalized into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An ingredient as stored on a recipe: either the raw line from a page or a
/// structured entry from a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ingredient {
    Structured(StructuredIngredient),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredIngredient {
    pub name: String,
    /// The ingredient line as the source wrote it ("2 cups flour, sifted")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Ingredient {
    /// Display text for the ingredient.
    pub fn text(&self) -> &str {
        match self {
            Ingredient::Text(s) => s,
            Ingredient::Structured(s) => s.original.as_deref().unwrap_or(&s.name),
        }
    }
}

/// Recipe content without store-owned fields.
///
/// This is what the scraper and the provider produce and what gets persisted.
/// Absent data stays absent: optional fields are `None` and lists are empty,
/// and neither is serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spoonacular_id: Option<i64>,
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingredients: Vec<Ingredient>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_minutes: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_minutes: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_in_minutes: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<i32>,
    /// Original provider or scrape payload, kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RecipeContent {
    /// A recipe is complete iff it has ingredients, steps and an image.
    /// Only complete records are served straight from the store.
    pub fn is_complete(&self) -> bool {
        !self.ingredients.is_empty()
            && !self.steps.is_empty()
            && self
                .image
                .as_deref()
                .is_some_and(|image| !image.trim().is_empty())
    }

    /// True when the record carries anything worth returning: a title, an
    /// image, or at least one ingredient or step.
    pub fn has_useful_data(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty())
            || self.image.as_deref().is_some_and(|i| !i.trim().is_empty())
            || !self.ingredients.is_empty()
            || !self.steps.is_empty()
    }
}

/// A recipe row owned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i32,
    /// Set for recipes a user wrote themselves; `None` for fetched or scraped ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub content: RecipeContent,
}

impl Recipe {
    pub fn is_complete(&self) -> bool {
        self.content.is_complete()
    }
}
