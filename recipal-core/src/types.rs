use serde::{Deserialize, Serialize};

use crate::normalize::{
    extract_servings, non_blank, non_blank_opt, parse_duration_minutes, ready_in_minutes,
};
use crate::recipe::{Ingredient, RecipeContent};

/// Identifies which extraction method was used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    JsonLd,
    Microdata,
}

/// Recipe data pulled out of a page, before normalization.
///
/// Every field is optional because the same shape carries partial results
/// when extraction stops halfway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedRecipe {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Image URLs found in the recipe (not fetched)
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub total_time: Option<String>,
    pub recipe_yield: Option<String>,
    pub source_name: Option<String>,
    /// The structured-data node the fields came from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl ScrapedRecipe {
    /// True when nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.image_urls.is_empty()
            && self.ingredients.is_empty()
            && self.instructions.is_empty()
    }

    /// Fill any gap in `self` from `other` without overwriting what is there.
    pub fn merge_missing(&mut self, other: ScrapedRecipe) {
        if self.title.is_none() {
            self.title = other.title;
        }
        if self.description.is_none() {
            self.description = other.description;
        }
        if self.image_urls.is_empty() {
            self.image_urls = other.image_urls;
        }
        if self.ingredients.is_empty() {
            self.ingredients = other.ingredients;
        }
        if self.instructions.is_empty() {
            self.instructions = other.instructions;
        }
        if self.prep_time.is_none() {
            self.prep_time = other.prep_time;
        }
        if self.cook_time.is_none() {
            self.cook_time = other.cook_time;
        }
        if self.total_time.is_none() {
            self.total_time = other.total_time;
        }
        if self.recipe_yield.is_none() {
            self.recipe_yield = other.recipe_yield;
        }
        if self.source_name.is_none() {
            self.source_name = other.source_name;
        }
        if self.raw.is_none() {
            self.raw = other.raw;
        }
    }

    /// Normalize into the stored recipe shape.
    ///
    /// Missing fields stay missing: no default servings, times or placeholder
    /// ingredients are invented.
    pub fn into_content(self, source_url: &str) -> RecipeContent {
        let prep_minutes = self.prep_time.as_deref().and_then(parse_duration_minutes);
        let cook_minutes = self.cook_time.as_deref().and_then(parse_duration_minutes);
        let total_minutes = self.total_time.as_deref().and_then(parse_duration_minutes);
        let servings = self.recipe_yield.as_deref().and_then(extract_servings);

        let data = match &self.raw {
            Some(raw) => Some(raw.clone()),
            None if self.is_empty() => None,
            None => serde_json::to_value(&self).ok(),
        };

        RecipeContent {
            spoonacular_id: None,
            title: non_blank_opt(self.title),
            image: self.image_urls.iter().find_map(|u| non_blank(u)),
            summary: non_blank_opt(self.description),
            ingredients: self
                .ingredients
                .iter()
                .filter_map(|i| non_blank(i))
                .map(Ingredient::Text)
                .collect(),
            steps: self
                .instructions
                .iter()
                .filter_map(|s| non_blank(s))
                .collect(),
            source_url: non_blank(source_url),
            prep_minutes,
            cook_minutes,
            ready_in_minutes: ready_in_minutes(total_minutes, prep_minutes, cook_minutes),
            servings,
            data,
        }
    }
}
