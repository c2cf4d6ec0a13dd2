use chrono::{DateTime, Utc};
use diesel::prelude::*;
use recipal_core::{Ingredient, Recipe, RecipeContent, StoreError};
use serde_json::Value as JsonValue;

use crate::schema::recipes;

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RecipeRow {
    pub id: i32,
    pub user_id: Option<i32>,
    pub spoonacular_id: Option<i64>,
    pub title: Option<String>,
    pub image: Option<String>,
    pub summary: Option<String>,
    pub ready_in_minutes: Option<i32>,
    pub prep_minutes: Option<i32>,
    pub cook_minutes: Option<i32>,
    pub servings: Option<i32>,
    pub source_url: Option<String>,
    pub ingredients: JsonValue,
    pub steps: JsonValue,
    pub data: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

impl RecipeRow {
    pub fn into_recipe(self) -> Result<Recipe, StoreError> {
        let ingredients = ingredients_from_json(self.ingredients)?;
        let steps = steps_from_json(&self.steps);

        Ok(Recipe {
            id: self.id,
            user_id: self.user_id,
            created_at: self.created_at,
            content: RecipeContent {
                spoonacular_id: self.spoonacular_id,
                title: self.title,
                image: self.image,
                summary: self.summary,
                ingredients,
                steps,
                source_url: self.source_url,
                prep_minutes: self.prep_minutes,
                cook_minutes: self.cook_minutes,
                ready_in_minutes: self.ready_in_minutes,
                servings: self.servings,
                data: self.data,
            },
        })
    }
}

fn ingredients_from_json(value: JsonValue) -> Result<Vec<Ingredient>, StoreError> {
    match value {
        JsonValue::Null => Ok(Vec::new()),
        other => serde_json::from_value(other)
            .map_err(|e| StoreError::Serialization(format!("ingredients: {}", e))),
    }
}

/// Steps are stored as a list of strings. Older rows hold Spoonacular's
/// `analyzedInstructions` (sections of `{step}` objects), which are flattened.
fn steps_from_json(value: &JsonValue) -> Vec<String> {
    fn collect(value: &JsonValue, out: &mut Vec<String>) {
        match value {
            JsonValue::String(s) if !s.trim().is_empty() => out.push(s.trim().to_string()),
            JsonValue::Array(items) => items.iter().for_each(|item| collect(item, out)),
            JsonValue::Object(obj) => {
                if let Some(step) = obj.get("step") {
                    collect(step, out);
                } else if let Some(steps) = obj.get("steps") {
                    collect(steps, out);
                }
            }
            _ => {}
        }
    }

    let mut steps = Vec::new();
    collect(value, &mut steps);
    steps
}

fn to_json<T: serde::Serialize>(column: &str, value: &T) -> Result<JsonValue, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Serialization(format!("{}: {}", column, e)))
}

#[derive(Insertable, Debug)]
#[diesel(table_name = recipes)]
pub struct NewRecipeRow {
    pub user_id: Option<i32>,
    pub spoonacular_id: Option<i64>,
    pub title: Option<String>,
    pub image: Option<String>,
    pub summary: Option<String>,
    pub ready_in_minutes: Option<i32>,
    pub prep_minutes: Option<i32>,
    pub cook_minutes: Option<i32>,
    pub servings: Option<i32>,
    pub source_url: Option<String>,
    pub ingredients: JsonValue,
    pub steps: JsonValue,
    pub data: Option<JsonValue>,
}

impl NewRecipeRow {
    pub fn from_content(content: &RecipeContent) -> Result<Self, StoreError> {
        Ok(Self {
            user_id: None,
            spoonacular_id: content.spoonacular_id,
            title: content.title.clone(),
            image: content.image.clone(),
            summary: content.summary.clone(),
            ready_in_minutes: content.ready_in_minutes,
            prep_minutes: content.prep_minutes,
            cook_minutes: content.cook_minutes,
            servings: content.servings,
            source_url: content.source_url.clone(),
            ingredients: to_json("ingredients", &content.ingredients)?,
            steps: to_json("steps", &content.steps)?,
            data: content.data.clone(),
        })
    }
}

/// Content columns replaced when an incomplete row is upgraded. Identity
/// columns (`source_url`, `spoonacular_id`) and `created_at` are left alone.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = recipes)]
#[diesel(treat_none_as_null = true)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub image: Option<String>,
    pub summary: Option<String>,
    pub ready_in_minutes: Option<i32>,
    pub prep_minutes: Option<i32>,
    pub cook_minutes: Option<i32>,
    pub servings: Option<i32>,
    pub ingredients: JsonValue,
    pub steps: JsonValue,
    pub data: Option<JsonValue>,
}

impl RecipeChanges {
    pub fn from_content(content: &RecipeContent) -> Result<Self, StoreError> {
        Ok(Self {
            title: content.title.clone(),
            image: content.image.clone(),
            summary: content.summary.clone(),
            ready_in_minutes: content.ready_in_minutes,
            prep_minutes: content.prep_minutes,
            cook_minutes: content.cook_minutes,
            servings: content.servings,
            ingredients: to_json("ingredients", &content.ingredients)?,
            steps: to_json("steps", &content.steps)?,
            data: content.data.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(ingredients: JsonValue, steps: JsonValue) -> RecipeRow {
        RecipeRow {
            id: 1,
            user_id: None,
            spoonacular_id: Some(716429),
            title: Some("Pasta".to_string()),
            image: Some("https://img/pasta.jpg".to_string()),
            summary: None,
            ready_in_minutes: Some(45),
            prep_minutes: None,
            cook_minutes: None,
            servings: Some(2),
            source_url: None,
            ingredients,
            steps,
            data: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn reads_spoonacular_shaped_columns() {
        let recipe = row(
            json!([{"id": 11215, "name": "garlic", "original": "2 cloves garlic", "amount": 2.0, "unit": "cloves", "aisle": "Produce"}]),
            json!([{"name": "", "steps": [{"number": 1, "step": "Boil."}, {"number": 2, "step": "Toss."}]}]),
        )
        .into_recipe()
        .unwrap();

        assert_eq!(recipe.content.ingredients[0].text(), "2 cloves garlic");
        assert_eq!(recipe.content.steps, vec!["Boil.", "Toss."]);
        assert!(recipe.is_complete());
    }

    #[test]
    fn reads_plain_columns() {
        let recipe = row(json!(["water", "salt"]), json!(["boil"]))
            .into_recipe()
            .unwrap();
        assert_eq!(
            recipe.content.ingredients,
            vec![
                Ingredient::Text("water".to_string()),
                Ingredient::Text("salt".to_string())
            ]
        );
        assert_eq!(recipe.content.steps, vec!["boil"]);
    }

    #[test]
    fn malformed_ingredients_are_a_serialization_error() {
        let err = row(json!({"not": "a list"}), json!([])).into_recipe().unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn new_row_writes_empty_lists_not_null() {
        let row = NewRecipeRow::from_content(&RecipeContent {
            title: Some("Soup".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(row.ingredients, json!([]));
        assert_eq!(row.steps, json!([]));
        assert!(row.image.is_none());
    }
}
