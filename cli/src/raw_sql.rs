//! Raw SQL fragments that can't be expressed in Diesel's type-safe DSL.
//!
//! # Safety
//!
//! Everything here is a static string. User input is never interpolated;
//! it goes through `.bind()` or the regular DSL.

use diesel::dsl::sql;
use diesel::expression::SqlLiteral;
use diesel::sql_types::{Bool, Double};

/// `RANDOM()` for `ORDER BY`, used by the random sample.
pub fn random_order() -> SqlLiteral<Double> {
    sql::<Double>("RANDOM()")
}

/// True for rows that are not complete: no ingredients, no non-blank step,
/// or no image.
///
/// Steps count the way `RecipeRow::into_recipe` reads them: plain strings, or
/// Spoonacular sections whose `{step}` entries hold the text. Must stay in
/// sync with `RecipeContent::is_complete`.
pub fn is_incomplete() -> SqlLiteral<Bool> {
    sql::<Bool>(
        "(recipes.ingredients IN ('[]'::jsonb, 'null'::jsonb) \
         OR NOT (\
             jsonb_path_exists(recipes.steps, \
                 '$[*] ? (@.type() == \"string\" && @ like_regex \"[^[:space:]]\")') \
             OR jsonb_path_exists(recipes.steps, \
                 '$[*].step ? (@.type() == \"string\" && @ like_regex \"[^[:space:]]\")') \
             OR jsonb_path_exists(recipes.steps, \
                 '$[*].steps[*].step ? (@.type() == \"string\" && @ like_regex \"[^[:space:]]\")')) \
         OR recipes.image IS NULL \
         OR btrim(recipes.image) = '')",
    )
}

/// Escape `%`, `_` and `\` so user text matches literally inside ILIKE.
pub fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
