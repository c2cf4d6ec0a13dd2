//! Recipe extraction from HTML.
//!
//! Structured data is tried in order: JSON-LD through a regex fast path, JSON-LD
//! through the DOM, then schema.org microdata. [`extract_recipe`] insists on a
//! title, ingredients and instructions. [`extract_partial`] never fails and
//! returns whatever it can find, including OpenGraph and `<title>` hints, for
//! callers that want a degraded answer.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::error::ExtractError;
use crate::normalize::non_blank;
use crate::types::{ExtractionMethod, ScrapedRecipe};

/// Regex to find JSON-LD script tags (case-insensitive for type attribute)
static JSONLD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("Invalid JSON-LD regex")
});

static JSONLD_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("script[type='application/ld+json']").expect("Invalid selector")
});

static MICRODATA_RECIPE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"[itemtype="http://schema.org/Recipe"], [itemtype="https://schema.org/Recipe"]"#,
    )
    .expect("Invalid selector")
});

static MICRODATA_INGREDIENT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[itemprop="recipeIngredient"], [itemprop="ingredients"]"#)
        .expect("Invalid selector")
});

static MICRODATA_STEP_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"[itemprop="recipeInstructions"], [itemprop="instructions"], [itemtype*="HowToStep"]"#,
    )
    .expect("Invalid selector")
});

static MICRODATA_STEP_TEXT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop="text"]"#).expect("Invalid selector"));

static MICRODATA_IMAGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop="image"]"#).expect("Invalid selector"));

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("Invalid selector"));

static META_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[content]").expect("Invalid selector"));

/// A successful extraction and the method that produced it.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub recipe: ScrapedRecipe,
    pub method: ExtractionMethod,
}

/// Extract a complete-enough recipe (title, ingredients, instructions) from HTML.
///
/// Images fall back to `og:image` when the structured data has none.
pub fn extract_recipe(html: &str, source_url: &str) -> Result<Extraction, ExtractError> {
    // Fast path: extract JSON-LD using regex (avoids DOM parsing)
    if let Some(recipe) = extract_jsonld_fast(html, source_url) {
        if let Ok(mut recipe) = require_fields(recipe) {
            if recipe.image_urls.is_empty() {
                let hints = page_hints(&Html::parse_document(html));
                recipe.image_urls = hints.image_urls;
            }
            return Ok(Extraction {
                recipe,
                method: ExtractionMethod::JsonLd,
            });
        }
    }

    // Slow path: full DOM parsing for malformed HTML or microdata-only sites
    let document = Html::parse_document(html);
    let hints = page_hints(&document);

    let jsonld = find_jsonld_recipe(&document, source_url)
        .ok_or(ExtractError::NoRecipe)
        .and_then(require_fields);
    let (mut recipe, method) = match jsonld {
        Ok(recipe) => (recipe, ExtractionMethod::JsonLd),
        Err(jsonld_err) => {
            let microdata = extract_microdata(&document, source_url)
                .ok_or(ExtractError::NoRecipe)
                .and_then(require_fields);
            match microdata {
                Ok(recipe) => (recipe, ExtractionMethod::Microdata),
                // Report the more specific of the two failures
                Err(ExtractError::NoRecipe) => return Err(jsonld_err),
                Err(e) => return Err(e),
            }
        }
    };

    if recipe.image_urls.is_empty() {
        recipe.image_urls = hints.image_urls;
    }
    Ok(Extraction { recipe, method })
}

/// Best-effort extraction that never fails.
///
/// Structured data wins where present; page metadata (`og:title`, `og:image`,
/// `og:description`, `<title>`) fills the gaps. The result may be empty.
pub fn extract_partial(html: &str, source_url: &str) -> ScrapedRecipe {
    let document = Html::parse_document(html);

    let mut recipe = extract_jsonld_fast(html, source_url)
        .or_else(|| find_jsonld_recipe(&document, source_url))
        .or_else(|| extract_microdata(&document, source_url))
        .unwrap_or_default();

    let mut hints = page_hints(&document);
    hints.source_name = extract_source_name(source_url);
    recipe.merge_missing(hints);
    recipe
}

/// Map a schema.org Recipe JSON object onto [`ScrapedRecipe`].
///
/// Lenient: every field is optional. Also accepts the flattened dump format
/// (`ingredients` as a newline blob, `url`) used by recipe exports.
pub fn recipe_from_json(recipe: &Value, source_url: &str) -> ScrapedRecipe {
    ScrapedRecipe {
        title: json_text(recipe.get("name")),
        description: json_text(recipe.get("description")),
        image_urls: extract_image_urls(recipe),
        ingredients: extract_ingredients(recipe),
        instructions: extract_instructions(recipe),
        prep_time: json_text(recipe.get("prepTime")),
        cook_time: json_text(recipe.get("cookTime")),
        total_time: json_text(recipe.get("totalTime")),
        recipe_yield: recipe.get("recipeYield").and_then(|v| match v {
            Value::Array(arr) => arr.iter().find_map(|v| json_text(Some(v))),
            other => json_text(Some(other)),
        }),
        source_name: extract_source_name(source_url),
        raw: Some(recipe.clone()),
    }
}

fn require_fields(recipe: ScrapedRecipe) -> Result<ScrapedRecipe, ExtractError> {
    if recipe.title.is_none() {
        return Err(ExtractError::MissingField("name".to_string()));
    }
    if recipe.ingredients.is_empty() {
        return Err(ExtractError::MissingField(
            "recipeIngredient (empty)".to_string(),
        ));
    }
    if recipe.instructions.is_empty() {
        return Err(ExtractError::MissingField(
            "recipeInstructions (empty)".to_string(),
        ));
    }
    Ok(recipe)
}

/// Fast JSON-LD extraction using regex to avoid DOM parsing.
/// Returns None if no parseable JSON-LD recipe is found.
fn extract_jsonld_fast(html: &str, source_url: &str) -> Option<ScrapedRecipe> {
    JSONLD_REGEX.captures_iter(html).find_map(|cap| {
        let json_text = cap.get(1)?.as_str();
        let json: Value = serde_json::from_str(&sanitize_json(json_text)).ok()?;
        find_recipe_in_json(&json).map(|recipe| recipe_from_json(recipe, source_url))
    })
}

/// JSON-LD via the DOM (handles markup the regex misses)
fn find_jsonld_recipe(document: &Html, source_url: &str) -> Option<ScrapedRecipe> {
    document.select(&JSONLD_SELECTOR).find_map(|element| {
        let json_text = element.inner_html();
        let json: Value = serde_json::from_str(&sanitize_json(&json_text)).ok()?;
        find_recipe_in_json(&json).map(|recipe| recipe_from_json(recipe, source_url))
    })
}

/// Sanitize JSON-LD content to handle common malformed patterns.
/// Some sites include literal newlines/tabs inside JSON strings instead of escaped versions.
fn sanitize_json(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in json.chars() {
        if in_string {
            if escaped {
                escaped = false;
                result.push(c);
                continue;
            }
            match c {
                '\\' => {
                    escaped = true;
                    result.push(c);
                }
                '"' => {
                    in_string = false;
                    result.push(c);
                }
                '\n' => result.push_str("\\n"),
                '\r' => result.push_str("\\r"),
                '\t' => result.push_str("\\t"),
                c if c.is_control() => {}
                _ => result.push(c),
            }
        } else {
            if c == '"' {
                in_string = true;
            }
            result.push(c);
        }
    }

    result
}

/// Recursively search for a Recipe object in JSON-LD.
/// Handles @graph arrays and nested structures.
fn find_recipe_in_json(json: &Value) -> Option<&Value> {
    match json {
        Value::Object(obj) => {
            let is_recipe = match obj.get("@type") {
                Some(Value::String(s)) => s == "Recipe",
                Some(Value::Array(arr)) => arr.iter().any(|v| v == "Recipe"),
                _ => false,
            };
            if is_recipe {
                return Some(json);
            }

            if let Some(recipe) = obj.get("@graph").and_then(find_recipe_in_json) {
                return Some(recipe);
            }

            obj.values().find_map(find_recipe_in_json)
        }
        Value::Array(arr) => arr.iter().find_map(find_recipe_in_json),
        _ => None,
    }
}

/// Text from a JSON string or number, trimmed, blank treated as absent.
fn json_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => non_blank(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn extract_ingredients(recipe: &Value) -> Vec<String> {
    let raw = recipe
        .get("recipeIngredient")
        .or_else(|| recipe.get("ingredients"));

    match raw {
        Some(Value::Array(arr)) => arr.iter().filter_map(|v| json_text(Some(v))).collect(),
        Some(Value::String(blob)) => blob.lines().filter_map(non_blank).collect(),
        _ => Vec::new(),
    }
}

/// Instructions as a list of steps.
/// Handles plain strings, HowToStep objects and HowToSection groups.
fn extract_instructions(recipe: &Value) -> Vec<String> {
    match recipe.get("recipeInstructions") {
        Some(Value::String(s)) => s.lines().filter_map(non_blank).collect(),
        Some(Value::Array(arr)) => arr.iter().flat_map(instruction_steps).collect(),
        Some(obj @ Value::Object(_)) => instruction_steps(obj),
        _ => Vec::new(),
    }
}

fn instruction_steps(item: &Value) -> Vec<String> {
    if let Some(s) = item.as_str() {
        return non_blank(s).into_iter().collect();
    }
    if let Some(text) = item.get("text").and_then(|v| v.as_str()) {
        return non_blank(text).into_iter().collect();
    }
    if let Some(items) = item.get("itemListElement").and_then(|v| v.as_array()) {
        return items.iter().flat_map(instruction_steps).collect();
    }
    Vec::new()
}

fn extract_image_urls(recipe: &Value) -> Vec<String> {
    let mut urls = Vec::new();

    match recipe.get("image") {
        Some(Value::String(s)) => urls.extend(non_blank(s)),
        Some(Value::Array(arr)) => {
            for item in arr {
                match item {
                    Value::String(s) => urls.extend(non_blank(s)),
                    Value::Object(obj) => {
                        urls.extend(obj.get("url").and_then(|v| v.as_str()).and_then(non_blank))
                    }
                    _ => {}
                }
            }
        }
        Some(Value::Object(obj)) => {
            urls.extend(obj.get("url").and_then(|v| v.as_str()).and_then(non_blank))
        }
        _ => {}
    }

    urls
}

/// Extract a friendly source name from a URL.
fn extract_source_name(url: &str) -> Option<String> {
    url::Url::parse(url).ok().and_then(|parsed| {
        parsed.host_str().map(|host| {
            let name = host.strip_prefix("www.").unwrap_or(host);
            let mut chars = name.chars();
            match chars.next() {
                None => name.to_string(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
    })
}

/// Extract a recipe from schema.org microdata markup.
fn extract_microdata(document: &Html, source_url: &str) -> Option<ScrapedRecipe> {
    let recipe_element = document.select(&MICRODATA_RECIPE_SELECTOR).next()?;

    let ingredients = recipe_element
        .select(&MICRODATA_INGREDIENT_SELECTOR)
        .filter_map(|el| non_blank(&element_text(&el)))
        .collect();

    let instructions = recipe_element
        .select(&MICRODATA_STEP_SELECTOR)
        .filter_map(|el| {
            let text = match el.select(&MICRODATA_STEP_TEXT_SELECTOR).next() {
                Some(text_el) => element_text(&text_el),
                None => element_text(&el),
            };
            non_blank(&text)
        })
        .collect();

    let image_urls = recipe_element
        .select(&MICRODATA_IMAGE_SELECTOR)
        .filter_map(|el| {
            let value = el.value();
            value
                .attr("src")
                .or_else(|| value.attr("content"))
                .or_else(|| value.attr("href"))
                .and_then(non_blank)
        })
        .collect();

    Some(ScrapedRecipe {
        title: microdata_text(&recipe_element, "name"),
        description: microdata_text(&recipe_element, "description"),
        image_urls,
        ingredients,
        instructions,
        prep_time: microdata_text(&recipe_element, "prepTime"),
        cook_time: microdata_text(&recipe_element, "cookTime"),
        total_time: microdata_text(&recipe_element, "totalTime"),
        recipe_yield: microdata_text(&recipe_element, "recipeYield"),
        source_name: extract_source_name(source_url),
        raw: None,
    })
}

fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text content of the first element with the given itemprop.
/// `content` and `datetime` attributes win over inner text (meta/time tags).
fn microdata_text(element: &ElementRef, prop: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"[itemprop="{}"]"#, prop)).ok()?;
    element.select(&selector).next().and_then(|el| {
        let value = el.value();
        match value.attr("content").or_else(|| value.attr("datetime")) {
            Some(attr) => non_blank(attr),
            None => non_blank(&element_text(&el)),
        }
    })
}

/// Title, image and description from page-level metadata.
fn page_hints(document: &Html) -> ScrapedRecipe {
    let mut og_title = None;
    let mut og_image = None;
    let mut og_description = None;
    let mut meta_description = None;

    for meta in document.select(&META_SELECTOR) {
        let value = meta.value();
        let key = value
            .attr("property")
            .or_else(|| value.attr("name"))
            .map(|k| k.to_ascii_lowercase());
        let Some(content) = value.attr("content").and_then(non_blank) else {
            continue;
        };
        match key.as_deref() {
            Some("og:title") if og_title.is_none() => og_title = Some(content),
            Some("og:image") | Some("og:image:url") if og_image.is_none() => {
                og_image = Some(content)
            }
            Some("og:description") if og_description.is_none() => {
                og_description = Some(content)
            }
            Some("description") if meta_description.is_none() => meta_description = Some(content),
            _ => {}
        }
    }

    let page_title = document
        .select(&TITLE_SELECTOR)
        .next()
        .and_then(|el| non_blank(&element_text(&el)));

    ScrapedRecipe {
        title: og_title.or(page_title),
        description: og_description.or(meta_description),
        image_urls: og_image.into_iter().collect(),
        ..Default::default()
    }
}
