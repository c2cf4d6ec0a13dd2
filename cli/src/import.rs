//! Bulk import of recipe dumps (one schema.org-ish object per recipe).

use std::sync::Arc;

use recipal_core::normalize::is_http_url;
use recipal_core::{recipe_from_json, HttpClient, RecipeContent, RecipeStore};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Counts for one import run. Every loaded entry lands in exactly one of
/// `imported`, `duplicates`, `skipped`, `unreachable` or `failed`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub loaded: usize,
    /// Lines that were not valid JSON objects (line-by-line fallback only)
    pub malformed: usize,
    pub imported: usize,
    pub duplicates: usize,
    /// Entries without an http(s) `url` and `image`
    pub skipped: usize,
    pub unreachable: usize,
    pub failed: usize,
}

pub struct ImportOptions {
    /// HEAD-check each entry's url and image before inserting it.
    pub reachability: Option<Arc<dyn HttpClient>>,
    pub batch_size: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            reachability: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Parse a dump: a JSON array if possible, otherwise one object per line.
///
/// Returns the entries and the number of malformed lines that were dropped.
pub fn load_entries(text: &str) -> (Vec<Value>, usize) {
    match serde_json::from_str::<Vec<Value>>(text) {
        Ok(entries) => (entries, 0),
        Err(e) => {
            debug!(error = %e, "not a JSON array, parsing line by line");
            let mut entries = Vec::new();
            let mut malformed = 0;
            for line in text.lines().filter(|l| !l.trim().is_empty()) {
                match serde_json::from_str::<Value>(line) {
                    Ok(value @ Value::Object(_)) => entries.push(value),
                    _ => malformed += 1,
                }
            }
            (entries, malformed)
        }
    }
}

fn entry_str<'a>(entry: &'a Value, key: &str) -> Option<&'a str> {
    entry.get(key).and_then(Value::as_str)
}

/// The fields the importer requires, when both are absolute http(s) URLs.
fn required_urls(entry: &Value) -> Option<(&str, &str)> {
    let url = entry_str(entry, "url").filter(|u| is_http_url(u))?;
    let image = entry_str(entry, "image").filter(|i| is_http_url(i))?;
    Some((url, image))
}

/// First non-blank string under any of `keys`, also looking inside `data`.
fn first_text(entry: &Value, keys: &[&str]) -> Option<String> {
    let nested = entry.get("data");
    keys.iter()
        .flat_map(|key| [entry.get(*key), nested.and_then(|d| d.get(*key))])
        .flatten()
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() && s != "null" => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// Map one dump entry onto stored recipe content.
///
/// Dumps spell yields and times several ways; the schema.org keys win.
pub fn entry_to_content(entry: &Value, url: &str) -> RecipeContent {
    let mut scraped = recipe_from_json(entry, url);
    if scraped.title.is_none() {
        scraped.title = first_text(entry, &["name", "title"]);
    }
    if scraped.recipe_yield.is_none() {
        scraped.recipe_yield = first_text(entry, &["recipeYield", "servings", "recipe_yield"]);
    }
    if scraped.cook_time.is_none() {
        scraped.cook_time = first_text(entry, &["cookTime", "cook_time"]);
    }
    if scraped.prep_time.is_none() {
        scraped.prep_time = first_text(entry, &["prepTime", "prep_time"]);
    }
    scraped.into_content(url)
}

async fn reachable_flags(client: &Arc<dyn HttpClient>, batch: &[(String, String)]) -> Vec<bool> {
    let mut set = JoinSet::new();
    for (index, (url, image)) in batch.iter().enumerate() {
        let client = Arc::clone(client);
        let (url, image) = (url.clone(), image.clone());
        set.spawn(async move {
            let ok = client.is_reachable(&url).await && client.is_reachable(&image).await;
            (index, ok)
        });
    }

    let mut flags = vec![false; batch.len()];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, ok)) => flags[index] = ok,
            Err(e) => warn!(error = %e, "reachability check panicked"),
        }
    }
    flags
}

/// Persist every usable entry with the store's idempotent insert.
pub async fn import_entries(
    entries: &[Value],
    store: &dyn RecipeStore,
    options: &ImportOptions,
) -> ImportReport {
    let mut report = ImportReport {
        loaded: entries.len(),
        ..Default::default()
    };

    let mut candidates = Vec::new();
    for entry in entries {
        match required_urls(entry) {
            Some((url, image)) => candidates.push((entry, url.to_string(), image.to_string())),
            None => report.skipped += 1,
        }
    }

    for batch in candidates.chunks(options.batch_size.max(1)) {
        let flags = match &options.reachability {
            Some(client) => {
                let urls: Vec<(String, String)> = batch
                    .iter()
                    .map(|(_, url, image)| (url.clone(), image.clone()))
                    .collect();
                reachable_flags(client, &urls).await
            }
            None => vec![true; batch.len()],
        };

        for ((entry, url, _), reachable) in batch.iter().zip(flags) {
            if !reachable {
                debug!(url = %url, "skipping unreachable entry");
                report.unreachable += 1;
                continue;
            }

            let content = entry_to_content(entry, url);
            match store.insert_if_absent(&content).await {
                Ok(Some(recipe)) => {
                    debug!(recipe_id = recipe.id, url = %url, "imported");
                    report.imported += 1;
                }
                Ok(None) => report.duplicates += 1,
                Err(e) => {
                    warn!(url = %url, error = %e, "insert failed");
                    report.failed += 1;
                }
            }
        }
    }

    info!(
        imported = report.imported,
        duplicates = report.duplicates,
        skipped = report.skipped,
        unreachable = report.unreachable,
        failed = report.failed,
        "import finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipal_core::{Ingredient, MemoryStore, MockClient};
    use serde_json::json;

    fn soup() -> Value {
        json!({
            "name": "Tomato Soup",
            "url": "https://a.example/soup",
            "image": "https://a.example/soup.jpg",
            "ingredients": "4 tomatoes\n1 onion\n",
            "cookTime": "PT30M",
            "prepTime": "PT10M",
            "recipeYield": "Serves 4",
            "description": "Simple."
        })
    }

    #[test]
    fn loads_array_or_lines() {
        let (entries, malformed) = load_entries(r#"[{"name":"a"},{"name":"b"}]"#);
        assert_eq!(entries.len(), 2);
        assert_eq!(malformed, 0);

        let text = "{\"name\":\"a\"}\nnot json\n\n{\"name\":\"b\"}\n[1]\n";
        let (entries, malformed) = load_entries(text);
        assert_eq!(entries.len(), 2);
        assert_eq!(malformed, 2);
    }

    #[test]
    fn maps_dump_fields() {
        let content = entry_to_content(&soup(), "https://a.example/soup");
        assert_eq!(content.title.as_deref(), Some("Tomato Soup"));
        assert_eq!(content.image.as_deref(), Some("https://a.example/soup.jpg"));
        assert_eq!(
            content.ingredients,
            vec![
                Ingredient::Text("4 tomatoes".to_string()),
                Ingredient::Text("1 onion".to_string())
            ]
        );
        assert_eq!(content.servings, Some(4));
        assert_eq!(content.ready_in_minutes, Some(40));
        assert_eq!(content.source_url.as_deref(), Some("https://a.example/soup"));
        assert!(content.data.is_some());
    }

    #[test]
    fn alternative_keys_fill_gaps() {
        let entry = json!({
            "title": "Stew",
            "servings": "6 bowls",
            "data": { "cookTime": "1 hour" }
        });
        let content = entry_to_content(&entry, "https://a.example/stew");
        assert_eq!(content.title.as_deref(), Some("Stew"));
        assert_eq!(content.servings, Some(6));
        assert_eq!(content.cook_minutes, Some(60));
    }

    #[test]
    fn missing_values_stay_missing() {
        let entry = json!({ "name": "Bare", "cookTime": "null" });
        let content = entry_to_content(&entry, "https://a.example/bare");
        assert!(content.servings.is_none());
        assert!(content.cook_minutes.is_none());
        assert!(content.ingredients.is_empty());
    }

    #[tokio::test]
    async fn imports_valid_entries_once() {
        let store = MemoryStore::new();
        let entries = vec![
            soup(),
            soup(),
            json!({ "name": "No image", "url": "https://a.example/plain" }),
            json!({ "name": "Bad url", "url": "ftp://a.example/x", "image": "https://a.example/x.jpg" }),
        ];

        let report = import_entries(&entries, &store, &ImportOptions::default()).await;
        assert_eq!(
            report,
            ImportReport {
                loaded: 4,
                imported: 1,
                duplicates: 1,
                skipped: 2,
                ..Default::default()
            }
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unreachable_entries_are_not_inserted() {
        let store = MemoryStore::new();
        let client = MockClient::new()
            .with_html("https://a.example/soup", "<html></html>")
            .with_html("https://a.example/soup.jpg", "")
            .with_html("https://b.example/stew", "<html></html>")
            .with_status("https://b.example/stew.jpg", 404);
        let options = ImportOptions {
            reachability: Some(Arc::new(client)),
            batch_size: 1,
        };
        let entries = vec![
            soup(),
            json!({ "name": "Stew", "url": "https://b.example/stew", "image": "https://b.example/stew.jpg" }),
        ];

        let report = import_entries(&entries, &store, &options).await;
        assert_eq!(report.imported, 1);
        assert_eq!(report.unreachable, 1);
        assert_eq!(store.snapshot()[0].content.title.as_deref(), Some("Tomato Soup"));
    }
}
