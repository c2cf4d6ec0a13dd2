//! Minimal Spoonacular-compatible HTTP server for tests, also serving a couple
//! of recipe pages for the scraper.

use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

pub const API_KEY: &str = "test-key";
pub const KNOWN_ID: i64 = 716429;

pub struct SpoonacularStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SpoonacularStub {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start spoonacular stub server");
        let base_url = format!("http://{}", server.server_addr());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            let request = match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };

            let raw_url = request.url().to_string();
            seen.lock().unwrap().push(raw_url.clone());

            let parsed = url::Url::parse(&format!("http://stub{}", raw_url)).unwrap();
            let query: HashMap<String, String> = parsed.query_pairs().into_owned().collect();
            let (status, body, content_type) = route(parsed.path(), &query);

            let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes())
                .expect("valid header");
            let _ = request.respond(
                tiny_http::Response::from_string(body)
                    .with_status_code(status)
                    .with_header(header),
            );
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Request paths with query strings, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn page_url(&self, slug: &str) -> String {
        format!("{}/pages/{}", self.base_url, slug)
    }
}

impl Drop for SpoonacularStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn recipe_json(id: i64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "image": format!("https://img.spoonacular.com/recipes/{}-556x370.jpg", id),
        "summary": "A <b>quick</b> weeknight dinner.",
        "readyInMinutes": 45,
        "preparationMinutes": -1,
        "cookingMinutes": -1,
        "servings": 2,
        "sourceUrl": format!("https://fullbellysisters.example/{}", id),
        "extendedIngredients": [
            {"id": 1, "name": "garlic", "original": "2 cloves garlic, minced", "amount": 2.0, "unit": "cloves"},
            {"id": 2, "name": "pasta", "original": "1/2 lb pasta", "amount": 0.5, "unit": "lb"}
        ],
        "analyzedInstructions": [
            {"name": "", "steps": [
                {"number": 1, "step": "Cook the pasta."},
                {"number": 2, "step": "Saute the garlic and toss."}
            ]}
        ]
    })
}

const SOUP_PAGE: &str = r#"<html><head>
<script type="application/ld+json">
{"@context":"https://schema.org","@type":"Recipe","name":"Stub Soup",
 "image":"https://img.example/stub-soup.jpg",
 "recipeIngredient":["water","salt"],
 "recipeInstructions":[{"@type":"HowToStep","text":"Boil the water."}]}
</script></head><body></body></html>"#;

const TEASER_PAGE: &str = r#"<html><head>
<meta property="og:title" content="Stub Stew">
</head><body>Subscribe to see this recipe.</body></html>"#;

fn route(path: &str, query: &HashMap<String, String>) -> (u16, String, &'static str) {
    if let Some(slug) = path.strip_prefix("/pages/") {
        return match slug {
            "soup" => (200, SOUP_PAGE.to_string(), "text/html"),
            "teaser" => (200, TEASER_PAGE.to_string(), "text/html"),
            _ => (404, "<html>not found</html>".to_string(), "text/html"),
        };
    }

    if query.get("apiKey").map(String::as_str) != Some(API_KEY) {
        let body = json!({
            "status": "failure",
            "code": 401,
            "message": "You are not authorized. Please read https://spoonacular.com/food-api/docs#Authentication"
        });
        return (401, body.to_string(), "application/json");
    }

    let number = query
        .get("number")
        .and_then(|n| n.parse::<i64>().ok())
        .unwrap_or(10);

    match path {
        "/recipes/complexSearch" => {
            let q = query.get("query").cloned().unwrap_or_default();
            let results: Vec<Value> = (0..number.min(3))
                .map(|i| recipe_json(1000 + i, &format!("{} #{}", q, i + 1)))
                .collect();
            let body = json!({
                "results": results,
                "offset": query.get("offset").and_then(|o| o.parse::<i64>().ok()).unwrap_or(0),
                "number": number,
                "totalResults": 3
            });
            (200, body.to_string(), "application/json")
        }
        "/recipes/random" => {
            let recipes: Vec<Value> = (0..number)
                .map(|i| recipe_json(2000 + i, &format!("Random #{}", i + 1)))
                .collect();
            (200, json!({ "recipes": recipes }).to_string(), "application/json")
        }
        _ => {
            let id = path
                .strip_prefix("/recipes/")
                .and_then(|rest| rest.strip_suffix("/information"))
                .and_then(|id| id.parse::<i64>().ok());
            match id {
                Some(KNOWN_ID) => (
                    200,
                    recipe_json(KNOWN_ID, "Pasta with Garlic").to_string(),
                    "application/json",
                ),
                Some(id) => (
                    404,
                    json!({
                        "status": "failure",
                        "code": 404,
                        "message": format!("A recipe with the id {} does not exist.", id)
                    })
                    .to_string(),
                    "application/json",
                ),
                None => (404, "not found".to_string(), "text/plain"),
            }
        }
    }
}
