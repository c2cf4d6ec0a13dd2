mod db;
mod import;
mod models;
mod raw_sql;
mod schema;
mod store;
mod telemetry;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use recipal_core::{
    FetchClient, HtmlScraper, HttpClient, Locator, MemoryStore, RecipalConfig, RecipeResolver,
    RecipeStore, ResolveError, SearchRequest, SpoonacularClient,
};
use serde::Serialize;
use tracing::info;

use crate::import::{ImportOptions, DEFAULT_BATCH_SIZE};
use crate::store::PgStore;

#[derive(Parser)]
#[command(name = "recipal")]
#[command(about = "Resolve recipes by id, Spoonacular id or page URL", long_about = None)]
struct Cli {
    /// Use a throwaway in-memory store instead of Postgres
    #[arg(long, global = true)]
    in_memory: bool,

    /// Debug logging for recipal crates (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve exactly one of a local id, a Spoonacular id or a URL
    Resolve {
        #[arg(long)]
        id: Option<i32>,
        #[arg(long)]
        provider_id: Option<i64>,
        #[arg(long)]
        url: Option<String>,
    },
    /// Resolve a recipe page URL (store first, then scrape)
    ResolveUrl { url: String },
    /// Resolve a Spoonacular recipe id (store first, then fetch)
    ResolveProvider {
        id: i64,
        /// Extra provider query parameter, as key=value (repeatable)
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    /// Read a stored recipe by id
    Get { id: i32 },
    /// Text search over stored recipes, or a random sample without a query
    Search {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        number: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
    },
    /// Search Spoonacular directly; nothing is stored
    ProviderSearch {
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        number: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
    },
    /// Import a recipe dump (JSON array or one object per line)
    Import {
        file: PathBuf,
        /// HEAD-check each recipe URL and image before inserting
        #[arg(long)]
        check_reachable: bool,
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", s))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in `{}`", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

/// Print a resolver outcome. Resolver errors are output, not crashes.
fn report<T: Serialize>(outcome: Result<T, ResolveError>) -> Result<ExitCode> {
    match outcome {
        Ok(value) => {
            print_json(&value)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            print_json(&ErrorBody {
                error: e.to_string(),
                status: e.status_code(),
            })?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn open_store(config: &RecipalConfig, in_memory: bool) -> Result<Arc<dyn RecipeStore>> {
    if in_memory {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let url = config.require_database_url()?;
    let pool = db::create_pool(url).context("Failed to create database pool")?;
    Ok(Arc::new(PgStore::new(pool)))
}

fn fetch_client(config: &RecipalConfig) -> Result<FetchClient> {
    FetchClient::builder()
        .rate_limit_ms(config.scrape_rate_limit_ms)
        .timeout(config.upstream_timeout)
        .user_agent(config.user_agent.clone())
        .build()
        .context("Failed to build HTTP client")
}

fn resolver(config: &RecipalConfig, store: Arc<dyn RecipeStore>) -> Result<RecipeResolver> {
    let scraper = HtmlScraper::new(fetch_client(config)?);
    let provider = SpoonacularClient::from_config(config);
    Ok(RecipeResolver::new(store, Arc::new(provider), Arc::new(scraper)).with_config(config))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init(cli.verbose)?;

    let config = RecipalConfig::from_env();
    let store = open_store(&config, cli.in_memory)?;

    let code = run(cli.command, &config, store).await?;
    info!(db_queries = telemetry::query_count(), "done");
    Ok(code)
}

async fn run(
    command: Commands,
    config: &RecipalConfig,
    store: Arc<dyn RecipeStore>,
) -> Result<ExitCode> {
    match command {
        Commands::Resolve {
            id,
            provider_id,
            url,
        } => {
            let resolver = resolver(config, store)?;
            let outcome = match Locator::from_parts(id, provider_id, url) {
                Ok(locator) => resolver.resolve(locator).await,
                Err(e) => Err(e),
            };
            report(outcome)
        }
        Commands::ResolveUrl { url } => report(resolver(config, store)?.resolve_url(&url).await),
        Commands::ResolveProvider { id, params } => {
            let resolver = resolver(config, store)?.with_provider_params(params);
            report(resolver.resolve_provider_id(id).await)
        }
        Commands::Get { id } => report(resolver(config, store)?.get_local(id).await),
        Commands::Search {
            query,
            number,
            offset,
        } => {
            let request = SearchRequest {
                query,
                number,
                offset,
            };
            report(resolver(config, store)?.search(&request).await)
        }
        Commands::ProviderSearch {
            query,
            number,
            offset,
        } => {
            let request = SearchRequest {
                query,
                number,
                offset,
            };
            report(resolver(config, store)?.search_provider(&request).await)
        }
        Commands::Import {
            file,
            check_reachable,
            batch_size,
        } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let (entries, malformed) = import::load_entries(&text);
            info!(loaded = entries.len(), malformed, "loaded recipe dump");

            let reachability = if check_reachable {
                let client: Arc<dyn HttpClient> = Arc::new(fetch_client(config)?);
                Some(client)
            } else {
                None
            };
            let options = ImportOptions {
                reachability,
                batch_size,
            };

            let mut summary = import::import_entries(&entries, store.as_ref(), &options).await;
            summary.malformed = malformed;
            print_json(&summary)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
