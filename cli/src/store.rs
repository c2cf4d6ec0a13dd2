//! Postgres-backed [`RecipeStore`].
//!
//! Diesel is synchronous, so every operation checks a connection out of the
//! pool and runs on the blocking thread pool inside a `db.query` span.
//! Uniqueness comes from the table's unique indexes on `source_url` and
//! `spoonacular_id`; inserts use `ON CONFLICT DO NOTHING`.

use async_trait::async_trait;
use diesel::prelude::*;
use recipal_core::{Recipe, RecipeContent, RecipeStore, StoreError};
use tracing::info_span;

use crate::db::DbPool;
use crate::models::{NewRecipeRow, RecipeChanges, RecipeRow};
use crate::raw_sql::{escape_like, is_incomplete, random_order};
use crate::schema::recipes;

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

fn query_error(e: diesel::result::Error) -> StoreError {
    StoreError::Query(e.to_string())
}

fn into_recipes(rows: Vec<RecipeRow>) -> Result<Vec<Recipe>, StoreError> {
    rows.into_iter().map(RecipeRow::into_recipe).collect()
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, op: &'static str, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        let span = info_span!("db.query", op);

        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            let mut conn = pool
                .get()
                .map_err(|e| StoreError::Connection(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Connection(format!("database task failed: {}", e)))?
    }
}

#[async_trait]
impl RecipeStore for PgStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<Recipe>, StoreError> {
        self.with_conn("find_by_id", move |conn| {
            recipes::table
                .find(id)
                .select(RecipeRow::as_select())
                .first(conn)
                .optional()
                .map_err(query_error)?
                .map(RecipeRow::into_recipe)
                .transpose()
        })
        .await
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Recipe>, StoreError> {
        let url = url.to_string();
        self.with_conn("find_by_url", move |conn| {
            recipes::table
                .filter(recipes::source_url.eq(url))
                .order(recipes::id.asc())
                .select(RecipeRow::as_select())
                .first(conn)
                .optional()
                .map_err(query_error)?
                .map(RecipeRow::into_recipe)
                .transpose()
        })
        .await
    }

    async fn find_by_provider_id(&self, provider_id: i64) -> Result<Option<Recipe>, StoreError> {
        self.with_conn("find_by_provider_id", move |conn| {
            recipes::table
                .filter(recipes::spoonacular_id.eq(provider_id))
                .select(RecipeRow::as_select())
                .first(conn)
                .optional()
                .map_err(query_error)?
                .map(RecipeRow::into_recipe)
                .transpose()
        })
        .await
    }

    async fn insert_if_absent(
        &self,
        content: &RecipeContent,
    ) -> Result<Option<Recipe>, StoreError> {
        let row = NewRecipeRow::from_content(content)?;
        self.with_conn("insert_if_absent", move |conn| {
            // No row back means the insert hit a unique index
            diesel::insert_into(recipes::table)
                .values(&row)
                .on_conflict_do_nothing()
                .returning(RecipeRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(query_error)?
                .map(RecipeRow::into_recipe)
                .transpose()
        })
        .await
    }

    async fn upgrade_incomplete(
        &self,
        id: i32,
        content: &RecipeContent,
    ) -> Result<Option<Recipe>, StoreError> {
        let changes = RecipeChanges::from_content(content)?;
        self.with_conn("upgrade_incomplete", move |conn| {
            diesel::update(
                recipes::table
                    .filter(recipes::id.eq(id))
                    .filter(is_incomplete()),
            )
            .set(&changes)
            .returning(RecipeRow::as_returning())
            .get_result(conn)
            .optional()
            .map_err(query_error)?
            .map(RecipeRow::into_recipe)
            .transpose()
        })
        .await
    }

    async fn random_sample(&self, limit: i64) -> Result<Vec<Recipe>, StoreError> {
        self.with_conn("random_sample", move |conn| {
            let rows = recipes::table
                .order(random_order())
                .limit(limit.max(0))
                .select(RecipeRow::as_select())
                .load(conn)
                .map_err(query_error)?;
            into_recipes(rows)
        })
        .await
    }

    async fn text_search(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Recipe>, StoreError> {
        let pattern = format!("%{}%", escape_like(query.trim()));
        self.with_conn("text_search", move |conn| {
            let rows = recipes::table
                .filter(
                    recipes::title
                        .ilike(pattern.as_str())
                        .or(recipes::summary.ilike(pattern.as_str())),
                )
                .order(recipes::id.asc())
                .limit(limit.max(0))
                .offset(offset.max(0))
                .select(RecipeRow::as_select())
                .load(conn)
                .map_err(query_error)?;
            into_recipes(rows)
        })
        .await
    }
}
