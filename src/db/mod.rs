use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::models::job::JobKind;

pub mod memory;
pub mod queries;
pub mod store;

/// Initialize PostgreSQL connection pool
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("A {kind} job already exists for recipe {recipe_id}")]
    Duplicate { kind: JobKind, recipe_id: i64 },

    #[error("Recipe {0} does not exist")]
    MissingRecipe(i64),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}
