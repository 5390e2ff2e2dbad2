use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::str::FromStr;

use crate::db::StoreError;
use crate::models::job::{JobKind, JobRecord, JobStatus};
use crate::models::recipe::Recipe;

const RECIPE_COLUMNS: &str = "id, owner_id, title, image, created_at";

fn recipe_from_row(row: &PgRow) -> Result<Recipe, sqlx::Error> {
    Ok(Recipe {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        title: row.try_get("title")?,
        image: row.try_get("image")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Job columns for `kind`, with the result column aliased to `result_json`.
fn job_columns(kind: JobKind, prefix: &str) -> String {
    format!(
        "{p}id, {p}recipe_id, {p}status, {p}{result} AS result_json, {p}start_time, {p}end_time",
        p = prefix,
        result = kind.result_column()
    )
}

fn job_from_row(kind: JobKind, row: &PgRow) -> Result<JobRecord, StoreError> {
    let status_str: String = row.try_get("status")?;
    let status = JobStatus::from_str(&status_str)
        .map_err(|_| StoreError::Corrupt(format!("unknown job status '{}'", status_str)))?;

    Ok(JobRecord {
        id: row.try_get("id")?,
        kind,
        recipe_id: row.try_get("recipe_id")?,
        status,
        result_json: row.try_get("result_json")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
    })
}

// ── Recipes ──────────────────────────────────────────────────────────

/// Insert a new recipe
pub async fn create_recipe(pool: &PgPool, owner_id: &str, title: &str) -> Result<Recipe, StoreError> {
    let row = sqlx::query(&format!(
        "INSERT INTO recipes (owner_id, title) VALUES ($1, $2) RETURNING {}",
        RECIPE_COLUMNS
    ))
    .bind(owner_id)
    .bind(title)
    .fetch_one(pool)
    .await?;

    Ok(recipe_from_row(&row)?)
}

/// Get a recipe by ID, only if it belongs to `owner_id`
pub async fn find_recipe(
    pool: &PgPool,
    recipe_id: i64,
    owner_id: &str,
) -> Result<Option<Recipe>, StoreError> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM recipes WHERE id = $1 AND owner_id = $2",
        RECIPE_COLUMNS
    ))
    .bind(recipe_id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(recipe_from_row).transpose()?)
}

/// Get a recipe by ID regardless of owner (task runners only)
pub async fn find_recipe_by_id(pool: &PgPool, recipe_id: i64) -> Result<Option<Recipe>, StoreError> {
    let row = sqlx::query(&format!("SELECT {} FROM recipes WHERE id = $1", RECIPE_COLUMNS))
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(recipe_from_row).transpose()?)
}

/// List an owner's recipes, newest first
pub async fn list_recipes(pool: &PgPool, owner_id: &str) -> Result<Vec<Recipe>, StoreError> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM recipes WHERE owner_id = $1 ORDER BY created_at DESC, id DESC",
        RECIPE_COLUMNS
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|r| recipe_from_row(r).map_err(StoreError::from))
        .collect()
}

/// Set the image reference of an owned recipe
pub async fn set_recipe_image(
    pool: &PgPool,
    recipe_id: i64,
    owner_id: &str,
    image: &str,
) -> Result<Option<Recipe>, StoreError> {
    let row = sqlx::query(&format!(
        "UPDATE recipes SET image = $3 WHERE id = $1 AND owner_id = $2 RETURNING {}",
        RECIPE_COLUMNS
    ))
    .bind(recipe_id)
    .bind(owner_id)
    .bind(image)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(recipe_from_row).transpose()?)
}

/// Rename an owned recipe
pub async fn rename_recipe(
    pool: &PgPool,
    recipe_id: i64,
    owner_id: &str,
    title: &str,
) -> Result<Option<Recipe>, StoreError> {
    let row = sqlx::query(&format!(
        "UPDATE recipes SET title = $3 WHERE id = $1 AND owner_id = $2 RETURNING {}",
        RECIPE_COLUMNS
    ))
    .bind(recipe_id)
    .bind(owner_id)
    .bind(title)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(recipe_from_row).transpose()?)
}

/// Delete an owned recipe; its jobs go with it
pub async fn delete_recipe(pool: &PgPool, recipe_id: i64, owner_id: &str) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1 AND owner_id = $2")
        .bind(recipe_id)
        .bind(owner_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// ── Jobs ─────────────────────────────────────────────────────────────

/// Insert a new running job. A second job of the same kind for the same
/// recipe hits the unique index and comes back as `StoreError::Duplicate`.
pub async fn insert_running_job(
    pool: &PgPool,
    kind: JobKind,
    recipe_id: i64,
) -> Result<JobRecord, StoreError> {
    let sql = format!(
        "INSERT INTO {} (recipe_id, status) VALUES ($1, 'running') RETURNING {}",
        kind.table(),
        job_columns(kind, "")
    );

    let row = sqlx::query(&sql)
        .bind(recipe_id)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate { kind, recipe_id }
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::MissingRecipe(recipe_id)
            }
            _ => StoreError::Database(e),
        })?;

    job_from_row(kind, &row)
}

/// Get a job by ID, only if its recipe belongs to `owner_id`
pub async fn find_job_for_owner(
    pool: &PgPool,
    kind: JobKind,
    job_id: i64,
    owner_id: &str,
) -> Result<Option<JobRecord>, StoreError> {
    let sql = format!(
        "SELECT {} FROM {} j JOIN recipes r ON r.id = j.recipe_id \
         WHERE j.id = $1 AND r.owner_id = $2",
        job_columns(kind, "j."),
        kind.table()
    );

    let row = sqlx::query(&sql)
        .bind(job_id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(|r| job_from_row(kind, r)).transpose()
}

/// Get the job of `kind` attached to a recipe
pub async fn find_job_by_recipe(
    pool: &PgPool,
    kind: JobKind,
    recipe_id: i64,
) -> Result<Option<JobRecord>, StoreError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE recipe_id = $1",
        job_columns(kind, ""),
        kind.table()
    );

    let row = sqlx::query(&sql)
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(|r| job_from_row(kind, r)).transpose()
}

/// Get a job by ID
pub async fn find_job(pool: &PgPool, kind: JobKind, job_id: i64) -> Result<Option<JobRecord>, StoreError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = $1",
        job_columns(kind, ""),
        kind.table()
    );

    let row = sqlx::query(&sql)
        .bind(job_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(|r| job_from_row(kind, r)).transpose()
}

/// Move a running job to `completed` with its payload.
/// Returns false when the job was not running.
pub async fn complete_job(
    pool: &PgPool,
    kind: JobKind,
    job_id: i64,
    payload: &str,
) -> Result<bool, StoreError> {
    let sql = format!(
        "UPDATE {} SET status = 'completed', {} = $2, end_time = NOW() \
         WHERE id = $1 AND status = 'running'",
        kind.table(),
        kind.result_column()
    );

    let result = sqlx::query(&sql)
        .bind(job_id)
        .bind(payload)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Complete a generation job and copy the generated title onto its recipe,
/// in one transaction. The title is untouched unless the job transitioned.
pub async fn complete_generation_job(
    pool: &PgPool,
    job_id: i64,
    payload: &str,
    title: &str,
) -> Result<bool, StoreError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"
        UPDATE recipe_jobs
        SET status = 'completed', recipe_json = $2, end_time = NOW()
        WHERE id = $1 AND status = 'running'
        RETURNING recipe_id
        "#,
    )
    .bind(job_id)
    .bind(payload)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        tx.rollback().await?;
        return Ok(false);
    };
    let recipe_id: i64 = row.try_get("recipe_id")?;

    sqlx::query("UPDATE recipes SET title = $2 WHERE id = $1")
        .bind(recipe_id)
        .bind(title)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

/// Move a running job to `failed`. Returns false when the job was not running.
pub async fn fail_job(pool: &PgPool, kind: JobKind, job_id: i64) -> Result<bool, StoreError> {
    let sql = format!(
        "UPDATE {} SET status = 'failed', {} = NULL, end_time = NOW() \
         WHERE id = $1 AND status = 'running'",
        kind.table(),
        kind.result_column()
    );

    let result = sqlx::query(&sql).bind(job_id).execute(pool).await?;

    Ok(result.rows_affected() > 0)
}

/// Overwrite the payload of a completed job
pub async fn replace_job_result(
    pool: &PgPool,
    kind: JobKind,
    job_id: i64,
    payload: &str,
) -> Result<Option<JobRecord>, StoreError> {
    let sql = format!(
        "UPDATE {} SET {} = $2 WHERE id = $1 AND status = 'completed' RETURNING {}",
        kind.table(),
        kind.result_column(),
        job_columns(kind, "")
    );

    let row = sqlx::query(&sql)
        .bind(job_id)
        .bind(payload)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(|r| job_from_row(kind, r)).transpose()
}

/// Connectivity check used by the health endpoint
pub async fn ping(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
