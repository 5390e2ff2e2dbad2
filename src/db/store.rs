//! Storage seams used by the orchestrator and the task runners.
//!
//! `PgStore` is the production backend; `memory::MemoryStore` implements the
//! same contracts in process.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::{queries, StoreError};
use crate::models::job::{JobKind, JobRecord};
use crate::models::recipe::Recipe;

#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn create(&self, owner_id: &str, title: &str) -> Result<Recipe, StoreError>;

    /// Owner-scoped lookup; a foreign recipe is reported as absent.
    async fn find(&self, recipe_id: i64, owner_id: &str) -> Result<Option<Recipe>, StoreError>;

    /// Unscoped lookup for detached task runners.
    async fn find_unscoped(&self, recipe_id: i64) -> Result<Option<Recipe>, StoreError>;

    async fn list(&self, owner_id: &str) -> Result<Vec<Recipe>, StoreError>;

    async fn set_image(
        &self,
        recipe_id: i64,
        owner_id: &str,
        image: &str,
    ) -> Result<Option<Recipe>, StoreError>;

    async fn rename(
        &self,
        recipe_id: i64,
        owner_id: &str,
        title: &str,
    ) -> Result<Option<Recipe>, StoreError>;

    async fn delete(&self, recipe_id: i64, owner_id: &str) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new `running` job. Fails with `StoreError::Duplicate` when the
    /// recipe already has a job of this kind.
    async fn insert_running(&self, kind: JobKind, recipe_id: i64) -> Result<JobRecord, StoreError>;

    /// Lookup joined on the recipe owner.
    async fn find_for_owner(
        &self,
        kind: JobKind,
        job_id: i64,
        owner_id: &str,
    ) -> Result<Option<JobRecord>, StoreError>;

    async fn find_by_recipe(&self, kind: JobKind, recipe_id: i64) -> Result<Option<JobRecord>, StoreError>;

    async fn find_by_id(&self, kind: JobKind, job_id: i64) -> Result<Option<JobRecord>, StoreError>;

    /// `running` → `completed`. Returns false if the job was not running.
    async fn complete(&self, kind: JobKind, job_id: i64, payload: &str) -> Result<bool, StoreError>;

    /// `running` → `completed` for a generation job, copying `title` onto the
    /// owning recipe atomically. Returns false if the job was not running.
    async fn complete_generation(&self, job_id: i64, payload: &str, title: &str) -> Result<bool, StoreError>;

    /// `running` → `failed`. Returns false if the job was not running.
    async fn fail(&self, kind: JobKind, job_id: i64) -> Result<bool, StoreError>;

    /// Overwrite the payload of a `completed` job. `None` if it is not completed.
    async fn replace_result(
        &self,
        kind: JobKind,
        job_id: i64,
        payload: &str,
    ) -> Result<Option<JobRecord>, StoreError>;
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecipeStore for PgStore {
    async fn create(&self, owner_id: &str, title: &str) -> Result<Recipe, StoreError> {
        queries::create_recipe(&self.pool, owner_id, title).await
    }

    async fn find(&self, recipe_id: i64, owner_id: &str) -> Result<Option<Recipe>, StoreError> {
        queries::find_recipe(&self.pool, recipe_id, owner_id).await
    }

    async fn find_unscoped(&self, recipe_id: i64) -> Result<Option<Recipe>, StoreError> {
        queries::find_recipe_by_id(&self.pool, recipe_id).await
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Recipe>, StoreError> {
        queries::list_recipes(&self.pool, owner_id).await
    }

    async fn set_image(
        &self,
        recipe_id: i64,
        owner_id: &str,
        image: &str,
    ) -> Result<Option<Recipe>, StoreError> {
        queries::set_recipe_image(&self.pool, recipe_id, owner_id, image).await
    }

    async fn rename(
        &self,
        recipe_id: i64,
        owner_id: &str,
        title: &str,
    ) -> Result<Option<Recipe>, StoreError> {
        queries::rename_recipe(&self.pool, recipe_id, owner_id, title).await
    }

    async fn delete(&self, recipe_id: i64, owner_id: &str) -> Result<bool, StoreError> {
        queries::delete_recipe(&self.pool, recipe_id, owner_id).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        queries::ping(&self.pool).await
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn insert_running(&self, kind: JobKind, recipe_id: i64) -> Result<JobRecord, StoreError> {
        queries::insert_running_job(&self.pool, kind, recipe_id).await
    }

    async fn find_for_owner(
        &self,
        kind: JobKind,
        job_id: i64,
        owner_id: &str,
    ) -> Result<Option<JobRecord>, StoreError> {
        queries::find_job_for_owner(&self.pool, kind, job_id, owner_id).await
    }

    async fn find_by_recipe(&self, kind: JobKind, recipe_id: i64) -> Result<Option<JobRecord>, StoreError> {
        queries::find_job_by_recipe(&self.pool, kind, recipe_id).await
    }

    async fn find_by_id(&self, kind: JobKind, job_id: i64) -> Result<Option<JobRecord>, StoreError> {
        queries::find_job(&self.pool, kind, job_id).await
    }

    async fn complete(&self, kind: JobKind, job_id: i64, payload: &str) -> Result<bool, StoreError> {
        queries::complete_job(&self.pool, kind, job_id, payload).await
    }

    async fn complete_generation(&self, job_id: i64, payload: &str, title: &str) -> Result<bool, StoreError> {
        queries::complete_generation_job(&self.pool, job_id, payload, title).await
    }

    async fn fail(&self, kind: JobKind, job_id: i64) -> Result<bool, StoreError> {
        queries::fail_job(&self.pool, kind, job_id).await
    }

    async fn replace_result(
        &self,
        kind: JobKind,
        job_id: i64,
        payload: &str,
    ) -> Result<Option<JobRecord>, StoreError> {
        queries::replace_job_result(&self.pool, kind, job_id, payload).await
    }
}
