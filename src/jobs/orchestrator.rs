use std::sync::Arc;

use garde::Validate;

use crate::db::store::{JobStore, RecipeStore};
use crate::db::StoreError;
use crate::jobs::generation::normalize_names;
use crate::models::ingredient::{DetectedIngredient, DetectionResult};
use crate::models::job::{encode_result, JobKind, JobRecord, JobStatus, RecipeJobs};
use crate::models::recipe::Recipe;
use crate::services::executor::{TaskSubmitter, WorkItem};
use crate::services::queue::QueueError;

/// Synchronous front of the job pipeline.
///
/// Creates job rows, enforces the per-recipe ordering and uniqueness rules,
/// hands work to the executor and answers status queries. Every lookup is
/// scoped by owner: a job on somebody else's recipe is reported exactly like
/// a job that does not exist.
#[derive(Clone)]
pub struct JobOrchestrator {
    recipes: Arc<dyn RecipeStore>,
    jobs: Arc<dyn JobStore>,
    submitter: Arc<dyn TaskSubmitter>,
}

impl JobOrchestrator {
    pub fn new(
        recipes: Arc<dyn RecipeStore>,
        jobs: Arc<dyn JobStore>,
        submitter: Arc<dyn TaskSubmitter>,
    ) -> Self {
        Self {
            recipes,
            jobs,
            submitter,
        }
    }

    /// Start ingredient detection for a recipe. Returns the `running` job
    /// without waiting for the engine.
    pub async fn create_detection_job(&self, recipe_id: i64, owner_id: &str) -> Result<JobRecord, JobError> {
        let recipe = self.owned_recipe(recipe_id, owner_id).await?;

        if self.jobs.find_by_recipe(JobKind::Detection, recipe.id).await?.is_some() {
            return Err(JobError::conflict(JobKind::Detection));
        }

        let job = self.insert_running(JobKind::Detection, recipe.id).await?;
        self.dispatch(&job, WorkItem::detection(job.id)).await?;
        Ok(job)
    }

    pub async fn get_detection_job(&self, job_id: i64, owner_id: &str) -> Result<JobRecord, JobError> {
        self.owned_job(JobKind::Detection, job_id, owner_id).await
    }

    /// Start recipe generation from a caller-supplied ingredient list, which
    /// may differ from what detection found.
    ///
    /// Requires a `completed` detection job on the same recipe.
    pub async fn create_generation_job(
        &self,
        recipe_id: i64,
        owner_id: &str,
        ingredients: Vec<String>,
    ) -> Result<JobRecord, JobError> {
        let recipe = self.owned_recipe(recipe_id, owner_id).await?;

        let detection = self.jobs.find_by_recipe(JobKind::Detection, recipe.id).await?;
        match detection.map(|j| j.status) {
            Some(JobStatus::Completed) => {}
            Some(status) => {
                return Err(JobError::BadRequest(format!(
                    "Ingredients detection is {} for this recipe, it must be completed first",
                    status
                )))
            }
            None => {
                return Err(JobError::BadRequest(
                    "Ingredients detection has not been run for this recipe".to_string(),
                ))
            }
        }

        if self.jobs.find_by_recipe(JobKind::Generation, recipe.id).await?.is_some() {
            return Err(JobError::conflict(JobKind::Generation));
        }

        let names = normalize_names(&ingredients);
        if names.is_empty() {
            return Err(JobError::BadRequest("Ingredient list is empty".to_string()));
        }

        let job = self.insert_running(JobKind::Generation, recipe.id).await?;
        self.dispatch(&job, WorkItem::generation(job.id, names)).await?;
        Ok(job)
    }

    pub async fn get_generation_job(&self, job_id: i64, owner_id: &str) -> Result<JobRecord, JobError> {
        self.owned_job(JobKind::Generation, job_id, owner_id).await
    }

    /// Replace a completed detection job's ingredient list with user edits.
    pub async fn update_detection_result(
        &self,
        recipe_id: i64,
        owner_id: &str,
        ingredients: Vec<DetectedIngredient>,
    ) -> Result<JobRecord, JobError> {
        let recipe = self.owned_recipe(recipe_id, owner_id).await?;

        let job = self
            .jobs
            .find_by_recipe(JobKind::Detection, recipe.id)
            .await?
            .ok_or(JobError::NotFound)?;

        if job.status != JobStatus::Completed {
            return Err(JobError::BadRequest(format!(
                "Ingredients job is {}, only completed jobs can be edited",
                job.status
            )));
        }

        let edited = DetectionResult { ingredients };
        edited
            .validate()
            .map_err(|report| JobError::BadRequest(report.to_string()))?;

        let payload = encode_result(&edited)?;
        self.jobs
            .replace_result(JobKind::Detection, job.id, &payload)
            .await?
            .ok_or(JobError::NotFound)
    }

    /// Both jobs of a recipe, each absent if never created.
    pub async fn get_jobs_for_recipe(&self, recipe_id: i64, owner_id: &str) -> Result<RecipeJobs, JobError> {
        let recipe = self.owned_recipe(recipe_id, owner_id).await?;

        Ok(RecipeJobs {
            ingredients_job: self.jobs.find_by_recipe(JobKind::Detection, recipe.id).await?,
            recipe_job: self.jobs.find_by_recipe(JobKind::Generation, recipe.id).await?,
        })
    }

    async fn owned_recipe(&self, recipe_id: i64, owner_id: &str) -> Result<Recipe, JobError> {
        self.recipes
            .find(recipe_id, owner_id)
            .await?
            .ok_or(JobError::NotFound)
    }

    async fn owned_job(&self, kind: JobKind, job_id: i64, owner_id: &str) -> Result<JobRecord, JobError> {
        self.jobs
            .find_for_owner(kind, job_id, owner_id)
            .await?
            .ok_or(JobError::NotFound)
    }

    async fn insert_running(&self, kind: JobKind, recipe_id: i64) -> Result<JobRecord, JobError> {
        self.jobs
            .insert_running(kind, recipe_id)
            .await
            .map_err(|e| match e {
                StoreError::Duplicate { kind, .. } => JobError::conflict(kind),
                StoreError::MissingRecipe(_) => JobError::NotFound,
                other => JobError::Store(other),
            })
    }

    /// Hand the job to the executor. If that fails the row is marked `failed`
    /// so it does not stay `running` forever.
    async fn dispatch(&self, job: &JobRecord, item: WorkItem) -> Result<(), JobError> {
        if let Err(e) = self.submitter.submit(item).await {
            tracing::error!(
                job_id = job.id,
                kind = job.kind.as_str(),
                backend = self.submitter.backend(),
                error = %e,
                "Failed to submit job"
            );
            if let Err(fail_err) = self.jobs.fail(job.kind, job.id).await {
                tracing::error!(job_id = job.id, error = %fail_err, "Failed to mark unsubmitted job as failed");
            }
            return Err(JobError::Queue(e));
        }

        metrics::counter!("recipe_jobs_submitted_total", "kind" => job.kind.as_str()).increment(1);
        tracing::info!(
            job_id = job.id,
            recipe_id = job.recipe_id,
            kind = job.kind.as_str(),
            backend = self.submitter.backend(),
            "Job submitted"
        );
        Ok(())
    }
}

/// Errors surfaced synchronously to the caller of an orchestrator operation.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Recipe or job absent, or owned by someone else.
    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl JobError {
    fn conflict(kind: JobKind) -> Self {
        let label = match kind {
            JobKind::Detection => "Ingredients",
            JobKind::Generation => "Recipe",
        };
        JobError::Conflict(format!("{} job already exists for this recipe", label))
    }
}
