//! Two-stage job pipeline: ingredient detection, then recipe generation.
//!
//! The [`orchestrator::JobOrchestrator`] creates job rows and hands work to a
//! [`crate::services::executor::TaskSubmitter`]. A [`TaskRunner`] later picks
//! each item up, calls the external engine and writes the terminal state.
//! Engine failures never reach the job's creator; they only show up as a
//! `failed` status when polling.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::db::store::{JobStore, RecipeStore};
use crate::db::StoreError;
use crate::models::job::{JobKind, JobRecord};
use crate::services::executor::WorkItem;
use crate::services::ingredient_detector::{DetectionError, IngredientDetector};
use crate::services::recipe_generator::{GenerationError, RecipeGenerator};

pub mod detection;
pub mod generation;
pub mod orchestrator;

/// Executes work items against the external engines and finalizes job rows.
///
/// Cheap to clone; every dependency is shared.
#[derive(Clone)]
pub struct TaskRunner {
    recipes: Arc<dyn RecipeStore>,
    jobs: Arc<dyn JobStore>,
    detector: Arc<dyn IngredientDetector>,
    generator: Arc<dyn RecipeGenerator>,
    upload_dir: PathBuf,
}

impl TaskRunner {
    pub fn new(
        recipes: Arc<dyn RecipeStore>,
        jobs: Arc<dyn JobStore>,
        detector: Arc<dyn IngredientDetector>,
        generator: Arc<dyn RecipeGenerator>,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            recipes,
            jobs,
            detector,
            generator,
            upload_dir: upload_dir.into(),
        }
    }

    /// Run one work item to a terminal state.
    pub async fn run(&self, item: &WorkItem) {
        match item.kind {
            JobKind::Detection => self.run_detection(item.job_id).await,
            JobKind::Generation => self.run_generation(item.job_id, &item.ingredients).await,
        }
    }

    /// Like [`TaskRunner::run`], but on a separate task so that a panic inside
    /// an engine client still leaves the job `failed` instead of `running`.
    pub async fn run_guarded(&self, item: WorkItem) {
        let kind = item.kind;
        let job_id = item.job_id;
        let runner = self.clone();

        let handle = tokio::spawn(async move { runner.run(&item).await });
        if let Err(e) = handle.await {
            tracing::error!(job_id, kind = kind.as_str(), error = %e, "Task runner aborted");
            self.mark_failed(kind, job_id).await;
        }
    }

    /// Load a job that is still waiting for its terminal write.
    async fn load_running(&self, kind: JobKind, job_id: i64) -> Result<JobRecord, TaskError> {
        let job = self
            .jobs
            .find_by_id(kind, job_id)
            .await?
            .ok_or(TaskError::MissingJob(job_id))?;

        if job.status.is_terminal() {
            return Err(TaskError::AlreadyFinished);
        }
        Ok(job)
    }

    /// Single exit point for both runners.
    async fn finish(&self, kind: JobKind, job_id: i64, outcome: Result<bool, TaskError>, started: Instant) {
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(true) => {
                metrics::counter!("recipe_jobs_completed_total", "kind" => kind.as_str()).increment(1);
                tracing::info!(job_id, kind = kind.as_str(), elapsed_ms, "Job completed");
            }
            Ok(false) | Err(TaskError::AlreadyFinished) => {
                tracing::debug!(job_id, kind = kind.as_str(), "Job already finished, nothing to do");
            }
            Err(e) => {
                tracing::warn!(job_id, kind = kind.as_str(), elapsed_ms, error = %e, "Job failed");
                self.mark_failed(kind, job_id).await;
            }
        }
    }

    pub(crate) async fn mark_failed(&self, kind: JobKind, job_id: i64) {
        match self.jobs.fail(kind, job_id).await {
            Ok(true) => {
                metrics::counter!("recipe_jobs_failed_total", "kind" => kind.as_str()).increment(1);
            }
            Ok(false) => {
                tracing::debug!(job_id, kind = kind.as_str(), "Job already terminal, not marking failed");
            }
            Err(e) => {
                tracing::error!(job_id, kind = kind.as_str(), error = %e, "Failed to mark job as failed");
            }
        }
    }
}

/// Why a task runner could not complete its job. Recorded only as the job's
/// `failed` status and in server logs.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Job {0} not found")]
    MissingJob(i64),

    #[error("Job already reached a terminal state")]
    AlreadyFinished,

    #[error("Recipe {0} not found")]
    MissingRecipe(i64),

    #[error("Recipe {0} has no image attached")]
    NoImage(i64),

    #[error("No ingredients detected in image")]
    NothingDetected,

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}
