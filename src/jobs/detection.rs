use std::time::Instant;

use crate::jobs::{TaskError, TaskRunner};
use crate::models::ingredient::DetectionResult;
use crate::models::job::{encode_result, JobKind};

impl TaskRunner {
    /// Detect the ingredients in the job's recipe image and finalize the job.
    ///
    /// Never returns an error: every failure ends as a `failed` job.
    pub async fn run_detection(&self, job_id: i64) {
        let started = Instant::now();
        let outcome = self.detect(job_id).await;
        self.finish(JobKind::Detection, job_id, outcome, started).await;
    }

    async fn detect(&self, job_id: i64) -> Result<bool, TaskError> {
        let job = self.load_running(JobKind::Detection, job_id).await?;

        let recipe = self
            .recipes
            .find_unscoped(job.recipe_id)
            .await?
            .ok_or(TaskError::MissingRecipe(job.recipe_id))?;

        let image = recipe
            .image
            .as_deref()
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .ok_or(TaskError::NoImage(recipe.id))?;
        let image_path = self.upload_dir.join(image);

        tracing::debug!(job_id, recipe_id = recipe.id, image = %image_path.display(), "Calling detection engine");
        let engine_started = Instant::now();
        let detected = self.detector.detect(&image_path.to_string_lossy()).await;
        metrics::histogram!("recipe_engine_call_seconds", "kind" => JobKind::Detection.as_str())
            .record(engine_started.elapsed().as_secs_f64());

        let ingredients = detected?;
        if ingredients.is_empty() {
            return Err(TaskError::NothingDetected);
        }

        tracing::info!(
            job_id,
            recipe_id = recipe.id,
            count = ingredients.len(),
            engine_ms = engine_started.elapsed().as_millis() as u64,
            "Ingredients detected"
        );

        let payload = encode_result(&DetectionResult { ingredients })?;
        Ok(self.jobs.complete(JobKind::Detection, job_id, &payload).await?)
    }
}
