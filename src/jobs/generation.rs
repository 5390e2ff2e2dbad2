use std::time::Instant;

use crate::jobs::{TaskError, TaskRunner};
use crate::models::job::{encode_result, JobKind};
use crate::models::recipe::normalize_title;
use crate::services::recipe_generator::GenerationError;

impl TaskRunner {
    /// Generate a recipe from `ingredients` and finalize the job.
    ///
    /// On success the generated title, trimmed and bounded, is written to both
    /// the stored document and the owning recipe.
    /// On failure the recipe is left untouched.
    pub async fn run_generation(&self, job_id: i64, ingredients: &[String]) {
        let started = Instant::now();
        let outcome = self.generate(job_id, ingredients).await;
        self.finish(JobKind::Generation, job_id, outcome, started).await;
    }

    async fn generate(&self, job_id: i64, ingredients: &[String]) -> Result<bool, TaskError> {
        let job = self.load_running(JobKind::Generation, job_id).await?;

        let names = normalize_names(ingredients);
        if names.is_empty() {
            return Err(GenerationError::EmptyIngredients.into());
        }

        let engine_started = Instant::now();
        let generated = self.generator.generate(&names).await;
        metrics::histogram!("recipe_engine_call_seconds", "kind" => JobKind::Generation.as_str())
            .record(engine_started.elapsed().as_secs_f64());
        let mut recipe = generated?;

        let title = normalize_title(recipe.title());
        if title.is_empty() {
            return Err(GenerationError::InvalidField("title is blank".to_string()).into());
        }
        if title != recipe.title() {
            recipe.set_title(&title);
        }

        let missing = recipe.missing_ingredients(&names);
        if !missing.is_empty() {
            tracing::warn!(job_id, recipe_id = job.recipe_id, ?missing, "Generated recipe omits requested ingredients");
        }

        tracing::info!(
            job_id,
            recipe_id = job.recipe_id,
            title = %title,
            steps = recipe.step_count(),
            engine_ms = engine_started.elapsed().as_millis() as u64,
            "Recipe generated"
        );

        let payload = encode_result(&recipe)?;
        Ok(self
            .jobs
            .complete_generation(job_id, &payload, &title)
            .await?)
    }
}

/// Trim names, drop blanks and case-insensitive duplicates, keep first-seen order.
pub fn normalize_names(ingredients: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(ingredients.len());
    for name in ingredients.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        if !names.iter().any(|seen| seen.eq_ignore_ascii_case(name)) {
            names.push(name.to_string());
        }
    }
    names
}
