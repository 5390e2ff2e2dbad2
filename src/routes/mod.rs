use axum::routing::{get, post, put};
use axum::Router;

use crate::app_state::AppState;

pub mod error;
pub mod health;
pub mod jobs;
pub mod metrics;
pub mod recipes;

/// API routes without transport layers; `main` adds tracing, CORS and limits.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/recipes/{id}",
            get(recipes::get_recipe)
                .patch(recipes::rename_recipe)
                .delete(recipes::delete_recipe),
        )
        .route("/recipes/{id}/image", put(recipes::attach_image))
        .route("/recipes/{id}/ingredients", put(jobs::update_ingredients))
        .route("/recipes/{id}/jobs", get(jobs::get_recipe_jobs))
        // POST takes a recipe id, GET a job id.
        .route(
            "/jobs/ingredients/{id}",
            post(jobs::create_ingredients_job).get(jobs::get_ingredients_job),
        )
        .route(
            "/jobs/recipe/{id}",
            post(jobs::create_recipe_job).get(jobs::get_recipe_job),
        )
        .with_state(state)
}
