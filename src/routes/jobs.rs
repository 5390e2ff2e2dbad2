use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::Caller;
use crate::models::ingredient::DetectedIngredient;
use crate::models::not_blank;
use crate::models::job::{JobRecord, RecipeJobs};
use crate::routes::error::ApiError;

/// An ingredient as sent back by the client. Other keys (e.g. `confidence`)
/// are ignored; users may add ingredients the detector never saw.
#[derive(Debug, Deserialize, Validate)]
pub struct IngredientInput {
    #[garde(length(chars, min = 1, max = 100), custom(not_blank))]
    pub name: String,
}

/// Body of POST /jobs/recipe/{recipe_id}.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecipeJobRequest {
    #[garde(length(min = 1, max = 100), dive)]
    pub ingredients: Vec<IngredientInput>,
}

/// Body of PUT /recipes/{recipe_id}/ingredients.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateIngredientsRequest {
    #[garde(length(max = 100), dive)]
    pub ingredients: Vec<DetectedIngredient>,
}

/// POST /jobs/ingredients/{recipe_id}: Start ingredient detection.
/// Returns immediately; poll the job for the result.
pub async fn create_ingredients_job(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(recipe_id): Path<i64>,
) -> Result<(StatusCode, Json<JobRecord>), ApiError> {
    let job = state
        .orchestrator
        .create_detection_job(recipe_id, &owner)
        .await
        .map_err(|e| ApiError::from_job(e, "Recipe"))?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /jobs/ingredients/{job_id}
pub async fn get_ingredients_job(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(job_id): Path<i64>,
) -> Result<Json<JobRecord>, ApiError> {
    state
        .orchestrator
        .get_detection_job(job_id, &owner)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_job(e, "Ingredients job"))
}

/// POST /jobs/recipe/{recipe_id}: Start recipe generation from the
/// (possibly edited) ingredient list.
pub async fn create_recipe_job(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(recipe_id): Path<i64>,
    Json(req): Json<CreateRecipeJobRequest>,
) -> Result<(StatusCode, Json<JobRecord>), ApiError> {
    req.validate()?;
    let names = req.ingredients.into_iter().map(|i| i.name).collect();

    let job = state
        .orchestrator
        .create_generation_job(recipe_id, &owner, names)
        .await
        .map_err(|e| ApiError::from_job(e, "Recipe"))?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /jobs/recipe/{job_id}
pub async fn get_recipe_job(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(job_id): Path<i64>,
) -> Result<Json<JobRecord>, ApiError> {
    state
        .orchestrator
        .get_generation_job(job_id, &owner)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_job(e, "Recipe job"))
}

/// PUT /recipes/{recipe_id}/ingredients: Overwrite the detected ingredients.
pub async fn update_ingredients(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(recipe_id): Path<i64>,
    Json(req): Json<UpdateIngredientsRequest>,
) -> Result<Json<JobRecord>, ApiError> {
    req.validate()?;
    state
        .orchestrator
        .update_detection_result(recipe_id, &owner, req.ingredients)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_job(e, "Ingredients job"))
}

/// GET /recipes/{recipe_id}/jobs: Both jobs of a recipe.
pub async fn get_recipe_jobs(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(recipe_id): Path<i64>,
) -> Result<Json<RecipeJobs>, ApiError> {
    state
        .orchestrator
        .get_jobs_for_recipe(recipe_id, &owner)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_job(e, "Recipe"))
}
