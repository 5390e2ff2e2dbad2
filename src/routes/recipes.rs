use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use garde::Validate;

use crate::app_state::AppState;
use crate::auth::Caller;
use crate::models::recipe::{default_title, AttachImageRequest, Recipe, RenameRecipeRequest};
use crate::routes::error::ApiError;

/// POST /recipes: Create an empty recipe for the caller.
pub async fn create_recipe(
    State(state): State<AppState>,
    Caller(owner): Caller,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    let recipe = state.recipes.create(&owner, &default_title(Utc::now())).await?;
    tracing::info!(recipe_id = recipe.id, "Recipe created");
    Ok((StatusCode::CREATED, Json(recipe)))
}

/// GET /recipes: The caller's recipes, newest first.
pub async fn list_recipes(
    State(state): State<AppState>,
    Caller(owner): Caller,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    Ok(Json(state.recipes.list(&owner).await?))
}

/// GET /recipes/{id}
pub async fn get_recipe(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(recipe_id): Path<i64>,
) -> Result<Json<Recipe>, ApiError> {
    state
        .recipes
        .find(recipe_id, &owner)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Recipe"))
}

/// PATCH /recipes/{id}: Rename.
pub async fn rename_recipe(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(recipe_id): Path<i64>,
    Json(req): Json<RenameRecipeRequest>,
) -> Result<Json<Recipe>, ApiError> {
    req.validate()?;
    state
        .recipes
        .rename(recipe_id, &owner, req.title.trim())
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Recipe"))
}

/// PUT /recipes/{id}/image: Record the uploaded photo's file name.
pub async fn attach_image(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(recipe_id): Path<i64>,
    Json(req): Json<AttachImageRequest>,
) -> Result<Json<Recipe>, ApiError> {
    req.validate()?;
    state
        .recipes
        .set_image(recipe_id, &owner, &req.image)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Recipe"))
}

/// DELETE /recipes/{id}
pub async fn delete_recipe(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(recipe_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.recipes.delete(recipe_id, &owner).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Recipe"))
    }
}
