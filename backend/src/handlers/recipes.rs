//! HTTP handlers for recipe endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use shared::models::Recipe;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::recipes::{RecipeService, SaveRecipeInput};
use crate::AppState;

/// Cached vs. live cost of a recipe
#[derive(Debug, Serialize)]
pub struct RecipeCostResponse {
    pub recipe_id: Uuid,
    /// Snapshot cached when the recipe was last saved
    pub saved_cost: Decimal,
    /// Recomputed from today's average ingredient costs
    pub current_cost: Decimal,
}

/// Create a recipe, snapshotting ingredient costs now
pub async fn create_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<SaveRecipeInput>,
) -> AppResult<Json<Recipe>> {
    let service = RecipeService::new(state.store);
    let recipe = service
        .create_recipe(current_user.0.restaurant_id, input)
        .await?;
    Ok(Json(recipe))
}

/// Update a recipe, re-snapshotting costs
pub async fn update_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(recipe_id): Path<Uuid>,
    Json(input): Json<SaveRecipeInput>,
) -> AppResult<Json<Recipe>> {
    let service = RecipeService::new(state.store);
    let recipe = service
        .update_recipe(current_user.0.restaurant_id, recipe_id, input)
        .await?;
    Ok(Json(recipe))
}

/// Get one recipe
pub async fn get_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<Json<Recipe>> {
    let service = RecipeService::new(state.store);
    let recipe = service
        .get_recipe(current_user.0.restaurant_id, recipe_id)
        .await?;
    Ok(Json(recipe))
}

/// List recipes
pub async fn list_recipes(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Recipe>>> {
    let service = RecipeService::new(state.store);
    let recipes = service.list_recipes(current_user.0.restaurant_id).await?;
    Ok(Json(recipes))
}

/// Compare the cached cost snapshot with today's recomputed cost
pub async fn get_recipe_cost(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<Json<RecipeCostResponse>> {
    let service = RecipeService::new(state.store);
    let recipe = service
        .get_recipe(current_user.0.restaurant_id, recipe_id)
        .await?;
    let current_cost = service.current_cost(&recipe).await;
    Ok(Json(RecipeCostResponse {
        recipe_id: recipe.id,
        saved_cost: *recipe.cost,
        current_cost,
    }))
}
