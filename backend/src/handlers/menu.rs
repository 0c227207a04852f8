//! HTTP handlers for menu endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::models::{Category, MenuItem};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::recipes::{CreateMenuItemInput, MenuService, UpdateMenuItemInput};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
}

/// Create a menu category
pub async fn create_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateCategoryInput>,
) -> AppResult<Json<Category>> {
    let service = MenuService::new(state.store);
    let category = service
        .create_category(current_user.0.restaurant_id, input.name)
        .await?;
    Ok(Json(category))
}

/// List menu categories
pub async fn list_categories(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Category>>> {
    let service = MenuService::new(state.store);
    let categories = service.list_categories(current_user.0.restaurant_id).await?;
    Ok(Json(categories))
}

/// Create a menu item
pub async fn create_menu_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMenuItemInput>,
) -> AppResult<Json<MenuItem>> {
    let service = MenuService::new(state.store);
    let item = service
        .create_menu_item(current_user.0.restaurant_id, input)
        .await?;
    Ok(Json(item))
}

/// Update a menu item
pub async fn update_menu_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(menu_item_id): Path<Uuid>,
    Json(input): Json<UpdateMenuItemInput>,
) -> AppResult<Json<MenuItem>> {
    let service = MenuService::new(state.store);
    let item = service
        .update_menu_item(current_user.0.restaurant_id, menu_item_id, input)
        .await?;
    Ok(Json(item))
}

/// Get one menu item
pub async fn get_menu_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(menu_item_id): Path<Uuid>,
) -> AppResult<Json<MenuItem>> {
    let service = MenuService::new(state.store);
    let item = service
        .get_menu_item(current_user.0.restaurant_id, menu_item_id)
        .await?;
    Ok(Json(item))
}

/// List menu items
pub async fn list_menu_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<MenuItem>>> {
    let service = MenuService::new(state.store);
    let items = service.list_menu_items(current_user.0.restaurant_id).await?;
    Ok(Json(items))
}
