//! HTTP handlers for inventory endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use shared::models::{InventoryItem, InventoryMovement};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::inventory::{ApplyMovementInput, CreateItemInput, InventoryService};
use crate::AppState;

/// Apply a stock movement (entry, exit, or adjustment)
pub async fn apply_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ApplyMovementInput>,
) -> AppResult<Json<InventoryMovement>> {
    let service = InventoryService::new(state.store);
    let movement = service
        .apply_movement(current_user.0.restaurant_id, &current_user.0.actor(), input)
        .await?;
    Ok(Json(movement))
}

/// Register a new stock item
pub async fn create_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateItemInput>,
) -> AppResult<Json<InventoryItem>> {
    let service = InventoryService::new(state.store);
    let item = service
        .create_item(current_user.0.restaurant_id, input)
        .await?;
    Ok(Json(item))
}

/// Get one stock item
pub async fn get_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<InventoryItem>> {
    let service = InventoryService::new(state.store);
    let item = service
        .get_item(current_user.0.restaurant_id, item_id)
        .await?;
    Ok(Json(item))
}

/// List stock items
pub async fn list_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let service = InventoryService::new(state.store);
    let items = service.list_items(current_user.0.restaurant_id).await?;
    Ok(Json(items))
}

/// List items at or below their alert threshold
pub async fn list_low_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let service = InventoryService::new(state.store);
    let items = service.list_low_stock(current_user.0.restaurant_id).await?;
    Ok(Json(items))
}

/// Movement history for one item
pub async fn item_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<Vec<InventoryMovement>>> {
    let service = InventoryService::new(state.store);
    let movements = service
        .item_movements(current_user.0.restaurant_id, item_id)
        .await?;
    Ok(Json(movements))
}

/// Full movement ledger for the restaurant
pub async fn list_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<InventoryMovement>>> {
    let service = InventoryService::new(state.store);
    let movements = service.list_movements(current_user.0.restaurant_id).await?;
    Ok(Json(movements))
}
