//! HTTP handlers for order endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::models::{Order, OrderStatus};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::orders::{CloseOrderOutcome, CreateOrderInput, OrderService, OrderTotals};
use crate::AppState;

/// Order plus presentation-time totals
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    pub totals: OrderTotals,
}

/// A line reference: which menu item in which sub-account
#[derive(Debug, Deserialize)]
pub struct ItemRef {
    pub menu_item_id: Uuid,
    pub sub_account_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
}

fn order_service(state: &AppState) -> OrderService {
    OrderService::new(
        state.store.clone(),
        state.signals.clone(),
        state.config.orders.clone(),
        state.config.billing.clone(),
    )
}

/// Open a new order
pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<Json<OrderResponse>> {
    let service = order_service(&state);
    let order = service
        .create_order(current_user.0.restaurant_id, &current_user.0.actor(), input)
        .await?;
    let totals = service.totals(&order);
    Ok(Json(OrderResponse { order, totals }))
}

/// List orders, optionally by status
pub async fn list_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListOrdersQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let service = order_service(&state);
    let orders = service
        .list_orders(current_user.0.restaurant_id, query.status)
        .await?;
    Ok(Json(orders))
}

/// Get one order with its totals
pub async fn get_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderResponse>> {
    let service = order_service(&state);
    let order = service
        .get_order(current_user.0.restaurant_id, order_id)
        .await?;
    let totals = service.totals(&order);
    Ok(Json(OrderResponse { order, totals }))
}

/// Add one unit of a menu item to a sub-account
pub async fn add_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(item): Json<ItemRef>,
) -> AppResult<Json<Order>> {
    let service = order_service(&state);
    let order = service
        .add_item(
            current_user.0.restaurant_id,
            order_id,
            item.menu_item_id,
            item.sub_account_id,
        )
        .await?;
    Ok(Json(order))
}

/// Remove one unit of a line
pub async fn remove_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(item): Json<ItemRef>,
) -> AppResult<Json<Order>> {
    let service = order_service(&state);
    let order = service
        .remove_item(
            current_user.0.restaurant_id,
            order_id,
            item.menu_item_id,
            item.sub_account_id,
        )
        .await?;
    Ok(Json(order))
}

/// Append a new sub-account
pub async fn add_sub_account(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let service = order_service(&state);
    let order = service
        .add_sub_account(current_user.0.restaurant_id, order_id)
        .await?;
    Ok(Json(order))
}

/// Remove an empty sub-account
pub async fn remove_sub_account(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((order_id, sub_account_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Order>> {
    let service = order_service(&state);
    let order = service
        .remove_sub_account(current_user.0.restaurant_id, order_id, sub_account_id)
        .await?;
    Ok(Json(order))
}

/// Dispatch the order to the kitchen
pub async fn send_to_kitchen(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let service = order_service(&state);
    let order = service
        .send_to_kitchen(current_user.0.restaurant_id, order_id)
        .await?;
    Ok(Json(order))
}

/// Close the order as paid
pub async fn close_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<CloseOrderOutcome>> {
    let service = order_service(&state);
    let outcome = service
        .close_order(current_user.0.restaurant_id, &current_user.0.actor(), order_id)
        .await?;
    Ok(Json(outcome))
}

/// Cancel the order (hard delete)
pub async fn cancel_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = order_service(&state);
    service
        .cancel_order(current_user.0.restaurant_id, order_id)
        .await?;
    Ok(Json(()))
}
