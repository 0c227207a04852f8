//! Route definitions for the Comanda Restaurant Operations Platform

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - orders
        .nest("/orders", order_routes())
        // Protected routes - inventory
        .nest("/inventory", inventory_routes())
        // Protected routes - recipes
        .nest("/recipes", recipe_routes())
        // Protected routes - menu
        .nest("/menu", menu_routes())
        // Protected routes - reports
        .nest("/reports", report_routes())
}

/// Order management routes (protected)
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route(
            "/:order_id",
            get(handlers::get_order).delete(handlers::cancel_order),
        )
        .route(
            "/:order_id/items",
            post(handlers::add_item).delete(handlers::remove_item),
        )
        .route("/:order_id/sub-accounts", post(handlers::add_sub_account))
        .route(
            "/:order_id/sub-accounts/:sub_account_id",
            delete(handlers::remove_sub_account),
        )
        .route("/:order_id/send-to-kitchen", post(handlers::send_to_kitchen))
        .route("/:order_id/close", post(handlers::close_order))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Inventory routes (protected)
fn inventory_routes() -> Router<AppState> {
    Router::new()
        // Items
        .route("/items", get(handlers::list_items).post(handlers::create_item))
        .route("/items/low-stock", get(handlers::list_low_stock))
        .route("/items/:item_id", get(handlers::get_item))
        .route("/items/:item_id/movements", get(handlers::item_movements))
        // Movement ledger
        .route(
            "/movements",
            get(handlers::list_movements).post(handlers::apply_movement),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Recipe routes (protected)
fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_recipes).post(handlers::create_recipe))
        .route(
            "/:recipe_id",
            get(handlers::get_recipe).put(handlers::update_recipe),
        )
        .route("/:recipe_id/cost", get(handlers::get_recipe_cost))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Menu routes (protected)
fn menu_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/items",
            get(handlers::list_menu_items).post(handlers::create_menu_item),
        )
        .route(
            "/items/:menu_item_id",
            get(handlers::get_menu_item).put(handlers::update_menu_item),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Report routes (protected)
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/profitability", get(handlers::profitability_report))
        .route("/consumption", get(handlers::consumption_report))
        .route("/rollup", get(handlers::daily_rollup))
        .route_layer(middleware::from_fn(auth_middleware))
}
