//! Comanda Restaurant Operations Platform - Backend
//!
//! Order ledger, inventory tracking, recipe costing, and profitability
//! reporting for multi-location restaurants.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;

use services::{KitchenSignalService, RollupRegistry};
use store::LedgerStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LedgerStore>,
    pub config: Arc<Config>,
    pub signals: KitchenSignalService,
    pub rollups: RollupRegistry,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = LedgerStore::shared(&config.store);
        let signals = KitchenSignalService::default();
        let rollups = RollupRegistry::new(store.clone());
        Self {
            store,
            config: Arc::new(config),
            signals,
            rollups,
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Comanda Restaurant Operations Platform API v1.0"
}
