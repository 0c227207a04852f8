//! Engine services for the Comanda Restaurant Operations Platform

pub mod inventory;
pub mod notification;
pub mod orders;
pub mod recipes;
pub mod reporting;

pub use inventory::InventoryService;
pub use notification::KitchenSignalService;
pub use orders::OrderService;
pub use recipes::{MenuService, RecipeService};
pub use reporting::{ReportingService, RollupRegistry};
