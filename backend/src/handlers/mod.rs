//! HTTP handlers, thin wrappers over the engine services

mod health;
mod inventory;
mod menu;
mod orders;
mod recipes;
mod reporting;

pub use health::*;
pub use inventory::*;
pub use menu::*;
pub use orders::*;
pub use recipes::*;
pub use reporting::*;
