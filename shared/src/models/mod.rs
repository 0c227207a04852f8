//! Domain models for the Comanda Restaurant Operations Platform

mod inventory;
mod menu;
mod order;
mod recipe;

pub use inventory::*;
pub use menu::*;
pub use order::*;
pub use recipe::*;
