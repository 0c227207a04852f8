//! Shared types and models for the Comanda Restaurant Operations Platform
//!
//! This crate contains the domain entities shared between the backend and
//! any other component of the system (boards, admin tools).

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
