//! Inventory models: stock items and the movement audit ledger

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Actor, Snapshot};

/// Unit of measure for a stock item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitOfMeasure {
    Kilogram,
    Gram,
    Liter,
    Milliliter,
    Piece,
}

impl UnitOfMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitOfMeasure::Kilogram => "kg",
            UnitOfMeasure::Gram => "g",
            UnitOfMeasure::Liter => "l",
            UnitOfMeasure::Milliliter => "ml",
            UnitOfMeasure::Piece => "piece",
        }
    }
}

/// A physical stock item owned by a restaurant.
///
/// `current_stock` is mutated only through movement transactions and never
/// goes below zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub category: String,
    pub unit: UnitOfMeasure,
    pub current_stock: Decimal,
    /// Alert threshold, informational only
    pub minimum_stock: Decimal,
    /// Average cost per unit, updated by costed entry movements
    pub average_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Create an item, rejecting negative stock or costs at the boundary.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        restaurant_id: Uuid,
        name: impl Into<String>,
        category: impl Into<String>,
        unit: UnitOfMeasure,
        current_stock: Decimal,
        minimum_stock: Decimal,
        average_cost: Decimal,
    ) -> Result<Self, &'static str> {
        if current_stock < Decimal::ZERO {
            return Err("Stock cannot be negative");
        }
        if minimum_stock < Decimal::ZERO {
            return Err("Minimum stock cannot be negative");
        }
        if average_cost < Decimal::ZERO {
            return Err("Average cost cannot be negative");
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            restaurant_id,
            name: name.into(),
            category: category.into(),
            unit,
            current_stock,
            minimum_stock,
            average_cost,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether the item has fallen to or below its alert threshold.
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.minimum_stock
    }
}

/// Kinds of stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Stock received; may carry a purchase cost
    Entry,
    /// Stock consumed or sold
    Exit,
    /// Absolute correction: quantity is the new stock level
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entry => "entry",
            MovementType::Exit => "exit",
            MovementType::Adjustment => "adjustment",
        }
    }
}

/// One immutable record of a stock change.
///
/// Written exactly once per successful movement transaction, never edited or
/// deleted. Corrections are new `Adjustment` movements, so the full audit
/// history is preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub item_id: Uuid,
    /// Item name as it was at write time
    pub item_name: Snapshot<String>,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    /// Purchase cost per unit; only meaningful for entries
    pub cost: Option<Decimal>,
    pub previous_stock: Decimal,
    pub new_stock: Decimal,
    pub performed_by: Actor,
    pub created_at: DateTime<Utc>,
}
