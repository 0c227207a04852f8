//! Recipe models with snapshot costing
//!
//! A recipe's cost is computed once when it is saved and cached on the
//! document. Later changes to an ingredient's average cost do not touch
//! previously saved recipes; reports that need the current cost recompute
//! it from the live inventory items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::UnitOfMeasure;
use crate::types::Snapshot;

/// One ingredient line of a recipe.
///
/// Name, unit, and unit cost are captured from the inventory item at save
/// time so the recipe reads the same even after the item changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientLine {
    pub item_id: Uuid,
    pub item_name: Snapshot<String>,
    pub quantity: Decimal,
    pub unit: Snapshot<UnitOfMeasure>,
    /// Unit cost of the item when the recipe was saved
    pub unit_cost: Snapshot<Decimal>,
}

impl IngredientLine {
    /// Cost contribution of this line at save-time prices.
    pub fn line_cost(&self) -> Decimal {
        self.quantity * *self.unit_cost
    }
}

/// A dish recipe: ordered ingredient list plus cached cost
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub ingredients: Vec<IngredientLine>,
    /// Σ(quantity × unit_cost) at save time; never recomputed retroactively
    pub cost: Snapshot<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    /// Sum of line costs; used when saving to populate the cached cost.
    pub fn compute_cost(ingredients: &[IngredientLine]) -> Decimal {
        ingredients.iter().map(IngredientLine::line_cost).sum()
    }
}
