//! Menu models: categories and sellable items

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A menu category ("Drinks", "Mains"), used for sales breakdowns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(restaurant_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            restaurant_id,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Where a menu item's cost comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CostSource {
    /// Prepared dish costed through its recipe
    Recipe { recipe_id: Uuid },
    /// Direct resale of a stock item (e.g. bottled drink), no recipe
    Inventory { item_id: Uuid },
}

/// Menu item availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuItemStatus {
    Active,
    Inactive,
}

/// A sellable item on the menu
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub cost_source: CostSource,
    pub category_id: Uuid,
    pub status: MenuItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MenuItem {
    pub fn new(
        restaurant_id: Uuid,
        name: impl Into<String>,
        price: Decimal,
        cost_source: CostSource,
        category_id: Uuid,
    ) -> Result<Self, &'static str> {
        if price < Decimal::ZERO {
            return Err("Price cannot be negative");
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            restaurant_id,
            name: name.into(),
            price,
            cost_source,
            category_id,
            status: MenuItemStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == MenuItemStatus::Active
    }
}
