//! Order models: the single unit of transactional mutation
//!
//! One `Order` aggregates every line item for one table, takeout, or
//! delivery instance. All item and sub-account edits are single-document
//! transactions on the order; the cached subtotal is recomputed inside the
//! same transaction as any item mutation and is never trusted from a stale
//! read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Snapshot;

/// Order lifecycle, linear and forward-only.
///
/// Cancellation is not a status: a cancelled order is hard-deleted, and
/// observers treat "document vanished" as cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    Preparing,
    Paid,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Paid => "paid",
        }
    }

    /// Terminal orders accept no further mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid)
    }
}

/// A named partition of an order's line items, used to split the bill
/// among diners sharing one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubAccount {
    pub id: Uuid,
    pub name: String,
}

/// One line of an order. Name, price, and category are snapshots of the
/// menu item at the moment it was added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub menu_item_id: Uuid,
    pub name: Snapshot<String>,
    pub price: Snapshot<Decimal>,
    pub quantity: u32,
    pub sub_account_id: Uuid,
    pub category_id: Uuid,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        *self.price * Decimal::from(self.quantity)
    }
}

/// An in-progress or completed order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub status: OrderStatus,
    /// Table number, takeout tag, delivery reference
    pub table_label: Option<String>,
    pub items: Vec<OrderItem>,
    /// At least one; "General" is created with the order
    pub sub_accounts: Vec<SubAccount>,
    /// Cached Σ(price × quantity), tax-exclusive
    pub subtotal: Decimal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    /// Set on first kitchen dispatch, never re-stamped
    pub sent_to_kitchen_at: Option<DateTime<Utc>>,
}

/// Name of the sub-account every order starts with
pub const DEFAULT_SUB_ACCOUNT: &str = "General";

impl Order {
    /// Create an open order with no items and the default sub-account.
    pub fn open(restaurant_id: Uuid, created_by: Uuid, table_label: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            restaurant_id,
            status: OrderStatus::Open,
            table_label,
            items: Vec::new(),
            sub_accounts: vec![SubAccount {
                id: Uuid::new_v4(),
                name: DEFAULT_SUB_ACCOUNT.to_string(),
            }],
            subtotal: Decimal::ZERO,
            created_by,
            created_at: Utc::now(),
            sent_to_kitchen_at: None,
        }
    }

    /// Subtotal as defined by the invariant: Σ(price × quantity).
    pub fn compute_subtotal(items: &[OrderItem]) -> Decimal {
        items.iter().map(OrderItem::line_total).sum()
    }

    /// Recompute the cached subtotal from the current item list. Must be
    /// called inside the same transaction as any item mutation.
    pub fn refresh_subtotal(&mut self) {
        self.subtotal = Self::compute_subtotal(&self.items);
    }

    pub fn sub_account(&self, sub_account_id: Uuid) -> Option<&SubAccount> {
        self.sub_accounts.iter().find(|s| s.id == sub_account_id)
    }

    /// Number of lines referencing a sub-account.
    pub fn items_in_sub_account(&self, sub_account_id: Uuid) -> usize {
        self.items
            .iter()
            .filter(|i| i.sub_account_id == sub_account_id)
            .count()
    }

    /// Locate the line for a (menu item, sub-account) pair.
    pub fn find_line_mut(
        &mut self,
        menu_item_id: Uuid,
        sub_account_id: Uuid,
    ) -> Option<&mut OrderItem> {
        self.items
            .iter_mut()
            .find(|i| i.menu_item_id == menu_item_id && i.sub_account_id == sub_account_id)
    }
}
