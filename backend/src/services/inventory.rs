//! Inventory movement engine
//!
//! Applies stock entries, exits, and adjustments as atomic transactions that
//! pair the item update with one immutable movement record. An exit that
//! would drive stock negative is rejected before any write.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use shared::models::{InventoryItem, InventoryMovement, MovementType, UnitOfMeasure};
use shared::types::{Actor, Snapshot};
use shared::validation::{validate_non_negative_amount, validate_positive_quantity};

use crate::error::{AppError, AppResult};
use crate::store::{LedgerStore, Subscription};

/// Inventory service for stock items and the movement ledger
#[derive(Clone)]
pub struct InventoryService {
    store: Arc<LedgerStore>,
}

/// Input for applying a stock movement
#[derive(Debug, Deserialize)]
pub struct ApplyMovementInput {
    pub item_id: Uuid,
    pub movement_type: MovementType,
    /// For entry/exit, the delta; for adjustment, the absolute new stock
    pub quantity: Decimal,
    /// Purchase cost per unit, entries only
    pub cost: Option<Decimal>,
}

/// Input for registering a stock item
#[derive(Debug, Deserialize)]
pub struct CreateItemInput {
    pub name: String,
    pub category: String,
    pub unit: UnitOfMeasure,
    pub initial_stock: Decimal,
    pub minimum_stock: Decimal,
    pub average_cost: Decimal,
}

impl InventoryService {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Apply one stock movement.
    ///
    /// Inside a single transaction: read the item, compute the new stock
    /// (entry adds, exit subtracts, adjustment sets absolutely), write the
    /// updated item together with one movement record carrying the
    /// before/after snapshot and the acting user. Exactly one movement per
    /// successful call, zero on failure.
    pub async fn apply_movement(
        &self,
        restaurant_id: Uuid,
        actor: &Actor,
        input: ApplyMovementInput,
    ) -> AppResult<InventoryMovement> {
        validate_positive_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
            message_es: "La cantidad debe ser positiva".to_string(),
        })?;
        if let Some(cost) = input.cost {
            validate_non_negative_amount(cost).map_err(|msg| AppError::Validation {
                field: "cost".to_string(),
                message: msg.to_string(),
                message_es: "El costo no puede ser negativo".to_string(),
            })?;
        }

        let movement = self
            .store
            .apply_movement_txn(input.item_id, |item| {
                if item.restaurant_id != restaurant_id {
                    return Err(AppError::NotFound("Inventory item".to_string()));
                }

                let previous_stock = item.current_stock;
                let new_stock = match input.movement_type {
                    MovementType::Entry => previous_stock + input.quantity,
                    MovementType::Exit => {
                        let remaining = previous_stock - input.quantity;
                        if remaining < Decimal::ZERO {
                            return Err(AppError::InsufficientStock {
                                item_name: item.name.clone(),
                                available: previous_stock,
                                requested: input.quantity,
                            });
                        }
                        remaining
                    }
                    MovementType::Adjustment => input.quantity,
                };

                let mut updated = item.clone();
                updated.current_stock = new_stock;
                updated.updated_at = Utc::now();
                if input.movement_type == MovementType::Entry {
                    if let Some(cost) = input.cost {
                        updated.average_cost =
                            weighted_average_cost(previous_stock, item.average_cost, input.quantity, cost);
                    }
                }

                let movement = InventoryMovement {
                    id: Uuid::new_v4(),
                    restaurant_id,
                    item_id: item.id,
                    item_name: Snapshot::capture(item.name.clone()),
                    movement_type: input.movement_type,
                    quantity: input.quantity,
                    cost: match input.movement_type {
                        MovementType::Entry => input.cost,
                        _ => None,
                    },
                    previous_stock,
                    new_stock,
                    performed_by: actor.clone(),
                    created_at: Utc::now(),
                };

                Ok((updated, movement))
            })
            .await?;

        tracing::info!(
            item = %*movement.item_name,
            movement_type = movement.movement_type.as_str(),
            %movement.previous_stock,
            %movement.new_stock,
            "stock movement applied"
        );
        Ok(movement)
    }

    /// Register a new stock item.
    pub async fn create_item(
        &self,
        restaurant_id: Uuid,
        input: CreateItemInput,
    ) -> AppResult<InventoryItem> {
        let item = InventoryItem::new(
            restaurant_id,
            input.name,
            input.category,
            input.unit,
            input.initial_stock,
            input.minimum_stock,
            input.average_cost,
        )
        .map_err(|msg| AppError::ValidationError(msg.to_string()))?;
        self.store.inventory_items.insert(item).await
    }

    pub async fn get_item(&self, restaurant_id: Uuid, item_id: Uuid) -> AppResult<InventoryItem> {
        let item = self.store.inventory_items.get(item_id).await?;
        if item.restaurant_id != restaurant_id {
            return Err(AppError::NotFound("Inventory item".to_string()));
        }
        Ok(item)
    }

    pub async fn list_items(&self, restaurant_id: Uuid) -> AppResult<Vec<InventoryItem>> {
        let mut items = self
            .store
            .inventory_items
            .list(|i| i.restaurant_id == restaurant_id)
            .await;
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    /// Items at or below their alert threshold.
    pub async fn list_low_stock(&self, restaurant_id: Uuid) -> AppResult<Vec<InventoryItem>> {
        let mut items = self
            .store
            .inventory_items
            .list(|i| i.restaurant_id == restaurant_id && i.is_low_stock())
            .await;
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    /// Movement history for one item, newest first.
    pub async fn item_movements(
        &self,
        restaurant_id: Uuid,
        item_id: Uuid,
    ) -> AppResult<Vec<InventoryMovement>> {
        // Surfaces NotFound for foreign or missing items
        self.get_item(restaurant_id, item_id).await?;
        let mut movements = self
            .store
            .inventory_movements
            .list(|m| m.restaurant_id == restaurant_id && m.item_id == item_id)
            .await;
        movements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(movements)
    }

    /// Full movement ledger for the restaurant, newest first.
    pub async fn list_movements(&self, restaurant_id: Uuid) -> AppResult<Vec<InventoryMovement>> {
        let mut movements = self
            .store
            .inventory_movements
            .list(|m| m.restaurant_id == restaurant_id)
            .await;
        movements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(movements)
    }

    pub fn subscribe_items(&self) -> Subscription<InventoryItem> {
        self.store.inventory_items.subscribe()
    }

    pub fn subscribe_movements(&self) -> Subscription<InventoryMovement> {
        self.store.inventory_movements.subscribe()
    }
}

/// Fold a costed entry into the running average cost.
fn weighted_average_cost(
    previous_stock: Decimal,
    previous_avg: Decimal,
    quantity: Decimal,
    unit_cost: Decimal,
) -> Decimal {
    let total = previous_stock + quantity;
    if total <= Decimal::ZERO {
        return unit_cost;
    }
    (previous_stock * previous_avg + quantity * unit_cost) / total
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn weighted_average_blends_by_quantity() {
        // 100 units at 20 plus 50 units at 30 -> 3500 / 150
        let avg = weighted_average_cost(dec("100"), dec("20"), dec("50"), dec("30"));
        assert!(avg > dec("23.3") && avg < dec("23.4"));
    }

    #[test]
    fn weighted_average_from_empty_stock_is_entry_cost() {
        let avg = weighted_average_cost(Decimal::ZERO, Decimal::ZERO, dec("10"), dec("7.5"));
        assert_eq!(avg, dec("7.5"));
    }
}
