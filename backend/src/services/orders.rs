//! Order engine
//!
//! Owns the order lifecycle (open → preparing → paid, cancel = hard delete),
//! line items partitioned into sub-accounts, and the cached subtotal. Every
//! mutation is a single-document transaction on the order; the subtotal is
//! recomputed inside the same transaction as any item change.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use shared::models::{
    CostSource, MenuItem, MovementType, Order, OrderItem, OrderStatus, SubAccount,
};
use shared::types::{Actor, Snapshot};

use crate::config::{BillingConfig, OrderPolicyConfig};
use crate::error::{AppError, AppResult};
use crate::services::inventory::{ApplyMovementInput, InventoryService};
use crate::services::notification::{KitchenEvent, KitchenSignalService};
use crate::store::{LedgerStore, Subscription};

/// Order engine service
#[derive(Clone)]
pub struct OrderService {
    store: Arc<LedgerStore>,
    signals: KitchenSignalService,
    inventory: InventoryService,
    policy: OrderPolicyConfig,
    billing: BillingConfig,
}

/// Input for opening an order
#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    /// Table number, takeout tag, delivery reference
    pub table_label: Option<String>,
}

/// Presentation-time totals; the stored subtotal stays tax-exclusive
#[derive(Debug, Clone, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Result of closing an order: the paid order plus any non-fatal warnings
/// from the optional inventory debit.
#[derive(Debug, Serialize)]
pub struct CloseOrderOutcome {
    pub order: Order,
    pub warnings: Vec<String>,
}

impl OrderService {
    pub fn new(
        store: Arc<LedgerStore>,
        signals: KitchenSignalService,
        policy: OrderPolicyConfig,
        billing: BillingConfig,
    ) -> Self {
        let inventory = InventoryService::new(store.clone());
        Self {
            store,
            signals,
            inventory,
            policy,
            billing,
        }
    }

    /// Open an order with no items and the default "General" sub-account.
    pub async fn create_order(
        &self,
        restaurant_id: Uuid,
        actor: &Actor,
        input: CreateOrderInput,
    ) -> AppResult<Order> {
        let order = Order::open(restaurant_id, actor.id, input.table_label);
        self.store.orders.insert(order).await
    }

    /// Add one unit of a menu item to a sub-account.
    ///
    /// If a line for the same (menu item, sub-account) pair exists its
    /// quantity is incremented, otherwise a new line is appended with the
    /// menu item's name, price, and category snapshotted at this moment.
    /// No stock check happens here.
    pub async fn add_item(
        &self,
        restaurant_id: Uuid,
        order_id: Uuid,
        menu_item_id: Uuid,
        sub_account_id: Uuid,
    ) -> AppResult<Order> {
        let menu_item = self.menu_item(restaurant_id, menu_item_id).await?;
        if !menu_item.is_active() {
            return Err(AppError::ValidationError(format!(
                "Menu item {} is inactive",
                menu_item.name
            )));
        }

        let (order, _) = self
            .store
            .orders
            .update(order_id, |order| {
                Self::guard_tenant(order, restaurant_id)?;
                Self::guard_mutable(order)?;
                if order.sub_account(sub_account_id).is_none() {
                    return Err(AppError::NotFound("Sub-account".to_string()));
                }

                match order.find_line_mut(menu_item_id, sub_account_id) {
                    Some(line) => line.quantity += 1,
                    None => order.items.push(OrderItem {
                        menu_item_id,
                        name: Snapshot::capture(menu_item.name.clone()),
                        price: Snapshot::capture(menu_item.price),
                        quantity: 1,
                        sub_account_id,
                        category_id: menu_item.category_id,
                    }),
                }
                order.refresh_subtotal();
                Ok(())
            })
            .await?;
        Ok(order)
    }

    /// Remove one unit of a line, dropping the line entirely at quantity 1.
    ///
    /// When the order is already in the kitchen, a best-effort signal is
    /// fired after the commit; a lost signal never undoes the removal.
    pub async fn remove_item(
        &self,
        restaurant_id: Uuid,
        order_id: Uuid,
        menu_item_id: Uuid,
        sub_account_id: Uuid,
    ) -> AppResult<Order> {
        let (order, removed) = self
            .store
            .orders
            .update(order_id, |order| {
                Self::guard_tenant(order, restaurant_id)?;
                Self::guard_mutable(order)?;

                let in_kitchen = order.status == OrderStatus::Preparing;
                let line = order
                    .find_line_mut(menu_item_id, sub_account_id)
                    .ok_or_else(|| AppError::NotFound("Order item".to_string()))?;
                let name = line.name.cloned();

                if line.quantity > 1 {
                    line.quantity -= 1;
                } else {
                    order
                        .items
                        .retain(|i| !(i.menu_item_id == menu_item_id && i.sub_account_id == sub_account_id));
                }
                order.refresh_subtotal();
                Ok((name, in_kitchen))
            })
            .await?;

        let (item_name, in_kitchen) = removed;
        if in_kitchen {
            self.signals.emit(KitchenEvent::ItemRemoved {
                order_id,
                item_name,
                quantity: 1,
            });
        }
        Ok(order)
    }

    /// Append a new sub-account with a generated name.
    pub async fn add_sub_account(&self, restaurant_id: Uuid, order_id: Uuid) -> AppResult<Order> {
        let (order, _) = self
            .store
            .orders
            .update(order_id, |order| {
                Self::guard_tenant(order, restaurant_id)?;
                Self::guard_mutable(order)?;
                let name = format!("Account {}", order.sub_accounts.len() + 1);
                order.sub_accounts.push(SubAccount {
                    id: Uuid::new_v4(),
                    name,
                });
                Ok(())
            })
            .await?;
        Ok(order)
    }

    /// Remove a sub-account; rejected while any line still references it.
    pub async fn remove_sub_account(
        &self,
        restaurant_id: Uuid,
        order_id: Uuid,
        sub_account_id: Uuid,
    ) -> AppResult<Order> {
        let (order, _) = self
            .store
            .orders
            .update(order_id, |order| {
                Self::guard_tenant(order, restaurant_id)?;
                Self::guard_mutable(order)?;
                let sub = order
                    .sub_account(sub_account_id)
                    .ok_or_else(|| AppError::NotFound("Sub-account".to_string()))?;
                let name = sub.name.clone();

                let item_count = order.items_in_sub_account(sub_account_id);
                if item_count > 0 {
                    return Err(AppError::SubAccountNotEmpty { name, item_count });
                }
                if order.sub_accounts.len() == 1 {
                    return Err(AppError::ValidationError(
                        "An order must keep at least one sub-account".to_string(),
                    ));
                }
                order.sub_accounts.retain(|s| s.id != sub_account_id);
                Ok(())
            })
            .await?;
        Ok(order)
    }

    /// Dispatch the order to the kitchen: open → preparing, stamping
    /// `sent_to_kitchen_at` once. Re-sending an order already in the kitchen
    /// is a no-op that leaves the timestamp untouched.
    pub async fn send_to_kitchen(&self, restaurant_id: Uuid, order_id: Uuid) -> AppResult<Order> {
        let (order, _) = self
            .store
            .orders
            .update(order_id, |order| {
                Self::guard_tenant(order, restaurant_id)?;
                match order.status {
                    OrderStatus::Open => {
                        if order.items.is_empty() {
                            return Err(AppError::ValidationError(
                                "Cannot send an order with no items to the kitchen".to_string(),
                            ));
                        }
                        order.status = OrderStatus::Preparing;
                        order.sent_to_kitchen_at = Some(Utc::now());
                        Ok(())
                    }
                    // Idempotent: already dispatched, keep the original stamp
                    OrderStatus::Preparing => Ok(()),
                    OrderStatus::Paid => Err(AppError::InvalidStateTransition(
                        "A paid order cannot be sent to the kitchen".to_string(),
                    )),
                }
            })
            .await?;
        Ok(order)
    }

    /// Close the order as paid. Empty orders are accepted or rejected per
    /// the configured policy. With auto-debit enabled, recipe ingredients
    /// are debited from inventory after the commit; debit failures come back
    /// as warnings and never unwind the paid transition.
    pub async fn close_order(
        &self,
        restaurant_id: Uuid,
        actor: &Actor,
        order_id: Uuid,
    ) -> AppResult<CloseOrderOutcome> {
        let allow_empty = self.policy.allow_empty_close;
        let (order, _) = self
            .store
            .orders
            .update(order_id, |order| {
                Self::guard_tenant(order, restaurant_id)?;
                match order.status {
                    OrderStatus::Open | OrderStatus::Preparing => {
                        if order.items.is_empty() && !allow_empty {
                            return Err(AppError::ValidationError(
                                "Closing an order with no items is disabled".to_string(),
                            ));
                        }
                        order.status = OrderStatus::Paid;
                        Ok(())
                    }
                    OrderStatus::Paid => Err(AppError::InvalidStateTransition(
                        "Order is already paid".to_string(),
                    )),
                }
            })
            .await?;

        let warnings = if self.policy.auto_debit_inventory {
            self.debit_consumed_stock(restaurant_id, actor, &order).await
        } else {
            Vec::new()
        };

        Ok(CloseOrderOutcome { order, warnings })
    }

    /// Cancel the order: the document is hard-deleted, and observers treat
    /// its disappearance as cancellation.
    pub async fn cancel_order(&self, restaurant_id: Uuid, order_id: Uuid) -> AppResult<()> {
        self.store
            .orders
            .remove_if(order_id, |order| {
                Self::guard_tenant(order, restaurant_id)?;
                if order.status == OrderStatus::Paid {
                    return Err(AppError::InvalidStateTransition(
                        "A paid order cannot be cancelled".to_string(),
                    ));
                }
                Ok(())
            })
            .await?;
        self.signals.emit(KitchenEvent::OrderCancelled { order_id });
        Ok(())
    }

    pub async fn get_order(&self, restaurant_id: Uuid, order_id: Uuid) -> AppResult<Order> {
        let order = self.store.orders.get(order_id).await?;
        Self::guard_tenant(&order, restaurant_id)?;
        Ok(order)
    }

    /// Orders for the restaurant, optionally narrowed to one status,
    /// newest first.
    pub async fn list_orders(
        &self,
        restaurant_id: Uuid,
        status: Option<OrderStatus>,
    ) -> AppResult<Vec<Order>> {
        let mut orders = self
            .store
            .orders
            .list(|o| o.restaurant_id == restaurant_id && status.map_or(true, |s| o.status == s))
            .await;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Presentation totals: tax is applied here only, never stored.
    pub fn totals(&self, order: &Order) -> OrderTotals {
        let tax = order.subtotal * self.billing.tax_rate;
        OrderTotals {
            subtotal: order.subtotal,
            tax_rate: self.billing.tax_rate,
            tax,
            total: order.subtotal + tax,
        }
    }

    /// Subscribe to the orders collection (kitchen and delivery boards).
    pub fn subscribe(&self) -> Subscription<Order> {
        self.store.orders.subscribe()
    }

    /// Debit the stock consumed by a paid order, one exit movement per
    /// ingredient per sold item. Each debit is its own single-document
    /// transaction; failures degrade to warnings.
    async fn debit_consumed_stock(
        &self,
        restaurant_id: Uuid,
        actor: &Actor,
        order: &Order,
    ) -> Vec<String> {
        let mut warnings = Vec::new();
        for item in &order.items {
            let exits = match self.consumed_quantities(restaurant_id, item).await {
                Ok(exits) => exits,
                Err(err) => {
                    warnings.push(format!("{}: {}", *item.name, err));
                    continue;
                }
            };
            for (stock_item_id, quantity) in exits {
                let result = self
                    .inventory
                    .apply_movement(
                        restaurant_id,
                        actor,
                        ApplyMovementInput {
                            item_id: stock_item_id,
                            movement_type: MovementType::Exit,
                            quantity,
                            cost: None,
                        },
                    )
                    .await;
                if let Err(err) = result {
                    tracing::warn!(order_id = %order.id, %stock_item_id, "auto-debit failed: {}", err);
                    warnings.push(format!("{}: {}", *item.name, err));
                }
            }
        }
        warnings
    }

    /// Stock quantities consumed by one order line.
    async fn consumed_quantities(
        &self,
        restaurant_id: Uuid,
        item: &OrderItem,
    ) -> AppResult<Vec<(Uuid, Decimal)>> {
        let sold = Decimal::from(item.quantity);
        let menu_item = self.menu_item(restaurant_id, item.menu_item_id).await?;
        match menu_item.cost_source {
            CostSource::Inventory { item_id } => Ok(vec![(item_id, sold)]),
            CostSource::Recipe { recipe_id } => {
                let recipe = self.store.recipes.get(recipe_id).await?;
                Ok(recipe
                    .ingredients
                    .iter()
                    .map(|line| (line.item_id, line.quantity * sold))
                    .collect())
            }
        }
    }

    async fn menu_item(&self, restaurant_id: Uuid, menu_item_id: Uuid) -> AppResult<MenuItem> {
        let menu_item = self.store.menu_items.get(menu_item_id).await?;
        if menu_item.restaurant_id != restaurant_id {
            return Err(AppError::NotFound("Menu item".to_string()));
        }
        Ok(menu_item)
    }

    fn guard_tenant(order: &Order, restaurant_id: Uuid) -> AppResult<()> {
        if order.restaurant_id != restaurant_id {
            return Err(AppError::NotFound("Order".to_string()));
        }
        Ok(())
    }

    fn guard_mutable(order: &Order) -> AppResult<()> {
        if order.status.is_terminal() {
            return Err(AppError::InvalidStateTransition(
                "A paid order cannot be edited".to_string(),
            ));
        }
        Ok(())
    }
}
