//! The ledger store: typed collections plus the paired movement commit
//!
//! The store is constructed by the process entry point and injected into
//! every engine service; nothing in the core holds it as a global. Each
//! mutating operation is scoped to exactly one document — the sole widening
//! is [`LedgerStore::apply_movement_txn`], which commits an inventory item
//! update and its immutable movement record under one critical section so
//! readers never observe the item without its movement.

mod collection;

pub use collection::{Collection, Document, Subscription};

use std::sync::Arc;

use uuid::Uuid;

use shared::models::{
    Category, InventoryItem, InventoryMovement, MenuItem, Order, Recipe,
};

use crate::config::StoreConfig;
use crate::error::{AppError, AppResult};

use collection::Versioned;

impl Document for Order {
    const RESOURCE: &'static str = "Order";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Document for InventoryItem {
    const RESOURCE: &'static str = "Inventory item";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Document for InventoryMovement {
    const RESOURCE: &'static str = "Inventory movement";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Document for Recipe {
    const RESOURCE: &'static str = "Recipe";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Document for MenuItem {
    const RESOURCE: &'static str = "Menu item";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Document for Category {
    const RESOURCE: &'static str = "Category";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// All collections of the platform, one store per process.
pub struct LedgerStore {
    pub orders: Collection<Order>,
    pub inventory_items: Collection<InventoryItem>,
    pub inventory_movements: Collection<InventoryMovement>,
    pub recipes: Collection<Recipe>,
    pub menu_items: Collection<MenuItem>,
    pub categories: Collection<Category>,
    max_txn_attempts: u32,
}

impl LedgerStore {
    pub fn new(config: &StoreConfig) -> Self {
        let attempts = config.max_txn_attempts.max(1);
        Self {
            orders: Collection::new(attempts),
            inventory_items: Collection::new(attempts),
            inventory_movements: Collection::new(attempts),
            recipes: Collection::new(attempts),
            menu_items: Collection::new(attempts),
            categories: Collection::new(attempts),
            max_txn_attempts: attempts,
        }
    }

    pub fn shared(config: &StoreConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    /// Atomic movement transaction: read the item, derive its updated state
    /// and the movement record, then commit both together.
    ///
    /// The closure runs on a snapshot and may be retried on version
    /// conflicts; a closure error (insufficient stock, validation) aborts
    /// with no write at all. Lock order is items then movements, and this is
    /// the only place both are held.
    pub async fn apply_movement_txn<F>(
        &self,
        item_id: Uuid,
        txn: F,
    ) -> AppResult<InventoryMovement>
    where
        F: Fn(&InventoryItem) -> AppResult<(InventoryItem, InventoryMovement)>,
    {
        for _ in 0..self.max_txn_attempts {
            let (current, version) = self.inventory_items.read_versioned(item_id).await?;
            let (updated, movement) = txn(&current)?;

            let mut items = self.inventory_items.docs.write().await;
            match items.get_mut(&item_id) {
                None => return Err(AppError::NotFound(InventoryItem::RESOURCE.to_string())),
                Some(entry) if entry.version == version => {
                    entry.version += 1;
                    entry.doc = updated;

                    // Append the movement while the items guard is held so the
                    // two writes are observed together or not at all.
                    let mut movements = self.inventory_movements.docs.write().await;
                    movements.insert(
                        movement.id,
                        Versioned {
                            version: 1,
                            doc: movement.clone(),
                        },
                    );
                    let movement_snapshot = Collection::materialize(&movements);
                    drop(movements);
                    let item_snapshot = Collection::materialize(&items);
                    drop(items);

                    self.inventory_items.publish(item_snapshot);
                    self.inventory_movements.publish(movement_snapshot);
                    return Ok(movement);
                }
                // Another movement committed first; re-read and retry
                Some(_) => continue,
            }
        }
        Err(AppError::Unavailable(
            "Movement transaction exhausted its retry budget".to_string(),
        ))
    }
}
