//! Order engine tests
//!
//! Tests for the order lifecycle including:
//! - Line items and price snapshots
//! - Cached subtotal consistency
//! - Sub-account rules
//! - open -> preparing -> paid transitions, cancel as hard delete
//! - Kitchen signals and the optional inventory auto-debit

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use comanda_backend::config::{BillingConfig, OrderPolicyConfig, StoreConfig};
use comanda_backend::error::AppError;
use comanda_backend::services::inventory::CreateItemInput;
use comanda_backend::services::notification::KitchenEvent;
use comanda_backend::services::orders::CreateOrderInput;
use comanda_backend::services::recipes::{
    CreateMenuItemInput, IngredientInput, SaveRecipeInput, UpdateMenuItemInput,
};
use comanda_backend::services::{
    InventoryService, KitchenSignalService, MenuService, OrderService, RecipeService,
};
use comanda_backend::store::LedgerStore;
use shared::models::{
    CostSource, MenuItem, MenuItemStatus, Order, OrderItem, OrderStatus, UnitOfMeasure,
    DEFAULT_SUB_ACCOUNT,
};
use shared::types::Actor;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

struct Fixture {
    signals: KitchenSignalService,
    orders: OrderService,
    menu: MenuService,
    inventory: InventoryService,
    recipes: RecipeService,
    restaurant: Uuid,
    actor: Actor,
}

fn fixture() -> Fixture {
    fixture_with(OrderPolicyConfig::default(), BillingConfig::default())
}

fn fixture_with(policy: OrderPolicyConfig, billing: BillingConfig) -> Fixture {
    let store: Arc<LedgerStore> = LedgerStore::shared(&StoreConfig::default());
    let signals = KitchenSignalService::default();
    Fixture {
        orders: OrderService::new(store.clone(), signals.clone(), policy, billing),
        menu: MenuService::new(store.clone()),
        inventory: InventoryService::new(store.clone()),
        recipes: RecipeService::new(store.clone()),
        signals,
        restaurant: Uuid::new_v4(),
        actor: Actor::new(Uuid::new_v4(), "Test Waiter"),
    }
}

impl Fixture {
    async fn open_order(&self) -> Order {
        self.orders
            .create_order(
                self.restaurant,
                &self.actor,
                CreateOrderInput {
                    table_label: Some("Table 4".to_string()),
                },
            )
            .await
            .unwrap()
    }

    /// Menu item priced against a single stock item, no recipe.
    async fn seed_dish(&self, name: &str, price: &str) -> MenuItem {
        let category = self
            .menu
            .create_category(self.restaurant, "Mains".to_string())
            .await
            .unwrap();
        let stock = self
            .inventory
            .create_item(
                self.restaurant,
                CreateItemInput {
                    name: format!("{} base", name),
                    category: "Produce".to_string(),
                    unit: UnitOfMeasure::Piece,
                    initial_stock: dec("100"),
                    minimum_stock: dec("5"),
                    average_cost: dec("10"),
                },
            )
            .await
            .unwrap();
        self.menu
            .create_menu_item(
                self.restaurant,
                CreateMenuItemInput {
                    name: name.to_string(),
                    price: dec(price),
                    cost_source: CostSource::Inventory { item_id: stock.id },
                    category_id: category.id,
                },
            )
            .await
            .unwrap()
    }
}

// ============================================================================
// Lifecycle and Line Item Tests
// ============================================================================

mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn new_order_starts_open_with_general_sub_account() {
        let fx = fixture();
        let order = fx.open_order().await;

        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.subtotal, Decimal::ZERO);
        assert_eq!(order.sub_accounts.len(), 1);
        assert_eq!(order.sub_accounts[0].name, DEFAULT_SUB_ACCOUNT);
        assert!(order.sent_to_kitchen_at.is_none());
    }

    #[tokio::test]
    async fn adding_same_item_twice_increments_the_line() {
        let fx = fixture();
        let dish = fx.seed_dish("Tacos", "150").await;
        let order = fx.open_order().await;
        let sub = order.sub_accounts[0].id;

        fx.orders
            .add_item(fx.restaurant, order.id, dish.id, sub)
            .await
            .unwrap();
        let order = fx
            .orders
            .add_item(fx.restaurant, order.id, dish.id, sub)
            .await
            .unwrap();

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.subtotal, dec("300"));
    }

    #[tokio::test]
    async fn same_item_in_different_sub_accounts_keeps_separate_lines() {
        let fx = fixture();
        let dish = fx.seed_dish("Quesadilla", "90").await;
        let order = fx.open_order().await;
        let first = order.sub_accounts[0].id;

        let order = fx
            .orders
            .add_sub_account(fx.restaurant, order.id)
            .await
            .unwrap();
        let second = order.sub_accounts[1].id;

        fx.orders
            .add_item(fx.restaurant, order.id, dish.id, first)
            .await
            .unwrap();
        let order = fx
            .orders
            .add_item(fx.restaurant, order.id, dish.id, second)
            .await
            .unwrap();

        assert_eq!(order.items.len(), 2);
        assert_eq!(order.subtotal, dec("180"));
    }

    #[tokio::test]
    async fn line_price_is_a_snapshot_of_the_menu_at_add_time() {
        let fx = fixture();
        let dish = fx.seed_dish("Pozole", "120").await;
        let order = fx.open_order().await;
        let sub = order.sub_accounts[0].id;

        fx.orders
            .add_item(fx.restaurant, order.id, dish.id, sub)
            .await
            .unwrap();

        // Reprice the dish after the line was added
        fx.menu
            .update_menu_item(
                fx.restaurant,
                dish.id,
                UpdateMenuItemInput {
                    name: None,
                    price: Some(dec("200")),
                    status: None,
                },
            )
            .await
            .unwrap();

        let order = fx.orders.get_order(fx.restaurant, order.id).await.unwrap();
        assert_eq!(*order.items[0].price, dec("120"));
        assert_eq!(order.subtotal, dec("120"));
    }

    #[tokio::test]
    async fn removing_decrements_then_drops_the_line() {
        let fx = fixture();
        let dish = fx.seed_dish("Enchiladas", "110").await;
        let order = fx.open_order().await;
        let sub = order.sub_accounts[0].id;

        for _ in 0..2 {
            fx.orders
                .add_item(fx.restaurant, order.id, dish.id, sub)
                .await
                .unwrap();
        }

        let order = fx
            .orders
            .remove_item(fx.restaurant, order.id, dish.id, sub)
            .await
            .unwrap();
        assert_eq!(order.items[0].quantity, 1);
        assert_eq!(order.subtotal, dec("110"));

        let order = fx
            .orders
            .remove_item(fx.restaurant, order.id, dish.id, sub)
            .await
            .unwrap();
        assert!(order.items.is_empty());
        assert_eq!(order.subtotal, Decimal::ZERO);
    }

    #[tokio::test]
    async fn subtotal_spans_all_sub_accounts() {
        let fx = fixture();
        let mains = fx.seed_dish("Carne Asada", "100").await;
        let drink = fx.seed_dish("Horchata", "50").await;

        let order = fx.open_order().await;
        let general = order.sub_accounts[0].id;
        let order = fx
            .orders
            .add_sub_account(fx.restaurant, order.id)
            .await
            .unwrap();
        let second = order.sub_accounts[1].id;

        for _ in 0..2 {
            fx.orders
                .add_item(fx.restaurant, order.id, mains.id, general)
                .await
                .unwrap();
        }
        let order = fx
            .orders
            .add_item(fx.restaurant, order.id, drink.id, second)
            .await
            .unwrap();
        assert_eq!(order.subtotal, dec("250"));

        let order = fx
            .orders
            .remove_item(fx.restaurant, order.id, mains.id, general)
            .await
            .unwrap();
        assert_eq!(order.subtotal, dec("150"));
    }

    #[tokio::test]
    async fn inactive_dish_cannot_be_added() {
        let fx = fixture();
        let dish = fx.seed_dish("Seasonal Special", "180").await;
        fx.menu
            .update_menu_item(
                fx.restaurant,
                dish.id,
                UpdateMenuItemInput {
                    name: None,
                    price: None,
                    status: Some(MenuItemStatus::Inactive),
                },
            )
            .await
            .unwrap();

        let order = fx.open_order().await;
        let sub = order.sub_accounts[0].id;
        let result = fx
            .orders
            .add_item(fx.restaurant, order.id, dish.id, sub)
            .await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn send_to_kitchen_requires_items_and_stamps_once() {
        let fx = fixture();
        let dish = fx.seed_dish("Sopa", "70").await;
        let order = fx.open_order().await;
        let sub = order.sub_accounts[0].id;

        // Empty dispatch rejected
        let result = fx.orders.send_to_kitchen(fx.restaurant, order.id).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));

        fx.orders
            .add_item(fx.restaurant, order.id, dish.id, sub)
            .await
            .unwrap();
        let sent = fx
            .orders
            .send_to_kitchen(fx.restaurant, order.id)
            .await
            .unwrap();
        assert_eq!(sent.status, OrderStatus::Preparing);
        let stamp = sent.sent_to_kitchen_at.unwrap();

        // Re-sending is a no-op that keeps the original stamp
        let resent = fx
            .orders
            .send_to_kitchen(fx.restaurant, order.id)
            .await
            .unwrap();
        assert_eq!(resent.sent_to_kitchen_at, Some(stamp));
    }

    #[tokio::test]
    async fn paid_orders_accept_no_further_mutation() {
        let fx = fixture();
        let dish = fx.seed_dish("Flan", "60").await;
        let order = fx.open_order().await;
        let sub = order.sub_accounts[0].id;

        fx.orders
            .add_item(fx.restaurant, order.id, dish.id, sub)
            .await
            .unwrap();
        let outcome = fx
            .orders
            .close_order(fx.restaurant, &fx.actor, order.id)
            .await
            .unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Paid);
        assert!(outcome.warnings.is_empty());

        let add = fx
            .orders
            .add_item(fx.restaurant, order.id, dish.id, sub)
            .await;
        assert!(matches!(add, Err(AppError::InvalidStateTransition(_))));

        let reclose = fx.orders.close_order(fx.restaurant, &fx.actor, order.id).await;
        assert!(matches!(reclose, Err(AppError::InvalidStateTransition(_))));

        let dispatch = fx.orders.send_to_kitchen(fx.restaurant, order.id).await;
        assert!(matches!(dispatch, Err(AppError::InvalidStateTransition(_))));
    }

    #[tokio::test]
    async fn empty_close_follows_policy() {
        // Default policy accepts a zero-item close
        let fx = fixture();
        let order = fx.open_order().await;
        let outcome = fx
            .orders
            .close_order(fx.restaurant, &fx.actor, order.id)
            .await
            .unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Paid);

        // Strict policy rejects it
        let strict = fixture_with(
            OrderPolicyConfig {
                allow_empty_close: false,
                auto_debit_inventory: false,
            },
            BillingConfig::default(),
        );
        let order = strict.open_order().await;
        let result = strict
            .orders
            .close_order(strict.restaurant, &strict.actor, order.id)
            .await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn cancel_hard_deletes_the_order() {
        let fx = fixture();
        let order = fx.open_order().await;

        fx.orders.cancel_order(fx.restaurant, order.id).await.unwrap();

        let read = fx.orders.get_order(fx.restaurant, order.id).await;
        assert!(matches!(read, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn paid_orders_cannot_be_cancelled() {
        let fx = fixture();
        let order = fx.open_order().await;
        fx.orders
            .close_order(fx.restaurant, &fx.actor, order.id)
            .await
            .unwrap();

        let result = fx.orders.cancel_order(fx.restaurant, order.id).await;
        assert!(matches!(result, Err(AppError::InvalidStateTransition(_))));

        // Still there
        assert!(fx.orders.get_order(fx.restaurant, order.id).await.is_ok());
    }

    #[tokio::test]
    async fn list_orders_filters_by_status_newest_first() {
        let fx = fixture();
        let first = fx.open_order().await;
        let second = fx.open_order().await;
        fx.orders
            .close_order(fx.restaurant, &fx.actor, first.id)
            .await
            .unwrap();

        let open = fx
            .orders
            .list_orders(fx.restaurant, Some(OrderStatus::Open))
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, second.id);

        let all = fx.orders.list_orders(fx.restaurant, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].created_at >= all[1].created_at);
    }

    #[tokio::test]
    async fn totals_apply_the_configured_tax_at_presentation() {
        let fx = fixture();
        let dish = fx.seed_dish("Combo", "100").await;
        let order = fx.open_order().await;
        let sub = order.sub_accounts[0].id;
        let order = fx
            .orders
            .add_item(fx.restaurant, order.id, dish.id, sub)
            .await
            .unwrap();

        let totals = fx.orders.totals(&order);
        assert_eq!(totals.subtotal, dec("100"));
        assert_eq!(totals.tax, dec("16.00"));
        assert_eq!(totals.total, dec("116.00"));

        // The stored subtotal stays tax-exclusive
        let stored = fx.orders.get_order(fx.restaurant, order.id).await.unwrap();
        assert_eq!(stored.subtotal, dec("100"));
    }
}

// ============================================================================
// Sub-Account Tests
// ============================================================================

mod sub_account_tests {
    use super::*;

    #[tokio::test]
    async fn sub_accounts_get_sequential_names() {
        let fx = fixture();
        let order = fx.open_order().await;
        let order = fx
            .orders
            .add_sub_account(fx.restaurant, order.id)
            .await
            .unwrap();

        assert_eq!(order.sub_accounts.len(), 2);
        assert_eq!(order.sub_accounts[1].name, "Account 2");
    }

    #[tokio::test]
    async fn non_empty_sub_account_cannot_be_removed() {
        let fx = fixture();
        let dish = fx.seed_dish("Torta", "85").await;
        let order = fx.open_order().await;
        let order = fx
            .orders
            .add_sub_account(fx.restaurant, order.id)
            .await
            .unwrap();
        let extra = order.sub_accounts[1].id;

        fx.orders
            .add_item(fx.restaurant, order.id, dish.id, extra)
            .await
            .unwrap();

        let result = fx
            .orders
            .remove_sub_account(fx.restaurant, order.id, extra)
            .await;
        match result {
            Err(AppError::SubAccountNotEmpty { item_count, .. }) => assert_eq!(item_count, 1),
            other => panic!("expected SubAccountNotEmpty, got {:?}", other.map(|o| o.id)),
        }

        // Empty it, then removal succeeds
        fx.orders
            .remove_item(fx.restaurant, order.id, dish.id, extra)
            .await
            .unwrap();
        let order = fx
            .orders
            .remove_sub_account(fx.restaurant, order.id, extra)
            .await
            .unwrap();
        assert_eq!(order.sub_accounts.len(), 1);
    }

    #[tokio::test]
    async fn last_sub_account_cannot_be_removed() {
        let fx = fixture();
        let order = fx.open_order().await;
        let only = order.sub_accounts[0].id;

        let result = fx
            .orders
            .remove_sub_account(fx.restaurant, order.id, only)
            .await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }
}

// ============================================================================
// Kitchen Signal Tests
// ============================================================================

mod signal_tests {
    use super::*;

    #[tokio::test]
    async fn removal_from_a_preparing_order_signals_the_kitchen() {
        let fx = fixture();
        let dish = fx.seed_dish("Chilaquiles", "95").await;
        let order = fx.open_order().await;
        let sub = order.sub_accounts[0].id;

        fx.orders
            .add_item(fx.restaurant, order.id, dish.id, sub)
            .await
            .unwrap();
        fx.orders
            .send_to_kitchen(fx.restaurant, order.id)
            .await
            .unwrap();

        let mut rx = fx.signals.subscribe();
        fx.orders
            .remove_item(fx.restaurant, order.id, dish.id, sub)
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            KitchenEvent::ItemRemoved {
                order_id,
                item_name,
                quantity,
            } => {
                assert_eq!(order_id, order.id);
                assert_eq!(item_name, "Chilaquiles");
                assert_eq!(quantity, 1);
            }
            other => panic!("expected ItemRemoved, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn removal_before_dispatch_stays_silent() {
        let fx = fixture();
        let dish = fx.seed_dish("Agua Fresca", "35").await;
        let order = fx.open_order().await;
        let sub = order.sub_accounts[0].id;

        fx.orders
            .add_item(fx.restaurant, order.id, dish.id, sub)
            .await
            .unwrap();

        let mut rx = fx.signals.subscribe();
        fx.orders
            .remove_item(fx.restaurant, order.id, dish.id, sub)
            .await
            .unwrap();

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn cancellation_signals_the_kitchen() {
        let fx = fixture();
        let order = fx.open_order().await;

        let mut rx = fx.signals.subscribe();
        fx.orders.cancel_order(fx.restaurant, order.id).await.unwrap();

        assert!(matches!(
            rx.try_recv().unwrap(),
            KitchenEvent::OrderCancelled { order_id } if order_id == order.id
        ));
    }
}

// ============================================================================
// Auto-Debit Tests
// ============================================================================

mod auto_debit_tests {
    use super::*;

    /// Dish backed by a recipe consuming 0.2 of one ingredient per unit.
    async fn seed_recipe_dish(fx: &Fixture, stock: &str) -> (MenuItem, Uuid) {
        let category = fx
            .menu
            .create_category(fx.restaurant, "Mains".to_string())
            .await
            .unwrap();
        let ingredient = fx
            .inventory
            .create_item(
                fx.restaurant,
                CreateItemInput {
                    name: "Masa".to_string(),
                    category: "Dry Goods".to_string(),
                    unit: UnitOfMeasure::Kilogram,
                    initial_stock: dec(stock),
                    minimum_stock: dec("1"),
                    average_cost: dec("25"),
                },
            )
            .await
            .unwrap();
        let recipe = fx
            .recipes
            .create_recipe(
                fx.restaurant,
                SaveRecipeInput {
                    name: "Tamal".to_string(),
                    ingredients: vec![IngredientInput {
                        item_id: ingredient.id,
                        quantity: dec("0.2"),
                    }],
                },
            )
            .await
            .unwrap();
        let dish = fx
            .menu
            .create_menu_item(
                fx.restaurant,
                CreateMenuItemInput {
                    name: "Tamal".to_string(),
                    price: dec("45"),
                    cost_source: CostSource::Recipe { recipe_id: recipe.id },
                    category_id: category.id,
                },
            )
            .await
            .unwrap();
        (dish, ingredient.id)
    }

    fn auto_debit_fixture() -> Fixture {
        fixture_with(
            OrderPolicyConfig {
                allow_empty_close: true,
                auto_debit_inventory: true,
            },
            BillingConfig::default(),
        )
    }

    #[tokio::test]
    async fn closing_debits_recipe_ingredients() {
        let fx = auto_debit_fixture();
        let (dish, ingredient_id) = seed_recipe_dish(&fx, "10").await;
        let order = fx.open_order().await;
        let sub = order.sub_accounts[0].id;

        for _ in 0..2 {
            fx.orders
                .add_item(fx.restaurant, order.id, dish.id, sub)
                .await
                .unwrap();
        }

        let outcome = fx
            .orders
            .close_order(fx.restaurant, &fx.actor, order.id)
            .await
            .unwrap();
        assert!(outcome.warnings.is_empty());

        // 2 sold x 0.2 per unit
        let ingredient = fx
            .inventory
            .get_item(fx.restaurant, ingredient_id)
            .await
            .unwrap();
        assert_eq!(ingredient.current_stock, dec("9.6"));
    }

    #[tokio::test]
    async fn debit_failure_degrades_to_a_warning() {
        let fx = auto_debit_fixture();
        let (dish, ingredient_id) = seed_recipe_dish(&fx, "0.1").await;
        let order = fx.open_order().await;
        let sub = order.sub_accounts[0].id;

        fx.orders
            .add_item(fx.restaurant, order.id, dish.id, sub)
            .await
            .unwrap();

        let outcome = fx
            .orders
            .close_order(fx.restaurant, &fx.actor, order.id)
            .await
            .unwrap();

        // The sale completed; the shortage is a warning, not an error
        assert_eq!(outcome.order.status, OrderStatus::Paid);
        assert_eq!(outcome.warnings.len(), 1);

        let ingredient = fx
            .inventory
            .get_item(fx.restaurant, ingredient_id)
            .await
            .unwrap();
        assert_eq!(ingredient.current_stock, dec("0.1"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod property_tests {
    use super::*;
    use shared::types::Snapshot;

    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=100000i64).prop_map(|n| Decimal::new(n, 2))
    }

    fn line_strategy() -> impl Strategy<Value = OrderItem> {
        (price_strategy(), 1u32..=20).prop_map(|(price, quantity)| OrderItem {
            menu_item_id: Uuid::new_v4(),
            name: Snapshot::capture("Dish".to_string()),
            price: Snapshot::capture(price),
            quantity,
            sub_account_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The subtotal is always the sum of price x quantity over all
        /// lines, regardless of sub-account partitioning.
        #[test]
        fn prop_subtotal_is_sum_of_line_totals(
            lines in prop::collection::vec(line_strategy(), 0..15)
        ) {
            let subtotal = Order::compute_subtotal(&lines);
            let expected: Decimal = lines
                .iter()
                .map(|l| *l.price * Decimal::from(l.quantity))
                .sum();
            prop_assert_eq!(subtotal, expected);
        }

        /// A single line's total scales linearly with quantity.
        #[test]
        fn prop_line_total_scales_with_quantity(
            price in price_strategy(),
            quantity in 1u32..=100
        ) {
            let line = OrderItem {
                menu_item_id: Uuid::new_v4(),
                name: Snapshot::capture("Dish".to_string()),
                price: Snapshot::capture(price),
                quantity,
                sub_account_id: Uuid::new_v4(),
                category_id: Uuid::new_v4(),
            };
            prop_assert_eq!(line.line_total(), price * Decimal::from(quantity));
        }
    }
}
