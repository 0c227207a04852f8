//! Profitability and consumption aggregation
//!
//! Two modes. The historical range report joins completed orders against
//! menu, recipe, and inventory lookups to produce per-dish profitability and
//! per-ingredient consumption tables. The same-day rollup is a long-lived
//! task that recomputes sales totals from the full orders snapshot on every
//! change notification — never incrementally from deltas, so out-of-order
//! deliveries cannot cause drift.
//!
//! Missing menu-item or recipe references degrade the affected rows to cost
//! zero instead of failing the report; a failed bulk load of the lookup
//! tables aborts it entirely (no partial reports).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use shared::models::{CostSource, MenuItem, Order, OrderStatus, Recipe};

use crate::error::{AppError, AppResult};
use crate::store::LedgerStore;

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    store: Arc<LedgerStore>,
}

/// Inclusive-from, exclusive-to date range for historical reports
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReportRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Per-dish profitability over a range
#[derive(Debug, Clone, Serialize)]
pub struct DishProfitability {
    pub menu_item_id: Uuid,
    pub name: String,
    pub category: String,
    pub quantity_sold: u64,
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    pub net_profit: Decimal,
    /// Percentage; 0 when revenue is 0
    pub profit_margin: Decimal,
}

/// Per-ingredient consumption over a range
#[derive(Debug, Clone, Serialize)]
pub struct IngredientConsumption {
    pub item_id: Uuid,
    pub name: String,
    pub quantity_consumed: Decimal,
    /// Valued at the current average cost, not historical
    pub total_cost: Decimal,
}

/// Same-day real-time rollup
#[derive(Debug, Clone, Default, Serialize)]
pub struct DailyRollup {
    /// Completed-sale subtotal since midnight
    pub total_sales: Decimal,
    /// Orders still open or preparing
    pub active_orders: u64,
    pub total_orders: u64,
    pub sales_by_category: Vec<CategorySales>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySales {
    pub category_id: Uuid,
    pub category_name: String,
    pub total: Decimal,
}

/// Sort direction for report presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Sortable columns of the profitability table
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitabilityColumn {
    Name,
    Category,
    QuantitySold,
    TotalRevenue,
    TotalCost,
    NetProfit,
    ProfitMargin,
}

/// Sortable columns of the consumption table
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionColumn {
    Name,
    QuantityConsumed,
    TotalCost,
}

impl ReportingService {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Per-dish profitability over the range. Costs come from the cached
    /// recipe snapshot so they stay consistent with when the sale occurred;
    /// dishes without a recipe contribute zero cost.
    pub async fn profitability_report(
        &self,
        restaurant_id: Uuid,
        range: ReportRange,
    ) -> AppResult<Vec<DishProfitability>> {
        let (menu_items, recipes, categories) = self.load_lookups(restaurant_id).await?;
        let orders = self.completed_orders(restaurant_id, range).await;

        let mut by_dish: HashMap<Uuid, DishProfitability> = HashMap::new();
        for order in &orders {
            for item in &order.items {
                let sold = u64::from(item.quantity);
                let revenue = item.line_total();
                let unit_cost = menu_items
                    .get(&item.menu_item_id)
                    .and_then(|m| match m.cost_source {
                        CostSource::Recipe { recipe_id } => {
                            recipes.get(&recipe_id).map(|r| *r.cost)
                        }
                        // Direct-inventory dishes carry no recipe cost here;
                        // a known undercount
                        CostSource::Inventory { .. } => None,
                    })
                    .unwrap_or(Decimal::ZERO);

                let entry = by_dish.entry(item.menu_item_id).or_insert_with(|| {
                    let name = menu_items
                        .get(&item.menu_item_id)
                        .map(|m| m.name.clone())
                        .unwrap_or_else(|| item.name.cloned());
                    let category = categories
                        .get(&item.category_id)
                        .cloned()
                        .unwrap_or_default();
                    DishProfitability {
                        menu_item_id: item.menu_item_id,
                        name,
                        category,
                        quantity_sold: 0,
                        total_revenue: Decimal::ZERO,
                        total_cost: Decimal::ZERO,
                        net_profit: Decimal::ZERO,
                        profit_margin: Decimal::ZERO,
                    }
                });
                entry.quantity_sold += sold;
                entry.total_revenue += revenue;
                entry.total_cost += unit_cost * Decimal::from(sold);
            }
        }

        let mut rows: Vec<DishProfitability> = by_dish.into_values().collect();
        for row in &mut rows {
            row.net_profit = row.total_revenue - row.total_cost;
            row.profit_margin = if row.total_revenue.is_zero() {
                Decimal::ZERO
            } else {
                row.net_profit / row.total_revenue * Decimal::from(100)
            };
        }
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    /// Per-ingredient consumption over the range, valued at the current
    /// average cost — an intentional approximation.
    pub async fn consumption_report(
        &self,
        restaurant_id: Uuid,
        range: ReportRange,
    ) -> AppResult<Vec<IngredientConsumption>> {
        let (menu_items, recipes, _) = self.load_lookups(restaurant_id).await?;
        let orders = self.completed_orders(restaurant_id, range).await;

        let mut consumed: HashMap<Uuid, (String, Decimal)> = HashMap::new();
        for order in &orders {
            for item in &order.items {
                let recipe = menu_items.get(&item.menu_item_id).and_then(|m| {
                    match m.cost_source {
                        CostSource::Recipe { recipe_id } => recipes.get(&recipe_id),
                        CostSource::Inventory { .. } => None,
                    }
                });
                let Some(recipe) = recipe else { continue };
                for line in &recipe.ingredients {
                    let entry = consumed
                        .entry(line.item_id)
                        .or_insert_with(|| (line.item_name.cloned(), Decimal::ZERO));
                    entry.1 += line.quantity * Decimal::from(item.quantity);
                }
            }
        }

        let mut rows = Vec::with_capacity(consumed.len());
        for (item_id, (fallback_name, quantity)) in consumed {
            let item = self.store.inventory_items.find(item_id).await;
            let (name, average_cost) = match item {
                Some(item) => (item.name, item.average_cost),
                None => (fallback_name, Decimal::ZERO),
            };
            rows.push(IngredientConsumption {
                item_id,
                name,
                quantity_consumed: quantity,
                total_cost: quantity * average_cost,
            });
        }
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    /// Export a report table as CSV.
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }

    /// Bulk-load the lookup tables. Any failure here aborts the report.
    async fn load_lookups(
        &self,
        restaurant_id: Uuid,
    ) -> AppResult<(
        HashMap<Uuid, MenuItem>,
        HashMap<Uuid, Recipe>,
        HashMap<Uuid, String>,
    )> {
        let menu_items = self
            .store
            .menu_items
            .list(|m| m.restaurant_id == restaurant_id)
            .await
            .into_iter()
            .map(|m| (m.id, m))
            .collect();
        let recipes = self
            .store
            .recipes
            .list(|r| r.restaurant_id == restaurant_id)
            .await
            .into_iter()
            .map(|r| (r.id, r))
            .collect();
        let categories = self
            .store
            .categories
            .list(|c| c.restaurant_id == restaurant_id)
            .await
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        Ok((menu_items, recipes, categories))
    }

    /// Orders created in the range whose sale completed. Cancelled orders
    /// are already gone (hard delete); open and preparing ones are excluded
    /// here, as a filter on top of the range query.
    async fn completed_orders(&self, restaurant_id: Uuid, range: ReportRange) -> Vec<Order> {
        self.store
            .orders
            .list(|o| {
                o.restaurant_id == restaurant_id
                    && o.created_at >= range.from
                    && o.created_at < range.to
            })
            .await
            .into_iter()
            .filter(|o| o.status == OrderStatus::Paid)
            .collect()
    }
}

/// Sorted, filtered copy of the profitability table for presentation.
///
/// The accumulated rows are never mutated: filtering and sorting work on a
/// copy, the sort is stable, and repeated clicks on the same column toggle
/// the direction at the call site via [`SortDirection::toggle`].
pub fn present_profitability(
    rows: &[DishProfitability],
    column: ProfitabilityColumn,
    direction: SortDirection,
    name_filter: Option<&str>,
) -> Vec<DishProfitability> {
    let mut presented: Vec<DishProfitability> = match name_filter {
        Some(needle) => {
            let needle = needle.to_lowercase();
            rows.iter()
                .filter(|r| {
                    r.name.to_lowercase().contains(&needle)
                        || r.category.to_lowercase().contains(&needle)
                })
                .cloned()
                .collect()
        }
        None => rows.to_vec(),
    };
    presented.sort_by(|a, b| {
        let ordering = match column {
            ProfitabilityColumn::Name => a.name.cmp(&b.name),
            ProfitabilityColumn::Category => a.category.cmp(&b.category),
            ProfitabilityColumn::QuantitySold => a.quantity_sold.cmp(&b.quantity_sold),
            ProfitabilityColumn::TotalRevenue => a.total_revenue.cmp(&b.total_revenue),
            ProfitabilityColumn::TotalCost => a.total_cost.cmp(&b.total_cost),
            ProfitabilityColumn::NetProfit => a.net_profit.cmp(&b.net_profit),
            ProfitabilityColumn::ProfitMargin => a.profit_margin.cmp(&b.profit_margin),
        };
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
    presented
}

/// Sorted, filtered copy of the consumption table for presentation.
pub fn present_consumption(
    rows: &[IngredientConsumption],
    column: ConsumptionColumn,
    direction: SortDirection,
    name_filter: Option<&str>,
) -> Vec<IngredientConsumption> {
    let mut presented: Vec<IngredientConsumption> = match name_filter {
        Some(needle) => {
            let needle = needle.to_lowercase();
            rows.iter()
                .filter(|r| r.name.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        }
        None => rows.to_vec(),
    };
    presented.sort_by(|a, b| {
        let ordering = match column {
            ConsumptionColumn::Name => a.name.cmp(&b.name),
            ConsumptionColumn::QuantityConsumed => a.quantity_consumed.cmp(&b.quantity_consumed),
            ConsumptionColumn::TotalCost => a.total_cost.cmp(&b.total_cost),
        };
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
    presented
}

/// Compute the same-day rollup from a full orders snapshot.
///
/// Pure so the rollup task and tests share it. `category_names` is a cache
/// filled by the caller to avoid re-resolving category ids on every
/// notification.
pub fn compute_rollup(
    orders: &[Order],
    restaurant_id: Uuid,
    since: DateTime<Utc>,
    category_names: &HashMap<Uuid, String>,
) -> DailyRollup {
    let todays: Vec<&Order> = orders
        .iter()
        .filter(|o| o.restaurant_id == restaurant_id && o.created_at >= since)
        .collect();

    let mut total_sales = Decimal::ZERO;
    let mut active_orders = 0u64;
    let mut by_category: HashMap<Uuid, Decimal> = HashMap::new();

    for order in &todays {
        match order.status {
            OrderStatus::Paid => {
                total_sales += order.subtotal;
                for item in &order.items {
                    *by_category.entry(item.category_id).or_default() += item.line_total();
                }
            }
            OrderStatus::Open | OrderStatus::Preparing => active_orders += 1,
        }
    }

    let mut sales_by_category: Vec<CategorySales> = by_category
        .into_iter()
        .map(|(category_id, total)| CategorySales {
            category_id,
            category_name: category_names.get(&category_id).cloned().unwrap_or_default(),
            total,
        })
        .collect();
    sales_by_category.sort_by(|a, b| b.total.cmp(&a.total));

    DailyRollup {
        total_sales,
        active_orders,
        total_orders: todays.len() as u64,
        sales_by_category,
    }
}

/// Lazily spawned rollup tasks, one per restaurant tenant.
///
/// The first request for a restaurant starts its task; later requests reuse
/// the existing watch receiver. Tasks live for the rest of the process.
#[derive(Clone)]
pub struct RollupRegistry {
    store: Arc<LedgerStore>,
    receivers: Arc<std::sync::Mutex<HashMap<Uuid, watch::Receiver<DailyRollup>>>>,
}

impl RollupRegistry {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self {
            store,
            receivers: Arc::new(std::sync::Mutex::new(HashMap::new())),
        }
    }

    /// The rollup feed for a restaurant, spawning its task on first use.
    pub fn receiver(&self, restaurant_id: Uuid) -> watch::Receiver<DailyRollup> {
        let mut receivers = self
            .receivers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        receivers
            .entry(restaurant_id)
            .or_insert_with(|| {
                let (rx, _handle) = spawn_daily_rollup(self.store.clone(), restaurant_id);
                rx
            })
            .clone()
    }
}

/// Spawn the long-lived rollup task for one restaurant.
///
/// The task holds a subscription to the orders collection and republished
/// rollups on a watch channel; it recomputes from the delivered snapshot
/// every time, so duplicated or reordered notifications converge to the
/// same result. It ends when the store shuts down.
pub fn spawn_daily_rollup(
    store: Arc<LedgerStore>,
    restaurant_id: Uuid,
) -> (watch::Receiver<DailyRollup>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(DailyRollup::default());
    let handle = tokio::spawn(async move {
        let mut subscription = store.orders.subscribe();
        let mut category_names: HashMap<Uuid, String> = HashMap::new();

        loop {
            let snapshot = subscription.current();
            let midnight = Utc::now()
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .expect("midnight is a valid time")
                .and_utc();

            // Refresh the category-name cache for ids we have not seen
            for order in snapshot.iter().filter(|o| o.restaurant_id == restaurant_id) {
                for item in &order.items {
                    if !category_names.contains_key(&item.category_id) {
                        if let Some(category) = store.categories.find(item.category_id).await {
                            category_names.insert(category.id, category.name);
                        }
                    }
                }
            }

            let rollup = compute_rollup(&snapshot, restaurant_id, midnight, &category_names);
            tx.send_replace(rollup);

            if subscription.changed().await.is_none() {
                break;
            }
        }
    });
    (rx, handle)
}
