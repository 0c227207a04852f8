//! Recipe costing and menu administration
//!
//! A recipe saved here snapshots each ingredient's name, unit, and current
//! unit cost from inventory, and caches the summed cost on the document.
//! That cached cost is intentionally stale history: profitability reports
//! read it so costs stay consistent with when the sale occurred, while
//! `current_cost` recomputes from live inventory for anyone who needs the
//! price of cooking the dish today.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use shared::models::{
    Category, CostSource, IngredientLine, MenuItem, MenuItemStatus, Recipe,
};
use shared::types::Snapshot;
use shared::validation::validate_positive_quantity;

use crate::error::{AppError, AppResult};
use crate::store::LedgerStore;

/// Recipe service
#[derive(Clone)]
pub struct RecipeService {
    store: Arc<LedgerStore>,
}

/// One ingredient reference in a save request
#[derive(Debug, Deserialize)]
pub struct IngredientInput {
    pub item_id: Uuid,
    pub quantity: Decimal,
}

/// Input for creating or updating a recipe
#[derive(Debug, Deserialize)]
pub struct SaveRecipeInput {
    pub name: String,
    pub ingredients: Vec<IngredientInput>,
}

impl RecipeService {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    /// Create a recipe, snapshotting ingredient costs at this moment.
    pub async fn create_recipe(
        &self,
        restaurant_id: Uuid,
        input: SaveRecipeInput,
    ) -> AppResult<Recipe> {
        let ingredients = self.resolve_ingredients(restaurant_id, &input.ingredients).await?;
        let cost = Recipe::compute_cost(&ingredients);
        let now = Utc::now();
        let recipe = Recipe {
            id: Uuid::new_v4(),
            restaurant_id,
            name: input.name,
            ingredients,
            cost: Snapshot::capture(cost),
            created_at: now,
            updated_at: now,
        };
        self.store.recipes.insert(recipe).await
    }

    /// Update a recipe, re-snapshotting costs as of now. Previously saved
    /// documents elsewhere are untouched.
    pub async fn update_recipe(
        &self,
        restaurant_id: Uuid,
        recipe_id: Uuid,
        input: SaveRecipeInput,
    ) -> AppResult<Recipe> {
        let ingredients = self.resolve_ingredients(restaurant_id, &input.ingredients).await?;
        let cost = Recipe::compute_cost(&ingredients);
        let (recipe, _) = self
            .store
            .recipes
            .update(recipe_id, |recipe| {
                if recipe.restaurant_id != restaurant_id {
                    return Err(AppError::NotFound("Recipe".to_string()));
                }
                recipe.name = input.name.clone();
                recipe.ingredients = ingredients.clone();
                recipe.cost = Snapshot::capture(cost);
                recipe.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        Ok(recipe)
    }

    pub async fn get_recipe(&self, restaurant_id: Uuid, recipe_id: Uuid) -> AppResult<Recipe> {
        let recipe = self.store.recipes.get(recipe_id).await?;
        if recipe.restaurant_id != restaurant_id {
            return Err(AppError::NotFound("Recipe".to_string()));
        }
        Ok(recipe)
    }

    pub async fn list_recipes(&self, restaurant_id: Uuid) -> AppResult<Vec<Recipe>> {
        let mut recipes = self
            .store
            .recipes
            .list(|r| r.restaurant_id == restaurant_id)
            .await;
        recipes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(recipes)
    }

    /// What the recipe costs at today's average ingredient costs, ignoring
    /// the cached snapshot. Missing ingredients count as zero.
    pub async fn current_cost(&self, recipe: &Recipe) -> Decimal {
        let mut total = Decimal::ZERO;
        for line in &recipe.ingredients {
            if let Some(item) = self.store.inventory_items.find(line.item_id).await {
                total += line.quantity * item.average_cost;
            }
        }
        total
    }

    /// Resolve ingredient references against live inventory, capturing the
    /// per-line snapshots.
    async fn resolve_ingredients(
        &self,
        restaurant_id: Uuid,
        inputs: &[IngredientInput],
    ) -> AppResult<Vec<IngredientLine>> {
        let mut lines = Vec::with_capacity(inputs.len());
        for input in inputs {
            validate_positive_quantity(input.quantity).map_err(|msg| AppError::Validation {
                field: "quantity".to_string(),
                message: msg.to_string(),
                message_es: "La cantidad debe ser positiva".to_string(),
            })?;
            let item = self.store.inventory_items.get(input.item_id).await?;
            if item.restaurant_id != restaurant_id {
                return Err(AppError::NotFound("Inventory item".to_string()));
            }
            lines.push(IngredientLine {
                item_id: item.id,
                item_name: Snapshot::capture(item.name),
                quantity: input.quantity,
                unit: Snapshot::capture(item.unit),
                unit_cost: Snapshot::capture(item.average_cost),
            });
        }
        Ok(lines)
    }
}

/// Menu administration: the minimum surface the aggregator joins against
#[derive(Clone)]
pub struct MenuService {
    store: Arc<LedgerStore>,
}

/// Input for creating a menu item
#[derive(Debug, Deserialize)]
pub struct CreateMenuItemInput {
    pub name: String,
    pub price: Decimal,
    pub cost_source: CostSource,
    pub category_id: Uuid,
}

/// Input for updating a menu item
#[derive(Debug, Deserialize)]
pub struct UpdateMenuItemInput {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub status: Option<MenuItemStatus>,
}

impl MenuService {
    pub fn new(store: Arc<LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn create_category(
        &self,
        restaurant_id: Uuid,
        name: String,
    ) -> AppResult<Category> {
        self.store
            .categories
            .insert(Category::new(restaurant_id, name))
            .await
    }

    pub async fn list_categories(&self, restaurant_id: Uuid) -> AppResult<Vec<Category>> {
        let mut categories = self
            .store
            .categories
            .list(|c| c.restaurant_id == restaurant_id)
            .await;
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    /// Create a menu item; its cost source must exist.
    pub async fn create_menu_item(
        &self,
        restaurant_id: Uuid,
        input: CreateMenuItemInput,
    ) -> AppResult<MenuItem> {
        let category = self.store.categories.get(input.category_id).await?;
        if category.restaurant_id != restaurant_id {
            return Err(AppError::NotFound("Category".to_string()));
        }
        match input.cost_source {
            CostSource::Recipe { recipe_id } => {
                self.store.recipes.get(recipe_id).await?;
            }
            CostSource::Inventory { item_id } => {
                self.store.inventory_items.get(item_id).await?;
            }
        }
        let item = MenuItem::new(
            restaurant_id,
            input.name,
            input.price,
            input.cost_source,
            input.category_id,
        )
        .map_err(|msg| AppError::ValidationError(msg.to_string()))?;
        self.store.menu_items.insert(item).await
    }

    pub async fn update_menu_item(
        &self,
        restaurant_id: Uuid,
        menu_item_id: Uuid,
        input: UpdateMenuItemInput,
    ) -> AppResult<MenuItem> {
        if let Some(price) = input.price {
            if price < Decimal::ZERO {
                return Err(AppError::ValidationError(
                    "Price cannot be negative".to_string(),
                ));
            }
        }
        let (item, _) = self
            .store
            .menu_items
            .update(menu_item_id, |item| {
                if item.restaurant_id != restaurant_id {
                    return Err(AppError::NotFound("Menu item".to_string()));
                }
                if let Some(name) = &input.name {
                    item.name = name.clone();
                }
                if let Some(price) = input.price {
                    item.price = price;
                }
                if let Some(status) = input.status {
                    item.status = status;
                }
                item.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        Ok(item)
    }

    pub async fn get_menu_item(
        &self,
        restaurant_id: Uuid,
        menu_item_id: Uuid,
    ) -> AppResult<MenuItem> {
        let item = self.store.menu_items.get(menu_item_id).await?;
        if item.restaurant_id != restaurant_id {
            return Err(AppError::NotFound("Menu item".to_string()));
        }
        Ok(item)
    }

    pub async fn list_menu_items(&self, restaurant_id: Uuid) -> AppResult<Vec<MenuItem>> {
        let mut items = self
            .store
            .menu_items
            .list(|m| m.restaurant_id == restaurant_id)
            .await;
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }
}
