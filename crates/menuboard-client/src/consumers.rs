//! Reference consumers of the bus topics.
//!
//! Neither one touches the connection: they only react to published events
//! and keep what they need. Both survive reconnects untouched.

use crate::bus::{BusEvent, EventBus, Subscriber, SubscriberError, Topic};
use menuboard_core::{Category, Dish, Ingredient, Locale};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Category filter value that matches every dish.
pub const ALL_CATEGORIES: &str = "all";

/// Ingredient id to localized name, refreshed from `ingredients:updated`.
#[derive(Debug, Default)]
pub struct IngredientCache {
    entries: RwLock<HashMap<String, Ingredient>>,
}

impl IngredientCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Subscribe to catalog updates. The bus holds the cache weakly.
    pub fn attach(self: &Arc<Self>, bus: &EventBus) {
        bus.subscribe(Topic::IngredientsUpdated, self);
    }

    /// Localized name of ingredient `id`.
    pub fn lookup(&self, id: &str, locale: &Locale) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(id)
            .and_then(|ingredient| ingredient.name(locale))
            .map(str::to_string)
    }

    /// Localized name, or `id` itself when the catalog does not know it.
    pub fn translate(&self, id: &str, locale: &Locale) -> String {
        self.lookup(id, locale).unwrap_or_else(|| id.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the cache with `catalog`. Entries without an id are skipped.
    pub fn replace(&self, catalog: &[Ingredient]) -> usize {
        let fresh: HashMap<String, Ingredient> = catalog
            .iter()
            .filter_map(|ingredient| Some((ingredient.id()?, ingredient.clone())))
            .collect();
        let skipped = catalog.len() - fresh.len();
        if skipped > 0 {
            tracing::debug!(skipped, "ingredients without an id ignored");
        }

        let count = fresh.len();
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        count
    }
}

impl Subscriber for IngredientCache {
    fn on_event(&self, event: &BusEvent) -> Result<(), SubscriberError> {
        if let BusEvent::IngredientsUpdated(catalog) = event {
            self.replace(catalog);
        }
        Ok(())
    }
}

/// Latest menu snapshot, refreshed from `menu:updated`.
#[derive(Debug, Default)]
pub struct MenuStore {
    dishes: RwLock<Option<Arc<Vec<Dish>>>>,
}

impl MenuStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn attach(self: &Arc<Self>, bus: &EventBus) {
        bus.subscribe(Topic::MenuUpdated, self);
    }

    /// True until the first snapshot arrives.
    pub fn is_loading(&self) -> bool {
        self.dishes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    pub fn dishes(&self) -> Arc<Vec<Dish>> {
        self.dishes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_default()
    }

    /// Distinct categories, in the order they first appear on the menu.
    pub fn categories(&self) -> Vec<Category> {
        let mut seen = Vec::<Category>::new();
        for category in self.dishes().iter().filter_map(Dish::category) {
            if !seen.iter().any(|c| c.id == category.id) {
                seen.push(category);
            }
        }
        seen
    }

    /// Dishes in `category`; [`ALL_CATEGORIES`] selects every dish.
    pub fn filter(&self, category: &str) -> Vec<Dish> {
        let dishes = self.dishes();
        if category == ALL_CATEGORIES {
            return dishes.to_vec();
        }
        dishes
            .iter()
            .filter(|dish| dish.category().is_some_and(|c| c.id == category))
            .cloned()
            .collect()
    }
}

impl Subscriber for MenuStore {
    fn on_event(&self, event: &BusEvent) -> Result<(), SubscriberError> {
        if let BusEvent::MenuUpdated(dishes) = event {
            *self.dishes.write().unwrap_or_else(PoisonError::into_inner) = Some(dishes.clone());
        }
        Ok(())
    }
}
