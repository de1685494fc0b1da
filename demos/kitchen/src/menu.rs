//! Menu data and the layouts it can be pushed in.

use anyhow::Context;
use serde_json::{Value, json};
use std::path::Path;

/// Inbound layouts understood by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MenuShape {
    /// `{"type": "menuUpdate", "menu": [...]}`
    TaggedMenu,
    /// `{"menu": [...]}`
    BareMenu,
    /// `{"type": "menuUpdate", "payload": [...]}`
    TaggedPayload,
}

impl MenuShape {
    pub fn encode(self, dishes: &[Value]) -> Value {
        match self {
            MenuShape::TaggedMenu => json!({"type": "menuUpdate", "menu": dishes}),
            MenuShape::BareMenu => json!({"menu": dishes}),
            MenuShape::TaggedPayload => json!({"type": "menuUpdate", "payload": dishes}),
        }
    }
}

pub fn load(path: &Path) -> anyhow::Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading menu from {}", path.display()))?;
    let dishes: Vec<Value> = serde_json::from_str(&text)
        .with_context(|| format!("{} must hold a JSON list of dishes", path.display()))?;
    Ok(dishes)
}

pub fn sample() -> Vec<Value> {
    vec![
        json!({
            "id": 1,
            "name": {"fr": "Soupe tom yum", "en": "Tom yum soup", "th": "ต้มยำ"},
            "price": 120,
            "quantity": {"amount": 8},
            "ingredients": ["shrimp", "lemongrass", "galangal"],
            "category": {"id": "soups", "name": {"fr": "Soupes", "en": "Soups"}}
        }),
        json!({
            "id": 2,
            "name": {"fr": "Pad thaï", "en": "Pad thai"},
            "price": 90,
            "quantity": {"amount": 3},
            "ingredients": ["noodles", "egg", "peanut"],
            "supplements": [
                {"name": {"fr": "Crevettes", "en": "Shrimp"}, "price": 40},
                {"name": {"fr": "Poulet", "en": "Chicken"}}
            ],
            "supplementPrice": 30,
            "category": {"id": "mains", "name": {"fr": "Plats", "en": "Mains"}}
        }),
        json!({
            "id": 3,
            "name": {"fr": "Riz gluant à la mangue", "en": "Mango sticky rice"},
            "price": 75.5,
            "quantity": {"infinite": true},
            "ingredients": ["mango", "sticky rice", "coconut milk"],
            "category": {"id": "desserts", "name": {"fr": "Desserts", "en": "Desserts"}}
        }),
    ]
}

/// Catalog for every ingredient tag used by `dishes`.
pub fn ingredient_catalog(dishes: &[Value]) -> Value {
    let mut ids: Vec<&str> = dishes
        .iter()
        .filter_map(|dish| dish.get("ingredients")?.as_array())
        .flatten()
        .filter_map(Value::as_str)
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let items: Vec<Value> = ids
        .into_iter()
        .map(|id| json!({"id": id, "name": {"fr": id, "en": title_case(id)}}))
        .collect();
    json!({ "ingredients": items })
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Move the stock of one dish so pushes are visible on the board.
pub fn restock(dishes: &mut [Value], round: u64) {
    if dishes.is_empty() {
        return;
    }
    let index = (round as usize) % dishes.len();
    let amount = if round % 2 == 0 { 0 } else { 10 };
    if let Some(quantity) = dishes[index].get_mut("quantity") {
        if quantity.get("infinite").and_then(Value::as_bool) != Some(true) {
            quantity["amount"] = json!(amount);
        }
    }
}
