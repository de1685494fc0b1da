//! Plain-text rendering of the board.

use menuboard_client::{ConnectionState, IngredientCache, MenuStore};
use menuboard_core::{Dish, Locale, format_price};
use std::fmt::Write;

const CURRENCY: &str = "฿";

pub fn status(state: ConnectionState) -> String {
    let icon = match state {
        ConnectionState::Connected => "🟢",
        ConnectionState::Connecting => "🟠",
        ConnectionState::Disconnected => "🔴",
    };
    format!("{icon} {state}")
}

pub fn board(
    menu: &MenuStore,
    ingredients: &IngredientCache,
    locale: &Locale,
    category: &str,
) -> String {
    if menu.is_loading() {
        return "Loading menu...\n".to_string();
    }

    let dishes = menu.filter(category);
    if dishes.is_empty() {
        return "No dishes available.\n".to_string();
    }

    let mut out = String::new();
    for dish in &dishes {
        dish_card(&mut out, dish, ingredients, locale);
    }
    out
}

fn dish_card(out: &mut String, dish: &Dish, ingredients: &IngredientCache, locale: &Locale) {
    let name = dish.name(locale).unwrap_or("?");
    let price = dish
        .price()
        .map(|p| format_price(p, CURRENCY))
        .unwrap_or_default();
    let _ = writeln!(out, "{name:<32} {price:>10}  {}", stock(dish));

    let tags = dish.ingredients();
    if !tags.is_empty() {
        let names: Vec<String> = tags
            .iter()
            .map(|id| ingredients.translate(id, locale))
            .collect();
        let _ = writeln!(out, "    {}", names.join(", "));
    }

    for supplement in dish.supplements() {
        let price = supplement
            .price
            .or_else(|| dish.supplement_price())
            .unwrap_or(0.0);
        let _ = writeln!(
            out,
            "    + {} (+{})",
            supplement.name(locale).unwrap_or("?"),
            format_price(price, CURRENCY)
        );
    }
}

fn stock(dish: &Dish) -> String {
    match dish.quantity() {
        None => String::new(),
        Some(q) if q.infinite => "unlimited".to_string(),
        Some(q) if q.is_out() => "sold out".to_string(),
        Some(q) if q.is_low() => format!("only {} left", q.amount),
        Some(q) => format!("{} available", q.amount),
    }
}
