//! Menu data model.
//!
//! Dishes and ingredients are carried through the client untouched: each one
//! wraps the JSON object the server sent, and the accessors below give typed
//! views over the fields the board knows how to show. Unknown or malformed
//! fields are never an error; the accessor just returns `None`.

use crate::Locale;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Look up a localized string (`{"fr": ..., "en": ...}`), falling back to the
/// default locale.
fn localized<'a>(names: &'a Value, locale: &Locale) -> Option<&'a str> {
    let text = move |code: &str| {
        names
            .get(code)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };
    text(locale.code()).or_else(|| text(Locale::DEFAULT.code()))
}

/// Ids show up both as strings and as numbers depending on the server.
fn key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A dish on the menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dish(Value);

impl Dish {
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    pub fn id(&self) -> Option<String> {
        self.0.get("id").and_then(key)
    }

    /// Localized dish name.
    pub fn name(&self, locale: &Locale) -> Option<&str> {
        self.0.get("name").and_then(|n| localized(n, locale))
    }

    pub fn price(&self) -> Option<f64> {
        self.0.get("price").and_then(Value::as_f64)
    }

    pub fn quantity(&self) -> Option<Quantity> {
        self.0
            .get("quantity")
            .and_then(|q| Quantity::deserialize(q).ok())
    }

    /// Ingredient tags as sent with the dish.
    pub fn ingredients(&self) -> Vec<&str> {
        self.0
            .get("ingredients")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn supplements(&self) -> Vec<Supplement> {
        self.0
            .get("supplements")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|s| Supplement::deserialize(s).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Price applied to supplements that carry none of their own.
    pub fn supplement_price(&self) -> Option<f64> {
        self.0.get("supplementPrice").and_then(Value::as_f64)
    }

    pub fn category(&self) -> Option<Category> {
        self.0
            .get("category")
            .and_then(|c| Category::deserialize(c).ok())
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }
}

/// Stock information for a dish.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Quantity {
    #[serde(default)]
    pub infinite: bool,
    #[serde(default)]
    pub amount: i64,
}

impl Quantity {
    /// Threshold at or under which stock is shown as running low.
    pub const LOW_STOCK: i64 = 5;

    pub fn is_out(&self) -> bool {
        !self.infinite && self.amount <= 0
    }

    pub fn is_low(&self) -> bool {
        !self.infinite && self.amount > 0 && self.amount <= Self::LOW_STOCK
    }
}

/// An optional extra for a dish.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Supplement {
    #[serde(default)]
    name: Value,
    #[serde(default)]
    pub price: Option<f64>,
}

impl Supplement {
    pub fn name(&self, locale: &Locale) -> Option<&str> {
        localized(&self.name, locale)
    }
}

/// Menu section a dish belongs to.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "category_id")]
    pub id: String,
    #[serde(default)]
    name: Value,
}

fn category_id<'de, D: serde::Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    let value = Value::deserialize(de)?;
    key(&value).ok_or_else(|| serde::de::Error::custom("category id must be a string or number"))
}

impl Category {
    /// Localized name, or the id when no name is available.
    pub fn name(&self, locale: &Locale) -> &str {
        localized(&self.name, locale).unwrap_or(&self.id)
    }
}

/// An entry of the ingredient catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ingredient(Value);

impl Ingredient {
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    pub fn id(&self) -> Option<String> {
        self.0.get("id").and_then(key)
    }

    pub fn name(&self, locale: &Locale) -> Option<&str> {
        self.0.get("name").and_then(|n| localized(n, locale))
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }
}

/// QR payload pushed by the server for the "scan this menu" display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QrCodes(Value);

/// One QR code: the target URL and an image, usually a data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrCode {
    pub url: Option<String>,
    pub image: Option<String>,
}

impl QrCodes {
    pub fn new(raw: Value) -> Self {
        Self(raw)
    }

    /// The QR code pointing at the public menu.
    pub fn menu(&self) -> Option<QrCode> {
        let menu = self.0.get("menu")?;
        let text = |field: &str| menu.get(field).and_then(Value::as_str).map(str::to_string);
        Some(QrCode {
            url: text("url"),
            // Older servers send `qrCode` instead of `qrCodeDataURL`.
            image: text("qrCodeDataURL").or_else(|| text("qrCode")),
        })
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }
}

/// Format a price with its currency symbol. Whole amounts print without
/// decimals.
pub fn format_price(price: f64, currency: &str) -> String {
    if price.fract() == 0.0 {
        format!("{currency} {price:.0}")
    } else {
        format!("{currency} {price:.2}")
    }
}
