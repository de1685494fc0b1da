//! Inbound payload classification.
//!
//! Servers have used several layouts for the same content over time. Each
//! layout is a [`Shape`]; shapes are tried in [`Shape::PRIORITY`] order and
//! the first match wins. Anything else is [`Classified::Unrecognized`], which
//! is not an error.

use menuboard_core::{Dish, Ingredient, QrCodes};
use serde_json::{Map, Value};

/// Value of the `type` field tagging a menu update.
pub const MENU_UPDATE: &str = "menuUpdate";

/// A frame that is not well-formed JSON.
#[derive(Debug, thiserror::Error)]
#[error("frame is not valid JSON: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// What an inbound payload means.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    MenuSnapshot(Vec<Dish>),
    IngredientCatalog(Vec<Ingredient>),
    QrCodes(QrCodes),
    Unrecognized(Value),
}

/// Known payload layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `{"type": "menuUpdate", "menu": [...]}`
    TaggedMenu,
    /// `{"menu": [...]}`
    BareMenu,
    /// `{"type": "menuUpdate", "payload": [...]}`
    TaggedPayload,
    /// `{"ingredients": [...]}`
    IngredientCatalog,
    /// `{"qrCodes": {...}}`
    QrCodes,
}

impl Shape {
    pub const PRIORITY: [Shape; 5] = [
        Shape::TaggedMenu,
        Shape::BareMenu,
        Shape::TaggedPayload,
        Shape::IngredientCatalog,
        Shape::QrCodes,
    ];

    /// Field holding the content.
    pub fn field(self) -> &'static str {
        match self {
            Shape::TaggedMenu | Shape::BareMenu => "menu",
            Shape::TaggedPayload => "payload",
            Shape::IngredientCatalog => "ingredients",
            Shape::QrCodes => "qrCodes",
        }
    }

    pub fn matches(self, payload: &Map<String, Value>) -> bool {
        let tagged = payload.get("type").and_then(Value::as_str) == Some(MENU_UPDATE);
        let content = payload.get(self.field());
        match self {
            Shape::TaggedMenu | Shape::TaggedPayload => tagged && content.is_some_and(Value::is_array),
            Shape::BareMenu | Shape::IngredientCatalog => content.is_some_and(Value::is_array),
            Shape::QrCodes => content.is_some_and(Value::is_object),
        }
    }

    /// First shape matching `payload`, in priority order.
    pub fn detect(payload: &Map<String, Value>) -> Option<Shape> {
        Self::PRIORITY.into_iter().find(|shape| shape.matches(payload))
    }

    fn wrap(self, content: Value) -> Classified {
        match self {
            Shape::TaggedMenu | Shape::BareMenu | Shape::TaggedPayload => {
                Classified::MenuSnapshot(into_items(content).map(Dish::new).collect())
            }
            Shape::IngredientCatalog => {
                Classified::IngredientCatalog(into_items(content).map(Ingredient::new).collect())
            }
            Shape::QrCodes => Classified::QrCodes(QrCodes::new(content)),
        }
    }
}

fn into_items(content: Value) -> impl Iterator<Item = Value> {
    match content {
        Value::Array(items) => items.into_iter(),
        _ => Vec::new().into_iter(),
    }
}

/// Parse a text frame.
pub fn decode(frame: &str) -> Result<Value, DecodeError> {
    Ok(serde_json::from_str(frame)?)
}

/// Classify a decoded payload.
pub fn classify(payload: Value) -> Classified {
    match payload {
        Value::Object(mut map) => match Shape::detect(&map) {
            Some(shape) => {
                let content = map.remove(shape.field()).unwrap_or_default();
                shape.wrap(content)
            }
            None => Classified::Unrecognized(Value::Object(map)),
        },
        other => Classified::Unrecognized(other),
    }
}

/// Decode and classify a text frame.
pub fn classify_frame(frame: &str) -> Result<Classified, DecodeError> {
    decode(frame).map(classify)
}
