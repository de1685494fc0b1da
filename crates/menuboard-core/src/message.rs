//! Client requests.
//!
//! Servers in the field understand two request encodings: a tagged
//! `{"type": ...}` form and an `{"action": ..., "timestamp": ...}` form. Both
//! are part of the wire contract and must keep their exact field names.

use serde::{Deserialize, Serialize};

/// What the client is asking the server for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Full menu, tagged encoding.
    Menu,
    /// Full menu, action encoding.
    MenuCompat,
    /// Ingredient catalog.
    Ingredients,
    /// QR payload for the "scan the menu" display.
    QrCodes,
}

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    Tagged(TaggedRequest),
    Action {
        action: Action,
        #[serde(default)]
        timestamp: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TaggedRequest {
    RequestMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    GetMenu,
    GetIngredients,
    #[serde(rename = "getQRCodes")]
    GetQrCodes,
}

impl ClientMessage {
    /// Build the request for `kind`. `timestamp` is milliseconds since the
    /// Unix epoch and is ignored by the tagged encoding.
    pub fn new(kind: RequestKind, timestamp: u64) -> Self {
        let action = match kind {
            RequestKind::Menu => return ClientMessage::Tagged(TaggedRequest::RequestMenu),
            RequestKind::MenuCompat => Action::GetMenu,
            RequestKind::Ingredients => Action::GetIngredients,
            RequestKind::QrCodes => Action::GetQrCodes,
        };
        ClientMessage::Action { action, timestamp }
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            ClientMessage::Tagged(TaggedRequest::RequestMenu) => RequestKind::Menu,
            ClientMessage::Action { action, .. } => match action {
                Action::GetMenu => RequestKind::MenuCompat,
                Action::GetIngredients => RequestKind::Ingredients,
                Action::GetQrCodes => RequestKind::QrCodes,
            },
        }
    }

    /// Encode as a text frame.
    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
