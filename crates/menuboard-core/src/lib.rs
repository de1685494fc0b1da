//! Core types for menuboard.
//!
//! This crate holds the wire vocabulary spoken with the menu server and the
//! pass-through menu model. It has no I/O; the client crate owns the
//! connection.

mod locale;
mod menu;
mod message;

pub use locale::{Locale, LocaleParseError};
pub use menu::{Category, Dish, Ingredient, QrCode, QrCodes, Quantity, Supplement, format_price};
pub use message::{Action, ClientMessage, RequestKind, TaggedRequest};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No transport. Initial state, and terminal once retries are exhausted.
    Disconnected,
    /// Transport requested, waiting for the server to accept.
    Connecting,
    /// Transport open, requests can be sent.
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
