//! Display locales.
//!
//! A locale is a two-letter language code out of a fixed set. Localized
//! strings on the wire are objects keyed by these codes, e.g.
//! `{"fr": "Tomate", "en": "Tomato"}`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SUPPORTED: &[&str] = &[
    "fr", "en", "de", "ru", "zh", "ko", "ja", "es", "it", "nl", "pt", "th",
];

/// A supported display locale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale(&'static str);

impl Locale {
    /// The locale used when nothing else is configured, and the fallback for
    /// missing translations.
    pub const DEFAULT: Locale = Locale("fr");

    /// All supported locales, default first.
    pub fn all() -> impl Iterator<Item = Locale> {
        SUPPORTED.iter().copied().map(Locale)
    }

    /// The language code (e.g., "en").
    pub fn code(&self) -> &'static str {
        self.0
    }

    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl FromStr for Locale {
    type Err = LocaleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if wanted.is_empty() {
            return Err(LocaleParseError::Empty);
        }

        SUPPORTED
            .iter()
            .copied()
            .find(|code| *code == wanted)
            .map(Locale)
            .ok_or(LocaleParseError::Unsupported(wanted))
    }
}

impl TryFrom<String> for Locale {
    type Error = LocaleParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.0.to_string()
    }
}

/// Error parsing a locale code.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LocaleParseError {
    #[error("unsupported locale: {0}")]
    Unsupported(String),
    #[error("locale cannot be empty")]
    Empty,
}
