//! Client configuration.
//!
//! Every field has a default, so an empty TOML file is a valid config.
//! Durations are given in milliseconds:
//!
//! ```toml
//! environment = "production"
//! retry_delay_ms = 5000
//! max_attempts = 10
//!
//! [endpoints]
//! production = "wss://menu.example.com"
//! ```

use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Which server endpoint to use by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Production,
}

impl Environment {
    /// Pick the environment from the host the board is served from: public
    /// hosting and developer machines talk to production, anything else is
    /// assumed to sit on the restaurant LAN.
    pub fn detect(host: &str) -> Self {
        if host.contains("github.io") || host == "localhost" {
            Environment::Production
        } else {
            Environment::Local
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub local: String,
    pub production: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            local: "ws://guillaume.local:3000".to_string(),
            production: "wss://your-production-websocket-server.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoints: Endpoints,
    pub environment: Environment,
    /// Explicit server address; overrides `environment`.
    pub address: Option<String>,
    /// Delay before an automatic reconnection attempt.
    #[serde(rename = "retry_delay_ms", deserialize_with = "millis")]
    pub retry_delay: Duration,
    /// Consecutive failures after which automatic reconnection stops.
    pub max_attempts: u32,
    /// Delay between the two menu requests sent on open.
    #[serde(rename = "menu_followup_delay_ms", deserialize_with = "millis")]
    pub menu_followup_delay: Duration,
    /// How long after open to warn if no menu has arrived.
    #[serde(rename = "menu_watchdog_ms", deserialize_with = "millis")]
    pub menu_watchdog: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            environment: Environment::default(),
            address: None,
            retry_delay: Duration::from_secs(5),
            max_attempts: 10,
            menu_followup_delay: Duration::from_secs(1),
            menu_watchdog: Duration::from_secs(5),
        }
    }
}

fn millis<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
    u64::deserialize(de).map(Duration::from_millis)
}

impl ClientConfig {
    /// Server address to connect to.
    pub fn address(&self) -> &str {
        match (&self.address, self.environment) {
            (Some(address), _) => address.as_str(),
            (None, Environment::Local) => self.endpoints.local.as_str(),
            (None, Environment::Production) => self.endpoints.production.as_str(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown environment: {0} (expected local or production)")]
    UnknownEnvironment(String),
}
